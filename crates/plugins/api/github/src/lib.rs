//! GitHub backend for gitforge.
//!
//! Talks to the GitHub REST API on github.com or a GitHub Enterprise
//! server (`{server}/api/v3`).

mod client;
mod types;

pub use client::{GitHubProvider, STATUS_TABLE};
pub use types::*;

/// Public GitHub web URL.
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";

/// Default GitHub API URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
