//! GitLab backend for gitforge.
//!
//! Projects are addressed by their numeric id, resolved by listing the
//! owning group (or user) and matching on name.

mod client;
mod types;

pub use client::{GitLabProvider, STATUS_TABLE};
pub use types::*;

/// Default GitLab URL.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
