//! Gitea backend for gitforge.

mod client;
mod types;

pub use client::{GiteaProvider, STATUS_TABLE};
pub use types::*;
