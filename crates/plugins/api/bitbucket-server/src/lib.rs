//! Bitbucket Server (Data Center) backend for gitforge.

mod client;
mod types;

pub use client::{parse_repository_url, BitbucketServerProvider, STATUS_TABLE};
pub use types::*;
