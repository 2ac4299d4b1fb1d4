//! Bitbucket Cloud backend for gitforge.
//!
//! Talks to the Bitbucket 2.0 REST API with basic authentication
//! (username plus app password).

mod client;
mod types;

pub use client::{BitbucketCloudProvider, STATUS_TABLE};
pub use types::*;

/// Default web host.
pub const DEFAULT_BITBUCKET_URL: &str = "https://bitbucket.org";

/// Default REST API root.
pub const DEFAULT_BITBUCKET_API_URL: &str = "https://api.bitbucket.org/2.0";
