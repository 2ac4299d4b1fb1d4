//! Core traits, canonical types, and error handling for gitforge.
//!
//! Every backend adapter implements [`GitProvider`] and translates its
//! vendor payloads into the types defined here.

pub mod credentials;
pub mod error;
pub mod kind;
pub mod provider;
pub mod retry;
pub mod status;
pub mod types;

pub use credentials::{Server, UserAuth};
pub use error::{Error, Result};
pub use kind::Kind;
pub use provider::{filter_closed_since, find_webhook, GitProvider, OrganisationLister};
pub use retry::{InstantSleeper, Retry, Sleeper, TokioSleeper};
pub use status::{all_statuses_succeeded, any_status_failed, normalize_state, RepoStatus, StatusTable};
pub use types::*;
