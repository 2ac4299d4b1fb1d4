//! Commit statuses and their normalization.
//!
//! Every backend ships a [`StatusTable`] mapping its vendor state names onto
//! the canonical set below.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const PENDING: &str = "pending";
pub const SUCCESS: &str = "success";
pub const ERROR: &str = "error";
pub const FAILURE: &str = "failure";
pub const IN_PROGRESS: &str = "in-progress";
pub const STOPPED: &str = "stopped";

/// The canonical status states.
pub const CANONICAL_STATES: [&str; 6] = [PENDING, SUCCESS, ERROR, FAILURE, IN_PROGRESS, STOPPED];

/// Vendor state name to canonical state name.
pub type StatusTable = &'static [(&'static str, &'static str)];

/// Translate a vendor state through `table`.
///
/// Matching ignores case. A state missing from `table` becomes
/// [`PENDING`], so the result is always one of [`CANONICAL_STATES`].
pub fn normalize_state(table: StatusTable, vendor_state: &str) -> String {
    match table
        .iter()
        .find(|(vendor, _)| vendor.eq_ignore_ascii_case(vendor_state))
    {
        Some((_, canonical)) => canonical.to_string(),
        None => {
            warn!(state = vendor_state, "Unknown commit status state, treating as pending");
            PENDING.to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStatus {
    pub id: String,
    pub context: String,
    pub url: String,
    /// One of [`CANONICAL_STATES`].
    pub state: String,
    pub target_url: String,
    pub description: String,
}

impl RepoStatus {
    pub fn is_success(&self) -> bool {
        self.state == SUCCESS
    }

    pub fn is_failed(&self) -> bool {
        self.state == ERROR || self.state == FAILURE
    }
}

/// True when every status succeeded. An empty list counts as success.
pub fn all_statuses_succeeded(statuses: &[RepoStatus]) -> bool {
    statuses.iter().all(RepoStatus::is_success)
}

/// True when any status errored or failed.
pub fn any_status_failed(statuses: &[RepoStatus]) -> bool {
    statuses.iter().any(RepoStatus::is_failed)
}
