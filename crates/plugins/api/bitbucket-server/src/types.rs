//! Bitbucket Server (Data Center) REST API types.
//!
//! Field names follow the `/rest/api/1.0` JSON, which is camelCase throughout.

use serde::{Deserialize, Serialize};

/// A page of results. Paging continues from `next_page_start` until `is_last_page`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default = "default_true")]
    pub is_last_page: bool,
    #[serde(default)]
    pub next_page_start: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_links: Vec<Link>,
    #[serde(default)]
    pub clone: Vec<Link>,
}

impl Links {
    pub fn self_href(&self) -> String {
        self.self_links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default()
    }
}

// =============================================================================
// Users and projects
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketServerUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub user: BitbucketServerUser,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(default)]
    pub key: String,
}

// =============================================================================
// Repositories
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketServerRepository {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub origin: Option<serde_json::Value>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameRepositoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ForkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

// =============================================================================
// Pull requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketServerPullRequest {
    pub id: u64,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub author: Option<Participant>,
    #[serde(default)]
    pub from_ref: Option<PullRequestRef>,
    #[serde(default)]
    pub to_ref: Option<PullRequestRef>,
    #[serde(default)]
    pub closed_date: Option<i64>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_id: String,
    #[serde(default)]
    pub latest_commit: String,
    #[serde(default)]
    pub repository: Option<BitbucketServerRepository>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequestRequest {
    pub title: String,
    pub description: String,
    pub state: String,
    pub open: bool,
    pub closed: bool,
    pub from_ref: CreatePullRequestRef,
    pub to_ref: CreatePullRequestRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestRef {
    pub id: String,
    pub repository: RepositoryRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRef {
    pub slug: String,
    pub project: ProjectRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub commit: Option<ActivityCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityCommit {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketServerCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitPerson>,
    #[serde(default)]
    pub committer: Option<CommitPerson>,
    #[serde(default)]
    pub committer_timestamp: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: String,
}

// =============================================================================
// Build statuses
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    pub state: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing)]
    pub date_added: i64,
}

// =============================================================================
// Webhooks
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketServerHook {
    pub id: i64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookRequest {
    pub name: String,
    pub url: String,
    pub active: bool,
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<HookConfiguration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookConfiguration {
    pub secret: String,
}
