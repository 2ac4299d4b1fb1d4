//! GitLab API response and request types.
//!
//! These types represent the raw JSON responses from GitLab REST API v4.
//! They are deserialized and then mapped to canonical types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users and groups
// =============================================================================

/// GitLab user representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabUser {
    #[serde(default)]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabGroup {
    pub id: u64,
    pub path: String,
    #[serde(default)]
    pub full_path: String,
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabNamespace {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub full_path: String,
}

/// GitLab project representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    #[serde(default)]
    pub namespace: Option<GitLabNamespace>,
    #[serde(default)]
    pub web_url: String,
    #[serde(default)]
    pub http_url_to_repo: String,
    #[serde(default)]
    pub ssh_url_to_repo: String,
    #[serde(default)]
    pub forked_from_project: Option<serde_json::Value>,
    #[serde(default)]
    pub star_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditProjectRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ForkProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_path: Option<String>,
}

/// A file from the repository files API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabFile {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub blob_id: String,
}

// =============================================================================
// Merge Request
// =============================================================================

/// GitLab merge request representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabMergeRequest {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    #[serde(default)]
    pub source_branch: String,
    #[serde(default)]
    pub target_branch: String,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub web_url: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub merge_status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMergeRequestRequest {
    pub title: String,
    pub description: String,
    pub source_branch: String,
    pub target_branch: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptMergeRequestRequest {
    pub merge_commit_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub committer_name: String,
    #[serde(default)]
    pub committer_email: String,
    #[serde(default)]
    pub web_url: String,
}

// =============================================================================
// Commit statuses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommitStatus {
    #[serde(default)]
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommitStatusRequest {
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

// =============================================================================
// Issue
// =============================================================================

/// GitLab issue representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabIssue {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub author: Option<GitLabUser>,
    #[serde(default)]
    pub assignees: Vec<GitLabUser>,
    #[serde(default)]
    pub closed_by: Option<GitLabUser>,
    pub web_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Request body for creating an issue.
#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Comma-separated label names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
}

/// Request body for creating a note on an issue or merge request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateNoteRequest {
    pub body: String,
}

// =============================================================================
// Hooks
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabHook {
    pub id: i64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookRequest {
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub push_events: bool,
    pub merge_requests_events: bool,
}

// =============================================================================
// Releases
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "_links")]
    pub links: Option<GitLabReleaseLinks>,
    #[serde(default)]
    pub assets: Option<GitLabReleaseAssets>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabReleaseLinks {
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitLabReleaseAssets {
    #[serde(default)]
    pub links: Vec<GitLabReleaseLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabReleaseLink {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRequest {
    pub tag_name: String,
    pub name: String,
    pub description: String,
}
