//! Gitea API response and request types.
//!
//! These types represent the raw JSON responses from the Gitea API v1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users and organisations
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiteaUser {
    #[serde(default)]
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// Organisations are reported with their login under `username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaOrganisation {
    #[serde(default)]
    pub username: String,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiteaRepository {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub owner: Option<GiteaUser>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub ssh_url: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub stars_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRepoOption {
    pub name: String,
    pub private: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateForkOption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub git_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

// =============================================================================
// Pull requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaPullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub diff_url: Option<String>,
    #[serde(default)]
    pub user: Option<GiteaUser>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub mergeable: bool,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub head: Option<GiteaBranch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaBranch {
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestOption {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub head: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base: String,
}

/// Merge options. Gitea uses these exact field names.
#[derive(Debug, Clone, Serialize)]
pub struct MergePullRequestOption {
    #[serde(rename = "Do")]
    pub merge_style: String,
    #[serde(rename = "MergeMessageField", skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub commit: Option<GiteaCommitDetail>,
    #[serde(default)]
    pub author: Option<GiteaUser>,
    #[serde(default)]
    pub committer: Option<GiteaUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaCommitDetail {
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Statuses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaStatus {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStatusOption {
    pub state: String,
    pub context: String,
    pub target_url: String,
    pub description: String,
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub user: Option<GiteaUser>,
    #[serde(default)]
    pub assignees: Option<Vec<GiteaUser>>,
    #[serde(default)]
    pub labels: Vec<GiteaLabel>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueOption {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueCommentOption {
    pub body: String,
}

// =============================================================================
// Hooks
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaHook {
    pub id: i64,
    #[serde(default)]
    pub config: GiteaHookConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiteaHookConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateHookOption {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: GiteaHookConfig,
    pub events: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditHookOption {
    pub config: GiteaHookConfig,
    pub events: Vec<String>,
    pub active: bool,
}

// =============================================================================
// Releases
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaRelease {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<GiteaAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaAttachment {
    pub name: String,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseOption {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}
