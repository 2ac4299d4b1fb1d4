//! Bitbucket Cloud API response and request types.
//!
//! These types represent the raw JSON responses from the Bitbucket 2.0 API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page of results. `next` holds the absolute URL of the following page.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedLink {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Users and workspaces
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub links: BitbucketUserLinks,
}

impl BitbucketUser {
    pub fn login(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.nickname.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketUserLinks {
    #[serde(default)]
    pub avatar: Link,
    #[serde(default)]
    pub html: Link,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketWorkspace {
    pub slug: String,
}

// =============================================================================
// Repositories
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketRepository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub parent: Option<serde_json::Value>,
    #[serde(default)]
    pub links: BitbucketRepositoryLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketRepositoryLinks {
    #[serde(default)]
    pub html: Link,
    #[serde(default)]
    pub clone: Vec<NamedLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRepositoryRequest {
    pub scm: String,
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameRepositoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ForkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<SlugRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlugRef {
    pub slug: String,
}

// =============================================================================
// Pull requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketPullRequest {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub author: Option<BitbucketUser>,
    #[serde(default)]
    pub links: BitbucketPullRequestLinks,
    #[serde(default)]
    pub merge_commit: Option<CommitRef>,
    #[serde(default)]
    pub source: Option<PullRequestEndpoint>,
    #[serde(default)]
    pub destination: Option<PullRequestEndpoint>,
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketPullRequestLinks {
    #[serde(default)]
    pub html: Link,
    #[serde(default)]
    pub diff: Link,
    #[serde(default)]
    pub statuses: Link,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEndpoint {
    #[serde(default)]
    pub branch: Option<BranchRef>,
    #[serde(default)]
    pub commit: Option<CommitRef>,
    #[serde(default)]
    pub repository: Option<BitbucketRepository>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestRequest {
    pub title: String,
    pub description: String,
    pub source: CreatePullRequestEndpoint,
    pub destination: CreatePullRequestEndpoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequestEndpoint {
    pub branch: BranchRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<FullNameRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullNameRef {
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeRequest {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketCommit {
    pub hash: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<BitbucketCommitAuthor>,
    #[serde(default)]
    pub links: BitbucketCommitLinks,
}

/// `raw` holds the git author as `Name <email>`.
#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketCommitAuthor {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub user: Option<BitbucketUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketCommitLinks {
    #[serde(default)]
    pub html: Link,
}

// =============================================================================
// Commit statuses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketCommitStatus {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    pub state: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: BitbucketStatusLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketStatusLinks {
    #[serde(default)]
    pub commit: Link,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitStatusRequest {
    pub key: String,
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketIssue {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub content: Option<IssueContent>,
    #[serde(default)]
    pub assignee: Option<BitbucketUser>,
    #[serde(default)]
    pub reporter: Option<BitbucketUser>,
    #[serde(default)]
    pub repository: Option<BitbucketRepository>,
    #[serde(default)]
    pub links: BitbucketIssueLinks,
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueContent {
    #[serde(default)]
    pub raw: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BitbucketIssueLinks {
    #[serde(default)]
    pub html: Link,
    #[serde(rename = "self", default)]
    pub self_link: Link,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub content: IssueContent,
}

// =============================================================================
// Webhooks
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketHook {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookRequest {
    pub description: String,
    pub url: String,
    pub active: bool,
    pub events: Vec<String>,
}
