//! Canonical types shared by every backend.
//!
//! Adapters translate vendor payloads into these records. They are plain
//! values owned by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Organisations and repositories
// =============================================================================

/// An organisation, group, workspace or project the user can own repositories in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub login: String,
}

impl Organisation {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub organisation: String,
    /// Bitbucket Server project key, where the backend has one.
    pub project: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub html_url: String,
    pub url: String,
    pub language: String,
    pub fork: bool,
    pub allow_merge_commit: bool,
    pub stars: u32,
    pub host: String,
    pub scheme: String,
}

impl Repository {
    /// `organisation/name`, or just the name when there is no organisation.
    pub fn full_name(&self) -> String {
        repo_full_name(&self.organisation, &self.name)
    }
}

/// Join an owner and a repository name.
pub fn repo_full_name(owner: &str, name: &str) -> String {
    if owner.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", owner, name)
    }
}

/// A file fetched from a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub kind: String,
    pub encoding: String,
    pub size: u64,
    pub name: String,
    pub path: String,
    pub content: String,
    pub sha: String,
    pub url: String,
    pub git_url: String,
    pub html_url: String,
    pub download_url: String,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub url: String,
    pub login: String,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

impl User {
    pub fn with_login(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            ..Default::default()
        }
    }
}

/// A pending invitation to collaborate on a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: u64,
    pub repository: String,
    pub inviter: String,
    pub permissions: String,
    pub html_url: String,
}

// =============================================================================
// Pull requests and commits
// =============================================================================

/// A pull request. `number` and `state` stay unset until the vendor assigns them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub url: String,
    pub author: Option<User>,
    pub owner: String,
    pub repo: String,
    pub number: Option<u64>,
    pub mergeable: Option<bool>,
    pub merged: Option<bool>,
    pub head_ref: Option<String>,
    pub state: Option<String>,
    pub statuses_url: Option<String>,
    pub issue_url: Option<String>,
    pub diff_url: Option<String>,
    pub merge_commit_sha: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub last_commit_sha: String,
    pub title: String,
    pub body: String,
}

impl PullRequest {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    pub fn is_merged(&self) -> bool {
        self.merged == Some(true)
    }

    /// `#N`, or an empty string before a number is assigned.
    pub fn number_string(&self) -> String {
        self.number.map(|n| format!("#{}", n)).unwrap_or_default()
    }
}

/// Input for creating a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestArguments {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: Option<User>,
    pub committer: Option<User>,
    pub url: String,
    pub branch: String,
}

// =============================================================================
// Issues
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub url: String,
    pub name: String,
    pub color: String,
}

/// Convert label names into labels.
pub fn to_labels(names: &[impl AsRef<str>]) -> Vec<Label> {
    names
        .iter()
        .map(|n| Label {
            name: n.as_ref().to_string(),
            ..Default::default()
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub url: String,
    pub owner: String,
    pub repo: String,
    pub number: Option<u64>,
    pub key: String,
    pub title: String,
    pub body: String,
    pub state: Option<String>,
    pub labels: Vec<Label>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_pull_request: bool,
    pub user: Option<User>,
    pub closed_by: Option<User>,
    pub assignees: Vec<User>,
}

// =============================================================================
// Releases
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub browser_download_url: String,
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub tag_name: String,
    pub body: String,
    pub url: String,
    pub html_url: String,
    pub download_count: u64,
    pub assets: Option<Vec<ReleaseAsset>>,
}

impl Release {
    /// Fill this release's empty fields from `incoming`.
    ///
    /// Used when upserting by tag: values already on the vendor side win.
    pub fn merge_missing_from(&mut self, incoming: &Release) {
        if self.name.is_empty() {
            self.name = incoming.name.clone();
        }
        if self.body.is_empty() {
            self.body = incoming.body.clone();
        }
        if self.html_url.is_empty() {
            self.html_url = incoming.html_url.clone();
        }
        if self.url.is_empty() {
            self.url = incoming.url.clone();
        }
    }
}

/// Total downloads across releases.
pub fn release_download_count(releases: &[Release]) -> u64 {
    releases.iter().map(|r| r.download_count).sum()
}

// =============================================================================
// Webhooks
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookArguments {
    pub id: i64,
    pub owner: String,
    pub repo: Option<Repository>,
    pub url: String,
    pub secret: String,
}

impl WebhookArguments {
    /// Repository name, or an empty string when no repository is attached.
    pub fn repo_name(&self) -> &str {
        self.repo.as_ref().map(|r| r.name.as_str()).unwrap_or_default()
    }
}
