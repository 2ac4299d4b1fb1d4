//! The canonical provider trait implemented by every backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::credentials::UserAuth;
use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::status::RepoStatus;
use crate::types::{
    repo_full_name, Commit, FileContent, Invitation, Issue, Organisation, PullRequest,
    PullRequestArguments, Release, Repository, User, WebhookArguments,
};

/// Anything that can list the organisations of the current user.
#[async_trait]
pub trait OrganisationLister: Send + Sync {
    async fn list_organisations(&self) -> Result<Vec<Organisation>>;
}

/// Repository, pull request, issue, webhook and release operations against
/// one hosting service.
///
/// Backends that lack a capability either return [`Error::NotImplemented`]
/// or, for optional capabilities (issues, releases), log a warning and
/// return an empty result.
#[async_trait]
pub trait GitProvider: OrganisationLister {
    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    fn kind(&self) -> Kind;

    /// Human-readable backend name.
    fn label(&self) -> &str;

    fn server_url(&self) -> &str;

    fn current_username(&self) -> &str;

    fn user_auth(&self) -> UserAuth;

    fn is_github(&self) -> bool {
        self.kind() == Kind::GitHub
    }

    fn is_gitea(&self) -> bool {
        self.kind() == Kind::Gitea
    }

    fn is_bitbucket_cloud(&self) -> bool {
        self.kind() == Kind::BitbucketCloud
    }

    fn is_bitbucket_server(&self) -> bool {
        self.kind() == Kind::BitbucketServer
    }

    fn is_gerrit(&self) -> bool {
        self.kind() == Kind::Gerrit
    }

    /// Whether this backend tracks issues.
    fn has_issues(&self) -> bool {
        true
    }

    // -------------------------------------------------------------------------
    // URLs
    // -------------------------------------------------------------------------

    fn issue_url(&self, org: &str, name: &str, number: u64, is_pull: bool) -> String;

    fn branch_archive_url(&self, org: &str, name: &str, branch: &str) -> String;

    /// Path, relative to a CI server, that receives this backend's webhooks.
    fn webhook_path(&self, git_url: &str, secret: &str) -> String;

    /// Page where users create API tokens, if the backend has one.
    fn access_token_url(&self) -> String {
        String::new()
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>>;

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository>;

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<Repository>;

    async fn delete_repository(&self, org: &str, name: &str) -> Result<()>;

    async fn fork_repository(
        &self,
        original_org: &str,
        name: &str,
        destination_org: &str,
    ) -> Result<Repository>;

    async fn rename_repository(&self, org: &str, name: &str, new_name: &str) -> Result<Repository>;

    /// Ok only when the vendor confirms the repository does not exist.
    async fn validate_repository_name(&self, org: &str, name: &str) -> Result<()> {
        match self.get_repository(org, name).await {
            Ok(_) => Err(Error::AlreadyExists(format!(
                "Repository {}",
                repo_full_name(org, name)
            ))),
            Err(Error::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_content(
        &self,
        org: &str,
        name: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent>;

    async fn is_user_in_organisation(&self, user: &str, org: &str) -> Result<bool> {
        if user == org {
            return Ok(true);
        }
        let orgs = self.list_organisations().await?;
        Ok(orgs.iter().any(|o| o.login == org))
    }

    async fn add_collaborator(&self, _user: &str, _org: &str, _repo: &str) -> Result<()> {
        Err(Error::not_implemented(self.kind().as_str(), "add_collaborator"))
    }

    async fn list_invitations(&self) -> Result<Vec<Invitation>> {
        Err(Error::not_implemented(self.kind().as_str(), "list_invitations"))
    }

    async fn accept_invitation(&self, _id: u64) -> Result<()> {
        Err(Error::not_implemented(self.kind().as_str(), "accept_invitation"))
    }

    // -------------------------------------------------------------------------
    // Pull requests
    // -------------------------------------------------------------------------

    async fn create_pull_request(&self, args: &PullRequestArguments) -> Result<PullRequest>;

    /// Re-read the pull request from the vendor and overwrite `pr` in place.
    async fn update_pull_request_status(&self, pr: &mut PullRequest) -> Result<()>;

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest>;

    async fn get_pull_request_commits(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<Vec<Commit>>;

    /// Canonical state of the most recent status on the head commit.
    async fn pull_request_last_commit_status(&self, pr: &PullRequest) -> Result<String>;

    async fn merge_pull_request(&self, pr: &PullRequest, message: &str) -> Result<()>;

    async fn add_pr_comment(&self, pr: &PullRequest, comment: &str) -> Result<()>;

    // -------------------------------------------------------------------------
    // Commit statuses
    // -------------------------------------------------------------------------

    async fn list_commit_statuses(&self, org: &str, repo: &str, sha: &str)
        -> Result<Vec<RepoStatus>>;

    async fn update_commit_status(
        &self,
        _org: &str,
        _repo: &str,
        _sha: &str,
        _status: &RepoStatus,
    ) -> Result<RepoStatus> {
        Err(Error::not_implemented(
            self.kind().as_str(),
            "update_commit_status",
        ))
    }

    // -------------------------------------------------------------------------
    // Issues
    // -------------------------------------------------------------------------

    async fn search_issues(&self, org: &str, name: &str, query: &str) -> Result<Vec<Issue>>;

    /// Issues closed at or after `since`.
    async fn search_issues_closed_since(
        &self,
        org: &str,
        name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>> {
        let issues = self.search_issues(org, name, "").await?;
        Ok(filter_closed_since(issues, since))
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue>;

    async fn create_issue(&self, owner: &str, repo: &str, issue: &Issue) -> Result<Issue>;

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
    ) -> Result<()>;

    // -------------------------------------------------------------------------
    // Webhooks
    // -------------------------------------------------------------------------

    /// Create a webhook, skipping creation when one already targets the same URL.
    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()>;

    async fn list_webhooks(&self, org: &str, repo: &str) -> Result<Vec<WebhookArguments>>;

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()>;

    // -------------------------------------------------------------------------
    // Releases
    // -------------------------------------------------------------------------

    async fn list_releases(&self, org: &str, name: &str) -> Result<Vec<Release>>;

    /// Create the release for `tag`, or fill in the existing one.
    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        release: &Release,
    ) -> Result<()>;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    async fn user_info(&self, username: &str) -> Result<User>;
}

// =============================================================================
// Helpers
// =============================================================================

/// Keep issues whose `closed_at` is set and not before `since`.
pub fn filter_closed_since(issues: Vec<Issue>, since: DateTime<Utc>) -> Vec<Issue> {
    issues
        .into_iter()
        .filter(|issue| issue.closed_at.is_some_and(|closed| closed >= since))
        .collect()
}

/// The existing hook targeting `url`, if any.
pub fn find_webhook<'a>(hooks: &'a [WebhookArguments], url: &str) -> Option<&'a WebhookArguments> {
    hooks.iter().find(|hook| hook.url == url)
}
