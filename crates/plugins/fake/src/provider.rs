//! In-memory provider.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use gitforge_core::{
    find_webhook, repo_full_name, Commit, Error, FileContent, GitProvider, Issue, Kind,
    Organisation, OrganisationLister, PullRequest, PullRequestArguments, Release, RepoStatus,
    Repository, Result, User, UserAuth, WebhookArguments,
};
use tracing::{debug, info};

/// Server URL every fake provider reports.
pub const FAKE_GIT_URL: &str = "https://fake.git";

const PROVIDER: &str = "fake";

/// A pull request together with the data hanging off it.
#[derive(Debug, Clone, Default)]
pub struct FakePullRequest {
    pub pull_request: PullRequest,
    pub commits: Vec<Commit>,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeIssue {
    pub issue: Issue,
    pub comments: Vec<String>,
}

/// A repository and everything stored against it.
#[derive(Debug, Clone, Default)]
pub struct FakeRepository {
    pub repository: Repository,
    pub pull_requests: BTreeMap<u64, FakePullRequest>,
    pub issues: BTreeMap<u64, FakeIssue>,
    pub releases: Vec<Release>,
    /// Commit statuses keyed by sha.
    pub statuses: HashMap<String, Vec<RepoStatus>>,
    next_number: u64,
}

impl FakeRepository {
    fn new(repository: Repository) -> Self {
        Self {
            repository,
            next_number: 1,
            ..Default::default()
        }
    }

    /// Issues and pull requests share one number sequence.
    fn take_number(&mut self) -> u64 {
        let number = self.next_number.max(1);
        self.next_number = number + 1;
        number
    }

    fn reserve_number(&mut self, number: u64) {
        self.next_number = self.next_number.max(number + 1);
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeOrganisation {
    pub organisation: Organisation,
    pub repositories: Vec<FakeRepository>,
}

#[derive(Debug, Default)]
struct FakeState {
    organisations: BTreeMap<String, FakeOrganisation>,
    webhooks: Vec<WebhookArguments>,
    users: BTreeMap<String, User>,
}

impl FakeState {
    fn repository(&self, org: &str, name: &str) -> Result<&FakeRepository> {
        self.organisations
            .get(org)
            .and_then(|o| o.repositories.iter().find(|r| r.repository.name == name))
            .ok_or_else(|| not_found(org, name))
    }

    fn repository_mut(&mut self, org: &str, name: &str) -> Result<&mut FakeRepository> {
        self.organisations
            .get_mut(org)
            .and_then(|o| o.repositories.iter_mut().find(|r| r.repository.name == name))
            .ok_or_else(|| not_found(org, name))
    }

    fn organisation_mut(&mut self, org: &str) -> &mut FakeOrganisation {
        self.organisations
            .entry(org.to_string())
            .or_insert_with(|| FakeOrganisation {
                organisation: Organisation::new(org),
                repositories: Vec::new(),
            })
    }
}

fn not_found(org: &str, name: &str) -> Error {
    Error::NotFound(format!("Repository {} not found", repo_full_name(org, name)))
}

/// Build the canonical record for a repository hosted on the fake server.
pub fn fake_repository(org: &str, name: &str) -> Repository {
    let html_url = format!("{}/{}", FAKE_GIT_URL, repo_full_name(org, name));
    Repository {
        name: name.to_string(),
        organisation: org.to_string(),
        clone_url: format!("{}.git", html_url),
        ssh_url: format!("git@fake.git:{}.git", repo_full_name(org, name)),
        url: html_url.clone(),
        html_url,
        allow_merge_commit: true,
        host: "fake.git".to_string(),
        scheme: "https".to_string(),
        ..Default::default()
    }
}

/// In-memory [`GitProvider`] keyed by organisation.
///
/// Operations it cannot model fail with `Error::NotImplemented` so a test
/// that strays onto them fails loudly.
pub struct FakeProvider {
    auth: UserAuth,
    state: RwLock<FakeState>,
}

impl FakeProvider {
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_auth(UserAuth::new(username, "fake-token"))
    }

    pub fn with_auth(auth: UserAuth) -> Self {
        Self {
            auth,
            state: RwLock::new(FakeState::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FakeState>> {
        self.state
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FakeState>> {
        self.state
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))
    }

    fn owner<'a>(&'a self, org: &'a str) -> &'a str {
        if org.is_empty() {
            &self.auth.username
        } else {
            org
        }
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Register an organisation with no repositories.
    pub fn add_organisation(&self, org: &str) -> Result<()> {
        self.write()?.organisation_mut(org);
        Ok(())
    }

    /// Add a repository, creating its organisation when needed.
    pub fn add_repository(&self, org: &str, name: &str) -> Result<Repository> {
        let repository = fake_repository(org, name);
        self.insert_repository(repository.clone())?;
        Ok(repository)
    }

    fn insert_repository(&self, repository: Repository) -> Result<()> {
        let mut state = self.write()?;
        let org = state.organisation_mut(&repository.organisation);
        if org
            .repositories
            .iter()
            .any(|r| r.repository.name == repository.name)
        {
            return Err(Error::AlreadyExists(format!(
                "Repository {} already exists",
                repository.full_name()
            )));
        }
        org.repositories.push(FakeRepository::new(repository));
        Ok(())
    }

    /// Store a pull request as-is. Its number is kept when set.
    pub fn add_pull_request(
        &self,
        org: &str,
        repo: &str,
        mut pr: PullRequest,
        commits: Vec<Commit>,
    ) -> Result<PullRequest> {
        let mut state = self.write()?;
        let fake_repo = state.repository_mut(org, repo)?;
        let number = match pr.number {
            Some(n) => {
                fake_repo.reserve_number(n);
                n
            }
            None => fake_repo.take_number(),
        };
        pr.number = Some(number);
        pr.owner = org.to_string();
        pr.repo = repo.to_string();
        if pr.url.is_empty() {
            pr.url = self.issue_url(org, repo, number, true);
        }
        if pr.last_commit_sha.is_empty() {
            if let Some(last) = commits.last() {
                pr.last_commit_sha = last.sha.clone();
            }
        }
        fake_repo.pull_requests.insert(
            number,
            FakePullRequest {
                pull_request: pr.clone(),
                commits,
                comments: Vec::new(),
            },
        );
        Ok(pr)
    }

    /// Store an issue as-is. Its number is kept when set.
    pub fn add_issue(&self, org: &str, repo: &str, mut issue: Issue) -> Result<Issue> {
        let mut state = self.write()?;
        let fake_repo = state.repository_mut(org, repo)?;
        let number = match issue.number {
            Some(n) => {
                fake_repo.reserve_number(n);
                n
            }
            None => fake_repo.take_number(),
        };
        issue.number = Some(number);
        issue.key = number.to_string();
        issue.owner = org.to_string();
        issue.repo = repo.to_string();
        if issue.url.is_empty() {
            issue.url = self.issue_url(org, repo, number, false);
        }
        fake_repo.issues.insert(
            number,
            FakeIssue {
                issue: issue.clone(),
                comments: Vec::new(),
            },
        );
        Ok(issue)
    }

    pub fn add_release(&self, org: &str, repo: &str, release: Release) -> Result<()> {
        self.write()?
            .repository_mut(org, repo)?
            .releases
            .push(release);
        Ok(())
    }

    pub fn add_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: RepoStatus,
    ) -> Result<()> {
        self.write()?
            .repository_mut(org, repo)?
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(status);
        Ok(())
    }

    pub fn add_user(&self, user: User) -> Result<()> {
        self.write()?.users.insert(user.login.clone(), user);
        Ok(())
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Comments posted on a pull request, in order.
    pub fn pull_request_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>> {
        let state = self.read()?;
        let fake_repo = state.repository(org, repo)?;
        Ok(fake_repo
            .pull_requests
            .get(&number)
            .map(|pr| pr.comments.clone())
            .unwrap_or_default())
    }

    /// Comments posted on an issue, in order.
    pub fn issue_comments(&self, org: &str, repo: &str, number: u64) -> Result<Vec<String>> {
        let state = self.read()?;
        let fake_repo = state.repository(org, repo)?;
        Ok(fake_repo
            .issues
            .get(&number)
            .map(|i| i.comments.clone())
            .unwrap_or_default())
    }

    /// Every registered webhook.
    pub fn webhooks(&self) -> Result<Vec<WebhookArguments>> {
        Ok(self.read()?.webhooks.clone())
    }

    fn fetch_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<FakePullRequest> {
        let state = self.read()?;
        state
            .repository(org, repo)?
            .pull_requests
            .get(&number)
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Pull request #{} not found in {}",
                    number,
                    repo_full_name(org, repo)
                ))
            })
    }
}

fn pr_number(pr: &PullRequest) -> Result<u64> {
    pr.number
        .ok_or_else(|| Error::InvalidData(format!("Pull request {} has no number", pr.url)))
}

fn same_repository(hook: &WebhookArguments, owner: &str, repo: &str) -> bool {
    hook.owner == owner && hook.repo_name() == repo
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl OrganisationLister for FakeProvider {
    async fn list_organisations(&self) -> Result<Vec<Organisation>> {
        Ok(self
            .read()?
            .organisations
            .values()
            .map(|o| o.organisation.clone())
            .collect())
    }
}

#[async_trait]
impl GitProvider for FakeProvider {
    fn kind(&self) -> Kind {
        Kind::Fake
    }

    fn label(&self) -> &str {
        PROVIDER
    }

    fn server_url(&self) -> &str {
        FAKE_GIT_URL
    }

    fn current_username(&self) -> &str {
        &self.auth.username
    }

    fn user_auth(&self) -> UserAuth {
        self.auth.clone()
    }

    fn issue_url(&self, org: &str, name: &str, number: u64, is_pull: bool) -> String {
        let path = if is_pull { "pull" } else { "issues" };
        format!("{}/{}/{}/{}/{}", FAKE_GIT_URL, org, name, path, number)
    }

    fn branch_archive_url(&self, org: &str, name: &str, branch: &str) -> String {
        format!("{}/{}/{}/archive/{}.zip", FAKE_GIT_URL, org, name, branch)
    }

    fn webhook_path(&self, _git_url: &str, _secret: &str) -> String {
        "/fake-webhook/".to_string()
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let state = self.read()?;
        Ok(state
            .organisations
            .get(self.owner(org))
            .map(|o| o.repositories.iter().map(|r| r.repository.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository> {
        let state = self.read()?;
        Ok(state.repository(self.owner(org), name)?.repository.clone())
    }

    async fn create_repository(&self, org: &str, name: &str, _private: bool) -> Result<Repository> {
        let repository = self.add_repository(self.owner(org), name)?;
        info!(org = org, name = name, "Created fake repository");
        Ok(repository)
    }

    async fn delete_repository(&self, org: &str, name: &str) -> Result<()> {
        let owner = self.owner(org);
        let mut state = self.write()?;
        let organisation = state
            .organisations
            .get_mut(owner)
            .ok_or_else(|| not_found(owner, name))?;
        let before = organisation.repositories.len();
        organisation
            .repositories
            .retain(|r| r.repository.name != name);
        if organisation.repositories.len() == before {
            return Err(not_found(owner, name));
        }
        Ok(())
    }

    async fn fork_repository(
        &self,
        original_org: &str,
        name: &str,
        destination_org: &str,
    ) -> Result<Repository> {
        self.get_repository(original_org, name).await?;
        let mut fork = fake_repository(self.owner(destination_org), name);
        fork.fork = true;
        self.insert_repository(fork.clone())?;
        debug!(
            from = original_org,
            to = %fork.organisation,
            name = name,
            "Forked fake repository"
        );
        Ok(fork)
    }

    async fn rename_repository(&self, org: &str, name: &str, new_name: &str) -> Result<Repository> {
        let owner = self.owner(org);
        let mut state = self.write()?;
        if state.repository(owner, new_name).is_ok() {
            return Err(Error::AlreadyExists(format!(
                "Repository {} already exists",
                repo_full_name(owner, new_name)
            )));
        }
        let fake_repo = state.repository_mut(owner, name)?;
        let mut renamed = fake_repository(owner, new_name);
        renamed.fork = fake_repo.repository.fork;
        fake_repo.repository = renamed.clone();
        Ok(renamed)
    }

    async fn get_content(
        &self,
        _org: &str,
        _name: &str,
        _path: &str,
        _git_ref: &str,
    ) -> Result<FileContent> {
        Err(Error::not_implemented(PROVIDER, "get_content"))
    }

    async fn create_pull_request(&self, args: &PullRequestArguments) -> Result<PullRequest> {
        let owner = self.owner(&args.repository.organisation).to_string();
        let pr = PullRequest {
            title: args.title.clone(),
            body: args.body.clone(),
            head_ref: Some(args.head.clone()),
            state: Some("open".to_string()),
            mergeable: Some(true),
            merged: Some(false),
            author: Some(User::with_login(&self.auth.username)),
            ..Default::default()
        };
        self.add_pull_request(&owner, &args.repository.name, pr, Vec::new())
    }

    async fn update_pull_request_status(&self, pr: &mut PullRequest) -> Result<()> {
        let number = pr_number(pr)?;
        *pr = self
            .fetch_pull_request(&pr.owner, &pr.repo, number)?
            .pull_request;
        Ok(())
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest> {
        Ok(self
            .fetch_pull_request(owner, &repo.name, number)?
            .pull_request)
    }

    async fn get_pull_request_commits(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<Vec<Commit>> {
        Ok(self.fetch_pull_request(owner, &repo.name, number)?.commits)
    }

    async fn pull_request_last_commit_status(&self, pr: &PullRequest) -> Result<String> {
        let statuses = self
            .list_commit_statuses(&pr.owner, &pr.repo, &pr.last_commit_sha)
            .await?;
        statuses
            .into_iter()
            .map(|s| s.state)
            .find(|state| !state.is_empty())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Could not find a status for repository {} with ref {}",
                    repo_full_name(&pr.owner, &pr.repo),
                    pr.last_commit_sha
                ))
            })
    }

    async fn merge_pull_request(&self, pr: &PullRequest, message: &str) -> Result<()> {
        let number = pr_number(pr)?;
        let mut state = self.write()?;
        let fake_pr = state
            .repository_mut(&pr.owner, &pr.repo)?
            .pull_requests
            .get_mut(&number)
            .ok_or_else(|| Error::NotFound(format!("Pull request #{} not found", number)))?;
        let stored = &mut fake_pr.pull_request;
        if stored.is_merged() || stored.is_closed() {
            return Err(Error::Api {
                status: 405,
                message: format!("Pull request #{} is not open", number),
            });
        }
        let now = Utc::now();
        stored.merged = Some(true);
        stored.state = Some("merged".to_string());
        stored.merged_at = Some(now);
        stored.closed_at = Some(now);
        stored.merge_commit_sha = Some(format!("merge-{}", number));
        debug!(number = number, message = message, "Merged fake pull request");
        Ok(())
    }

    async fn add_pr_comment(&self, pr: &PullRequest, comment: &str) -> Result<()> {
        let number = pr_number(pr)?;
        let mut state = self.write()?;
        state
            .repository_mut(&pr.owner, &pr.repo)?
            .pull_requests
            .get_mut(&number)
            .ok_or_else(|| Error::NotFound(format!("Pull request #{} not found", number)))?
            .comments
            .push(comment.to_string());
        Ok(())
    }

    async fn list_commit_statuses(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<RepoStatus>> {
        let state = self.read()?;
        Ok(state
            .repository(org, repo)?
            .statuses
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &RepoStatus,
    ) -> Result<RepoStatus> {
        let mut state = self.write()?;
        let statuses = state
            .repository_mut(org, repo)?
            .statuses
            .entry(sha.to_string())
            .or_default();
        match statuses.iter_mut().find(|s| s.context == status.context) {
            Some(existing) => *existing = status.clone(),
            None => statuses.push(status.clone()),
        }
        Ok(status.clone())
    }

    async fn search_issues(&self, org: &str, name: &str, query: &str) -> Result<Vec<Issue>> {
        let query = query.to_lowercase();
        let state = self.read()?;
        Ok(state
            .repository(org, name)?
            .issues
            .values()
            .map(|i| &i.issue)
            .filter(|i| {
                query.is_empty()
                    || i.title.to_lowercase().contains(&query)
                    || i.body.to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue> {
        let state = self.read()?;
        state
            .repository(org, name)?
            .issues
            .get(&number)
            .map(|i| i.issue.clone())
            .ok_or_else(|| Error::NotFound(format!("Issue #{} not found", number)))
    }

    async fn create_issue(&self, owner: &str, repo: &str, issue: &Issue) -> Result<Issue> {
        let issue = Issue {
            number: None,
            url: String::new(),
            state: Some("open".to_string()),
            created_at: Some(Utc::now()),
            user: Some(User::with_login(&self.auth.username)),
            ..issue.clone()
        };
        self.add_issue(owner, repo, issue)
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
    ) -> Result<()> {
        let mut state = self.write()?;
        state
            .repository_mut(owner, repo)?
            .issues
            .get_mut(&number)
            .ok_or_else(|| Error::NotFound(format!("Issue #{} not found", number)))?
            .comments
            .push(comment.to_string());
        Ok(())
    }

    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let mut state = self.write()?;
        if find_webhook(&state.webhooks, &data.url).is_some() {
            debug!(url = %data.url, "Fake webhook already registered");
            return Ok(());
        }
        let mut hook = data.clone();
        hook.owner = self.owner(&data.owner).to_string();
        hook.id = state.webhooks.len() as i64 + 1;
        info!(url = %data.url, repo = data.repo_name(), "Created fake webhook");
        state.webhooks.push(hook);
        Ok(())
    }

    async fn list_webhooks(&self, org: &str, repo: &str) -> Result<Vec<WebhookArguments>> {
        Ok(self
            .read()?
            .webhooks
            .iter()
            .filter(|h| same_repository(h, org, repo))
            .cloned()
            .collect())
    }

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner(&data.owner).to_string();
        {
            let mut state = self.write()?;
            if let Some(existing) = state
                .webhooks
                .iter_mut()
                .find(|h| same_repository(h, &owner, data.repo_name()))
            {
                let id = existing.id;
                *existing = WebhookArguments {
                    id,
                    owner,
                    ..data.clone()
                };
                return Ok(());
            }
        }
        self.create_webhook(data).await
    }

    async fn list_releases(&self, org: &str, name: &str) -> Result<Vec<Release>> {
        let state = self.read()?;
        Ok(state.repository(self.owner(org), name)?.releases.clone())
    }

    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        release: &Release,
    ) -> Result<()> {
        let mut state = self.write()?;
        let releases = &mut state.repository_mut(owner, repo)?.releases;
        match releases.iter_mut().find(|r| r.tag_name == tag) {
            Some(existing) => existing.merge_missing_from(release),
            None => releases.push(Release {
                tag_name: tag.to_string(),
                ..release.clone()
            }),
        }
        Ok(())
    }

    async fn user_info(&self, username: &str) -> Result<User> {
        self.read()?
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("User {} not found", username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_create_validate() {
        let provider = FakeProvider::new("alice");
        provider
            .validate_repository_name("acme", "widgets")
            .await
            .unwrap();
        provider
            .create_repository("acme", "widgets", false)
            .await
            .unwrap();
        let err = provider
            .validate_repository_name("acme", "widgets")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_twice_is_rejected() {
        let provider = FakeProvider::new("alice");
        provider.create_repository("", "widgets", true).await.unwrap();
        assert!(matches!(
            provider.create_repository("alice", "widgets", true).await,
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(provider.list_repositories("").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_repository_is_not_found() {
        let provider = FakeProvider::new("alice");
        provider.add_repository("acme", "widgets").unwrap();
        provider.delete_repository("acme", "widgets").await.unwrap();
        assert!(provider
            .delete_repository("acme", "widgets")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_fork_and_rename() {
        let provider = FakeProvider::new("alice");
        provider.add_repository("upstream", "widgets").unwrap();
        let fork = provider
            .fork_repository("upstream", "widgets", "")
            .await
            .unwrap();
        assert!(fork.fork);
        assert_eq!(fork.organisation, "alice");

        let renamed = provider
            .rename_repository("alice", "widgets", "gizmos")
            .await
            .unwrap();
        assert_eq!(renamed.name, "gizmos");
        assert!(renamed.fork);
        assert!(provider.get_repository("alice", "widgets").await.is_err());
    }

    #[tokio::test]
    async fn test_pull_request_lifecycle() {
        let provider = FakeProvider::new("alice");
        let repository = provider.add_repository("acme", "widgets").unwrap();
        let mut pr = provider
            .create_pull_request(&PullRequestArguments {
                title: "Add widget".to_string(),
                head: "feature".to_string(),
                base: "main".to_string(),
                repository: repository.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pr.number, Some(1));
        assert_eq!(pr.url, "https://fake.git/acme/widgets/pull/1");
        assert!(!pr.is_merged());

        provider.merge_pull_request(&pr, "ship it").await.unwrap();
        provider.update_pull_request_status(&mut pr).await.unwrap();
        assert!(pr.is_merged());
        assert!(pr.is_closed());
        // Refreshing again changes nothing.
        let snapshot = pr.clone();
        provider.update_pull_request_status(&mut pr).await.unwrap();
        assert_eq!(pr, snapshot);

        assert!(provider.merge_pull_request(&pr, "again").await.is_err());
    }

    #[tokio::test]
    async fn test_issues_share_numbers_with_pull_requests() {
        let provider = FakeProvider::new("alice");
        provider.add_repository("acme", "widgets").unwrap();
        provider
            .add_pull_request("acme", "widgets", PullRequest::default(), Vec::new())
            .unwrap();
        let issue = provider
            .create_issue(
                "acme",
                "widgets",
                &Issue {
                    title: "Broken widget".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(issue.number, Some(2));
        provider
            .create_issue_comment("acme", "widgets", 2, "confirmed")
            .await
            .unwrap();
        assert_eq!(
            provider.issue_comments("acme", "widgets", 2).unwrap(),
            vec!["confirmed".to_string()]
        );
        assert_eq!(
            provider
                .search_issues("acme", "widgets", "broken")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_webhooks_are_idempotent() {
        let provider = FakeProvider::new("alice");
        let hook = WebhookArguments {
            owner: "acme".to_string(),
            repo: Some(fake_repository("acme", "widgets")),
            url: "https://ci.example.com/fake-webhook/".to_string(),
            ..Default::default()
        };
        provider.create_webhook(&hook).await.unwrap();
        provider.create_webhook(&hook).await.unwrap();
        assert_eq!(provider.list_webhooks("acme", "widgets").await.unwrap().len(), 1);

        provider
            .update_webhook(&WebhookArguments {
                secret: "s3cret".to_string(),
                ..hook.clone()
            })
            .await
            .unwrap();
        let hooks = provider.webhooks().unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].secret, "s3cret");
        assert_eq!(hooks[0].id, 1);
    }

    #[tokio::test]
    async fn test_update_release_fills_missing_fields() {
        let provider = FakeProvider::new("alice");
        provider.add_repository("acme", "widgets").unwrap();
        provider
            .add_release(
                "acme",
                "widgets",
                Release {
                    tag_name: "v1".to_string(),
                    body: "kept".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        provider
            .update_release(
                "acme",
                "widgets",
                "v1",
                &Release {
                    name: "One".to_string(),
                    body: "ignored".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        provider
            .update_release("acme", "widgets", "v2", &Release::default())
            .await
            .unwrap();

        let releases = provider.list_releases("acme", "widgets").await.unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].name, "One");
        assert_eq!(releases[0].body, "kept");
        assert_eq!(releases[1].tag_name, "v2");
    }

    #[tokio::test]
    async fn test_unmodelled_operations_fail_loudly() {
        let provider = FakeProvider::new("alice");
        assert!(matches!(
            provider.get_content("acme", "widgets", "README.md", "").await,
            Err(Error::NotImplemented { .. })
        ));
        assert!(matches!(
            provider.list_invitations().await,
            Err(Error::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_identity() {
        let provider = FakeProvider::new("alice");
        assert_eq!(provider.kind(), Kind::Fake);
        assert_eq!(provider.label(), "fake");
        assert_eq!(provider.webhook_path("", ""), "/fake-webhook/");
        assert_eq!(provider.server_url(), FAKE_GIT_URL);
        assert!(!provider.is_github());
    }
}
