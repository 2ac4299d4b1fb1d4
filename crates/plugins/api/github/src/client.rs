//! GitHub API client implementation.

use async_trait::async_trait;
use gitforge_core::status::{self, StatusTable};
use gitforge_core::{
    find_webhook, normalize_state, Commit, Error, FileContent, GitProvider, Invitation, Issue,
    Kind, Label, Organisation, OrganisationLister, PullRequest, PullRequestArguments, Release,
    ReleaseAsset, RepoStatus, Repository, Result, Retry, User, UserAuth, WebhookArguments,
};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::types::{
    CreateCommentRequest, CreateHookRequest, CreateIssueRequest, CreatePullRequestRequest,
    CreateRepositoryRequest, CreateStatusRequest, ForkRequest, GitHubCombinedStatus,
    GitHubCommit, GitHubContent, GitHubHook, GitHubHookConfig, GitHubInvitation, GitHubIssue,
    GitHubOrganisation, GitHubPullRequest, GitHubRelease, GitHubRepository, GitHubSearchResult,
    GitHubStatus, GitHubUser, MergePullRequestRequest, ReleaseRequest, RenameRepositoryRequest,
    UpdateHookRequest,
};
use crate::{DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_URL};

/// Page size used when draining list endpoints.
const DEFAULT_PAGE_SIZE: u32 = 100;

/// GitHub commit states. GitHub already uses the canonical names.
pub const STATUS_TABLE: StatusTable = &[
    ("pending", status::PENDING),
    ("success", status::SUCCESS),
    ("error", status::ERROR),
    ("failure", status::FAILURE),
];

/// GitHub API client.
pub struct GitHubProvider {
    server_url: String,
    api_url: String,
    auth: UserAuth,
    client: reqwest::Client,
    retry: Retry,
    page_size: u32,
}

impl GitHubProvider {
    /// Create a client for github.com or a GitHub Enterprise server.
    pub fn new(server_url: impl Into<String>, auth: UserAuth) -> Result<Self> {
        let server_url = server_url.into();
        let api_url = api_url_for(&server_url);
        Self::with_api_url(server_url, api_url, auth)
    }

    /// Create a client with an explicit API base URL.
    pub fn with_api_url(
        server_url: impl Into<String>,
        api_url: impl Into<String>,
        auth: UserAuth,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("gitforge")
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth,
            client,
            retry: Retry::read_back(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Replace the read-back retry policy.
    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Build request with common headers.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.auth.token()))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn api(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_url, endpoint)
    }

    /// Get the API URL for an endpoint under a repository.
    fn repo_url(&self, owner: &str, repo: &str, endpoint: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_url, owner, repo, endpoint)
    }

    fn owner_or_self<'a>(&'a self, org: &'a str) -> &'a str {
        if org.is_empty() {
            &self.auth.username
        } else {
            org
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        check_status(response).await
    }

    /// Make an authenticated GET request with typed deserialization.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "GitHub GET request");
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;
        parse_json(response).await
    }

    /// GET every page of a list endpoint.
    async fn get_all<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let page_url = format!(
                "{}{}per_page={}&page={}",
                url, separator, self.page_size, page
            );
            let items: Vec<T> = self.get(&page_url).await?;
            let count = items.len();
            all.extend(items);
            if count < self.page_size as usize {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitHub POST request");
        let response = self
            .send(self.request(reqwest::Method::POST, url).json(body))
            .await?;
        parse_json(response).await
    }

    /// Make an authenticated PATCH request.
    async fn patch<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitHub PATCH request");
        let response = self
            .send(self.request(reqwest::Method::PATCH, url).json(body))
            .await?;
        parse_json(response).await
    }

    /// Send a request whose response body is ignored.
    async fn execute(&self, method: reqwest::Method, url: &str) -> Result<()> {
        debug!(url = url, method = %method, "GitHub request");
        self.send(self.request(method, url)).await?;
        Ok(())
    }

    async fn put_json<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<()> {
        debug!(url = url, "GitHub PUT request");
        self.send(self.request(reqwest::Method::PUT, url).json(body))
            .await?;
        Ok(())
    }

    async fn fetch_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        let url = self.repo_url(owner, repo, &format!("/pulls/{}", number));
        let gh_pr: GitHubPullRequest = self.get(&url).await?;
        Ok(map_pull_request(owner, repo, &gh_pr))
    }
}

/// API base for a server URL.
fn api_url_for(server_url: &str) -> String {
    let trimmed = server_url.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == DEFAULT_GITHUB_URL || trimmed == "github.com" {
        DEFAULT_GITHUB_API_URL.to_string()
    } else {
        format!("{}/api/v3", trimmed)
    }
}

/// Turn non-success responses into errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let status_code = status.as_u16();
    let message = response.text().await.unwrap_or_default();
    warn!(
        status = status_code,
        message = message,
        "GitHub API error response"
    );
    Err(Error::from_status(status_code, message))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
}

// =============================================================================
// Mapping functions: GitHub types -> canonical types
// =============================================================================

fn map_user(gh_user: &GitHubUser) -> User {
    User {
        url: gh_user.html_url.clone().unwrap_or_default(),
        login: gh_user.login.clone(),
        name: gh_user.name.clone().unwrap_or_default(),
        email: gh_user.email.clone().unwrap_or_default(),
        avatar_url: gh_user.avatar_url.clone().unwrap_or_default(),
    }
}

fn map_repository(gh_repo: &GitHubRepository) -> Repository {
    let (scheme, host) = url::Url::parse(&gh_repo.html_url)
        .map(|u| (u.scheme().to_string(), u.host_str().unwrap_or_default().to_string()))
        .unwrap_or_default();
    Repository {
        name: gh_repo.name.clone(),
        organisation: gh_repo
            .owner
            .as_ref()
            .map(|o| o.login.clone())
            .unwrap_or_default(),
        project: String::new(),
        clone_url: gh_repo.clone_url.clone(),
        ssh_url: gh_repo.ssh_url.clone(),
        html_url: gh_repo.html_url.clone(),
        url: gh_repo.url.clone(),
        language: gh_repo.language.clone().unwrap_or_default(),
        fork: gh_repo.fork,
        allow_merge_commit: gh_repo.allow_merge_commit.unwrap_or(false),
        stars: gh_repo.stargazers_count,
        host,
        scheme,
    }
}

fn map_pull_request(owner: &str, repo: &str, gh_pr: &GitHubPullRequest) -> PullRequest {
    PullRequest {
        url: gh_pr.html_url.clone(),
        author: gh_pr.user.as_ref().map(map_user),
        owner: owner.to_string(),
        repo: repo.to_string(),
        number: Some(gh_pr.number),
        mergeable: gh_pr.mergeable,
        merged: gh_pr.merged,
        head_ref: Some(gh_pr.head.ref_name.clone()),
        state: Some(gh_pr.state.clone()),
        statuses_url: gh_pr.statuses_url.clone(),
        issue_url: gh_pr.issue_url.clone(),
        diff_url: gh_pr.diff_url.clone(),
        merge_commit_sha: gh_pr.merge_commit_sha.clone(),
        closed_at: gh_pr.closed_at,
        merged_at: gh_pr.merged_at,
        last_commit_sha: gh_pr.head.sha.clone(),
        title: gh_pr.title.clone(),
        body: gh_pr.body.clone().unwrap_or_default(),
    }
}

fn map_commit(gh_commit: &GitHubCommit) -> Commit {
    Commit {
        sha: gh_commit.sha.clone(),
        message: gh_commit.commit.message.clone(),
        author: gh_commit.author.as_ref().map(map_user),
        committer: gh_commit.committer.as_ref().map(map_user),
        url: gh_commit.html_url.clone(),
        branch: String::new(),
    }
}

fn map_status(gh_status: &GitHubStatus) -> RepoStatus {
    RepoStatus {
        id: gh_status.id.to_string(),
        context: gh_status.context.clone().unwrap_or_default(),
        url: gh_status.url.clone(),
        state: normalize_state(STATUS_TABLE, &gh_status.state),
        target_url: gh_status.target_url.clone().unwrap_or_default(),
        description: gh_status.description.clone().unwrap_or_default(),
    }
}

/// Canonical state to the closest state GitHub accepts.
fn vendor_state(canonical: &str) -> &'static str {
    match canonical {
        status::SUCCESS => "success",
        status::ERROR | status::STOPPED => "error",
        status::FAILURE => "failure",
        _ => "pending",
    }
}

fn map_issue(owner: &str, repo: &str, gh_issue: &GitHubIssue) -> Issue {
    Issue {
        url: gh_issue.html_url.clone(),
        owner: owner.to_string(),
        repo: repo.to_string(),
        number: Some(gh_issue.number),
        key: gh_issue.number.to_string(),
        title: gh_issue.title.clone(),
        body: gh_issue.body.clone().unwrap_or_default(),
        state: Some(gh_issue.state.clone()),
        labels: gh_issue
            .labels
            .iter()
            .map(|l| Label {
                url: l.url.clone().unwrap_or_default(),
                name: l.name.clone(),
                color: l.color.clone().unwrap_or_default(),
            })
            .collect(),
        created_at: gh_issue.created_at,
        updated_at: gh_issue.updated_at,
        closed_at: gh_issue.closed_at,
        is_pull_request: gh_issue.pull_request.is_some(),
        user: gh_issue.user.as_ref().map(map_user),
        closed_by: gh_issue.closed_by.as_ref().map(map_user),
        assignees: gh_issue.assignees.iter().map(map_user).collect(),
    }
}

fn map_hook(owner: &str, repo: &str, gh_hook: &GitHubHook) -> WebhookArguments {
    WebhookArguments {
        id: gh_hook.id,
        owner: owner.to_string(),
        repo: Some(Repository {
            name: repo.to_string(),
            organisation: owner.to_string(),
            ..Default::default()
        }),
        url: gh_hook.config.url.clone(),
        secret: String::new(),
    }
}

fn map_release(gh_release: &GitHubRelease) -> Release {
    Release {
        name: gh_release.name.clone().unwrap_or_default(),
        tag_name: gh_release.tag_name.clone(),
        body: gh_release.body.clone().unwrap_or_default(),
        url: gh_release.url.clone(),
        html_url: gh_release.html_url.clone(),
        download_count: gh_release.assets.iter().map(|a| a.download_count).sum(),
        assets: Some(
            gh_release
                .assets
                .iter()
                .map(|a| ReleaseAsset {
                    browser_download_url: a.browser_download_url.clone(),
                    name: a.name.clone(),
                    content_type: a.content_type.clone(),
                })
                .collect(),
        ),
    }
}

fn map_content(gh_content: GitHubContent) -> FileContent {
    FileContent {
        kind: gh_content.kind,
        encoding: gh_content.encoding.unwrap_or_default(),
        size: gh_content.size,
        name: gh_content.name,
        path: gh_content.path,
        content: gh_content.content.unwrap_or_default(),
        sha: gh_content.sha,
        url: gh_content.url,
        git_url: gh_content.git_url.unwrap_or_default(),
        html_url: gh_content.html_url.unwrap_or_default(),
        download_url: gh_content.download_url.unwrap_or_default(),
    }
}

fn map_invitation(gh_invitation: &GitHubInvitation) -> Invitation {
    Invitation {
        id: gh_invitation.id,
        repository: gh_invitation
            .repository
            .as_ref()
            .map(|r| r.full_name.clone())
            .unwrap_or_default(),
        inviter: gh_invitation
            .inviter
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
        permissions: gh_invitation.permissions.clone(),
        html_url: gh_invitation.html_url.clone(),
    }
}

fn pr_number(pr: &PullRequest) -> Result<u64> {
    pr.number
        .ok_or_else(|| Error::InvalidData(format!("Pull request {} has no number", pr.url)))
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl OrganisationLister for GitHubProvider {
    async fn list_organisations(&self) -> Result<Vec<Organisation>> {
        let orgs: Vec<GitHubOrganisation> = self.get_all(&self.api("/user/orgs")).await?;
        Ok(orgs
            .into_iter()
            .filter(|o| !o.login.is_empty())
            .map(|o| Organisation::new(o.login))
            .collect())
    }
}

#[async_trait]
impl GitProvider for GitHubProvider {
    fn kind(&self) -> Kind {
        Kind::GitHub
    }

    fn label(&self) -> &str {
        "GitHub"
    }

    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn current_username(&self) -> &str {
        &self.auth.username
    }

    fn user_auth(&self) -> UserAuth {
        self.auth.clone()
    }

    fn issue_url(&self, org: &str, name: &str, number: u64, is_pull: bool) -> String {
        let kind = if is_pull { "pull" } else { "issues" };
        format!("{}/{}/{}/{}/{}", self.server_url, org, name, kind, number)
    }

    fn branch_archive_url(&self, org: &str, name: &str, branch: &str) -> String {
        format!(
            "{}/{}/{}/archive/{}.zip",
            self.server_url,
            org,
            name,
            encode(branch)
        )
    }

    fn webhook_path(&self, _git_url: &str, _secret: &str) -> String {
        "/github-webhook/".to_string()
    }

    fn access_token_url(&self) -> String {
        format!(
            "{}/settings/tokens/new?scopes=repo,read:user,read:org,user:email,write:repo_hook,delete_repo",
            self.server_url
        )
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let url = if org.is_empty() || org == self.auth.username {
            self.api("/user/repos?affiliation=owner")
        } else {
            self.api(&format!("/orgs/{}/repos", org))
        };
        let repos: Vec<GitHubRepository> = self.get_all(&url).await?;
        Ok(repos.iter().map(map_repository).collect())
    }

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository> {
        let gh_repo: GitHubRepository = self.get(&self.repo_url(org, name, "")).await?;
        Ok(map_repository(&gh_repo))
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<Repository> {
        let url = if org.is_empty() || org == self.auth.username {
            self.api("/user/repos")
        } else {
            self.api(&format!("/orgs/{}/repos", org))
        };
        let request = CreateRepositoryRequest {
            name: name.to_string(),
            private,
        };
        let gh_repo: GitHubRepository = self.post(&url, &request).await?;
        info!(org = org, name = name, "Created GitHub repository");
        Ok(map_repository(&gh_repo))
    }

    async fn delete_repository(&self, org: &str, name: &str) -> Result<()> {
        let org = self.owner_or_self(org);
        self.execute(reqwest::Method::DELETE, &self.repo_url(org, name, ""))
            .await
    }

    async fn fork_repository(
        &self,
        original_org: &str,
        name: &str,
        destination_org: &str,
    ) -> Result<Repository> {
        let url = self.repo_url(original_org, name, "/forks");
        let request = ForkRequest {
            organization: (!destination_org.is_empty()).then(|| destination_org.to_string()),
        };
        match self.post::<GitHubRepository, _>(&url, &request).await {
            Ok(gh_repo) => Ok(map_repository(&gh_repo)),
            Err(e) if e.to_string().contains("try again later") => {
                let owner = self.owner_or_self(destination_org);
                info!(owner = owner, name = name, "Waiting for the fork to appear");
                self.retry
                    .until_ok("fork", |_| self.get_repository(owner, name))
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn rename_repository(&self, org: &str, name: &str, new_name: &str) -> Result<Repository> {
        let org = self.owner_or_self(org);
        let request = RenameRepositoryRequest {
            name: new_name.to_string(),
        };
        let gh_repo: GitHubRepository = self.patch(&self.repo_url(org, name, ""), &request).await?;
        Ok(map_repository(&gh_repo))
    }

    async fn get_content(
        &self,
        org: &str,
        name: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent> {
        let mut url = self.repo_url(org, name, &format!("/contents/{}", path.trim_start_matches('/')));
        if !git_ref.is_empty() {
            url.push_str(&format!("?ref={}", encode(git_ref)));
        }
        let content: GitHubContent = self.get(&url).await?;
        Ok(map_content(content))
    }

    async fn is_user_in_organisation(&self, user: &str, org: &str) -> Result<bool> {
        let url = self.api(&format!("/orgs/{}/members/{}", org, user));
        debug!(url = url, "GitHub GET request");
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        match response.status().as_u16() {
            204 => Ok(true),
            302 | 404 => Ok(false),
            _ => check_status(response).await.map(|_| false),
        }
    }

    async fn add_collaborator(&self, user: &str, org: &str, repo: &str) -> Result<()> {
        let url = self.repo_url(org, repo, &format!("/collaborators/{}", user));
        self.put_json(&url, &serde_json::json!({ "permission": "push" }))
            .await
    }

    async fn list_invitations(&self) -> Result<Vec<Invitation>> {
        let invitations: Vec<GitHubInvitation> =
            self.get_all(&self.api("/user/repository_invitations")).await?;
        Ok(invitations.iter().map(map_invitation).collect())
    }

    async fn accept_invitation(&self, id: u64) -> Result<()> {
        let url = self.api(&format!("/user/repository_invitations/{}", id));
        self.execute(reqwest::Method::PATCH, &url).await
    }

    async fn create_pull_request(&self, args: &PullRequestArguments) -> Result<PullRequest> {
        let owner = self.owner_or_self(&args.repository.organisation);
        let repo = &args.repository.name;
        let request = CreatePullRequestRequest {
            title: args.title.clone(),
            body: args.body.clone(),
            head: args.head.clone(),
            base: args.base.clone(),
        };
        let gh_pr: GitHubPullRequest = self
            .post(&self.repo_url(owner, repo, "/pulls"), &request)
            .await?;
        Ok(map_pull_request(owner, repo, &gh_pr))
    }

    async fn update_pull_request_status(&self, pr: &mut PullRequest) -> Result<()> {
        let number = pr_number(pr)?;
        *pr = self.fetch_pull_request(&pr.owner, &pr.repo, number).await?;
        Ok(())
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest> {
        self.fetch_pull_request(owner, &repo.name, number).await
    }

    async fn get_pull_request_commits(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<Vec<Commit>> {
        let url = self.repo_url(owner, &repo.name, &format!("/pulls/{}/commits", number));
        let commits: Vec<GitHubCommit> = self.get_all(&url).await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn pull_request_last_commit_status(&self, pr: &PullRequest) -> Result<String> {
        if pr.last_commit_sha.is_empty() {
            return Err(Error::InvalidData(format!(
                "Pull request {} has no head commit",
                pr.number_string()
            )));
        }
        let url = self.repo_url(
            &pr.owner,
            &pr.repo,
            &format!("/commits/{}/status", pr.last_commit_sha),
        );
        let combined: GitHubCombinedStatus = self.get(&url).await?;
        Ok(normalize_state(STATUS_TABLE, &combined.state))
    }

    async fn merge_pull_request(&self, pr: &PullRequest, message: &str) -> Result<()> {
        let number = pr_number(pr)?;
        let url = self.repo_url(&pr.owner, &pr.repo, &format!("/pulls/{}/merge", number));
        let request = MergePullRequestRequest {
            commit_message: message.to_string(),
        };
        self.put_json(&url, &request).await
    }

    async fn add_pr_comment(&self, pr: &PullRequest, comment: &str) -> Result<()> {
        let number = pr_number(pr)?;
        self.create_issue_comment(&pr.owner, &pr.repo, number, comment)
            .await
    }

    async fn list_commit_statuses(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<RepoStatus>> {
        let url = self.repo_url(org, repo, &format!("/commits/{}/statuses", sha));
        let statuses: Vec<GitHubStatus> = self.get_all(&url).await?;
        Ok(statuses.iter().map(map_status).collect())
    }

    async fn update_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &RepoStatus,
    ) -> Result<RepoStatus> {
        let url = self.repo_url(org, repo, &format!("/statuses/{}", sha));
        let request = CreateStatusRequest {
            state: vendor_state(&status.state).to_string(),
            target_url: status.target_url.clone(),
            description: status.description.clone(),
            context: status.context.clone(),
        };
        let gh_status: GitHubStatus = self.post(&url, &request).await?;
        Ok(map_status(&gh_status))
    }

    async fn search_issues(&self, org: &str, name: &str, query: &str) -> Result<Vec<Issue>> {
        let q = format!("repo:{}/{} is:issue {}", org, name, query);
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let url = self.api(&format!(
                "/search/issues?q={}&per_page={}&page={}",
                encode(q.trim()),
                self.page_size,
                page
            ));
            let result: GitHubSearchResult<GitHubIssue> = self.get(&url).await?;
            let count = result.items.len();
            all.extend(result.items.iter().map(|i| map_issue(org, name, i)));
            if count < self.page_size as usize || all.len() as u64 >= result.total_count {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue> {
        let url = self.repo_url(org, name, &format!("/issues/{}", number));
        let gh_issue: GitHubIssue = self.get(&url).await?;
        Ok(map_issue(org, name, &gh_issue))
    }

    async fn create_issue(&self, owner: &str, repo: &str, issue: &Issue) -> Result<Issue> {
        let request = CreateIssueRequest {
            title: issue.title.clone(),
            body: (!issue.body.is_empty()).then(|| issue.body.clone()),
            labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
            assignees: issue.assignees.iter().map(|u| u.login.clone()).collect(),
        };
        let gh_issue: GitHubIssue = self
            .post(&self.repo_url(owner, repo, "/issues"), &request)
            .await?;
        Ok(map_issue(owner, repo, &gh_issue))
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
    ) -> Result<()> {
        let url = self.repo_url(owner, repo, &format!("/issues/{}/comments", number));
        let request = CreateCommentRequest {
            body: comment.to_string(),
        };
        let _: serde_json::Value = self.post(&url, &request).await?;
        Ok(())
    }

    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner_or_self(&data.owner);
        let repo = data.repo_name();
        let hooks = self.list_webhooks(owner, repo).await?;
        if let Some(existing) = find_webhook(&hooks, &data.url) {
            warn!(
                url = data.url,
                id = existing.id,
                "Webhook already exists, skipping creation"
            );
            return Ok(());
        }

        info!(owner = owner, repo = repo, url = data.url, "Creating GitHub webhook");
        let request = CreateHookRequest {
            name: "web".to_string(),
            active: true,
            events: vec!["*".to_string()],
            config: hook_config(data),
        };
        let _: GitHubHook = self
            .post(&self.repo_url(owner, repo, "/hooks"), &request)
            .await?;
        Ok(())
    }

    async fn list_webhooks(&self, org: &str, repo: &str) -> Result<Vec<WebhookArguments>> {
        let hooks: Vec<GitHubHook> = self.get_all(&self.repo_url(org, repo, "/hooks")).await?;
        Ok(hooks.iter().map(|h| map_hook(org, repo, h)).collect())
    }

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner_or_self(&data.owner);
        let repo = data.repo_name();
        let id = if data.id != 0 {
            data.id
        } else {
            let hooks = self.list_webhooks(owner, repo).await?;
            match find_webhook(&hooks, &data.url) {
                Some(existing) => existing.id,
                None => return self.create_webhook(data).await,
            }
        };
        let request = UpdateHookRequest {
            active: true,
            config: hook_config(data),
        };
        let _: GitHubHook = self
            .patch(&self.repo_url(owner, repo, &format!("/hooks/{}", id)), &request)
            .await?;
        Ok(())
    }

    async fn list_releases(&self, org: &str, name: &str) -> Result<Vec<Release>> {
        let releases: Vec<GitHubRelease> =
            self.get_all(&self.repo_url(org, name, "/releases")).await?;
        Ok(releases.iter().map(map_release).collect())
    }

    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        release: &Release,
    ) -> Result<()> {
        let url = self.repo_url(owner, repo, &format!("/releases/tags/{}", encode(tag)));
        match self.get::<GitHubRelease>(&url).await {
            Ok(existing) => {
                let mut merged = map_release(&existing);
                merged.merge_missing_from(release);
                let request = ReleaseRequest {
                    tag_name: tag.to_string(),
                    name: merged.name,
                    body: merged.body,
                };
                let edit_url = self.repo_url(owner, repo, &format!("/releases/{}", existing.id));
                let _: GitHubRelease = self.patch(&edit_url, &request).await?;
                Ok(())
            }
            Err(Error::NotFound(_)) => {
                let request = ReleaseRequest {
                    tag_name: tag.to_string(),
                    name: release.name.clone(),
                    body: release.body.clone(),
                };
                let _: GitHubRelease = self
                    .post(&self.repo_url(owner, repo, "/releases"), &request)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn user_info(&self, username: &str) -> Result<User> {
        let gh_user: GitHubUser = self.get(&self.api(&format!("/users/{}", username))).await?;
        Ok(map_user(&gh_user))
    }
}

fn hook_config(data: &WebhookArguments) -> GitHubHookConfig {
    GitHubHookConfig {
        url: data.url.clone(),
        content_type: "json".to_string(),
        secret: (!data.secret.is_empty()).then(|| data.secret.clone()),
    }
}
