//! GitLab API client implementation.

use async_trait::async_trait;
use gitforge_core::status::{self, StatusTable};
use gitforge_core::{
    find_webhook, filter_closed_since, normalize_state, repo_full_name, Commit, Error,
    FileContent, GitProvider, Issue, Kind, Label, Organisation, OrganisationLister, PullRequest,
    PullRequestArguments, Release, ReleaseAsset, RepoStatus, Repository, Result, User, UserAuth,
    WebhookArguments,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::types::{
    AcceptMergeRequestRequest, CreateCommitStatusRequest, CreateIssueRequest,
    CreateMergeRequestRequest, CreateNoteRequest, CreateProjectRequest, EditProjectRequest,
    ForkProjectRequest, GitLabCommit, GitLabCommitStatus, GitLabFile, GitLabGroup, GitLabHook,
    GitLabIssue, GitLabMergeRequest, GitLabProject, GitLabRelease, GitLabUser, HookRequest,
    ReleaseRequest,
};
use crate::DEFAULT_GITLAB_URL;

const DEFAULT_PAGE_SIZE: u32 = 100;

/// GitLab pipeline and job states.
pub const STATUS_TABLE: StatusTable = &[
    ("pending", status::PENDING),
    ("created", status::PENDING),
    ("waiting_for_resource", status::PENDING),
    ("preparing", status::PENDING),
    ("scheduled", status::PENDING),
    ("manual", status::PENDING),
    ("running", status::IN_PROGRESS),
    ("success", status::SUCCESS),
    ("failed", status::FAILURE),
    ("canceled", status::STOPPED),
    ("skipped", status::SUCCESS),
];

/// GitLab API client.
pub struct GitLabProvider {
    base_url: String,
    auth: UserAuth,
    client: reqwest::Client,
    page_size: u32,
}

impl GitLabProvider {
    /// Create a new client for gitlab.com.
    pub fn new(auth: UserAuth) -> Self {
        Self::with_base_url(DEFAULT_GITLAB_URL, auth)
    }

    /// Create a new GitLab client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, auth: UserAuth) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            client: reqwest::Client::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Build request with common headers.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        if self.auth.bearer_token.is_empty() {
            builder.header("PRIVATE-TOKEN", &self.auth.api_token)
        } else {
            builder.header("Authorization", format!("Bearer {}", self.auth.bearer_token))
        }
    }

    /// Get the API URL for a given endpoint (non-project-scoped).
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/v4{}", self.base_url, endpoint)
    }

    fn project_api_url(&self, project_id: u64, endpoint: &str) -> String {
        self.api_url(&format!("/projects/{}{}", project_id, endpoint))
    }

    fn owner<'a>(&'a self, org: &'a str) -> &'a str {
        if org.is_empty() {
            &self.auth.username
        } else {
            org
        }
    }

    /// Make an authenticated GET request with typed deserialization.
    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "GitLab GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
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
                return Ok(all);
            }
            page += 1;
        }
    }

    /// Make an authenticated POST request.
    async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitLab POST request");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated PUT request.
    async fn put<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "GitLab PUT request");

        let response = self
            .request(reqwest::Method::PUT, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        debug!(url = url, "GitLab DELETE request");

        let response = self
            .request(reqwest::Method::DELETE, url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), message));
        }
        Ok(())
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "GitLab API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Projects of a group, or the owned projects of a user when `org` is not a group.
    async fn list_projects(&self, org: &str) -> Result<Vec<GitLabProject>> {
        if !org.is_empty() {
            let url = self.api_url(&format!("/groups/{}/projects", encode(org)));
            match self.get_all(&url).await {
                Ok(projects) => return Ok(projects),
                Err(Error::NotFound(_)) => {
                    debug!(org = org, "No such group, listing user projects instead");
                }
                Err(e) => return Err(e),
            }
        }
        let url = self.api_url(&format!(
            "/users/{}/projects?owned=true",
            encode(self.owner(org))
        ));
        self.get_all(&url).await
    }

    async fn find_project(&self, org: &str, name: &str) -> Result<GitLabProject> {
        self.list_projects(org)
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No repository found with name {}",
                    repo_full_name(org, name)
                ))
            })
    }

    async fn project_id(&self, org: &str, name: &str) -> Result<u64> {
        Ok(self.find_project(org, name).await?.id)
    }

    async fn fetch_merge_request(&self, owner: &str, repo: &str, iid: u64) -> Result<PullRequest> {
        let pid = self.project_id(owner, repo).await?;
        let url = self.project_api_url(pid, &format!("/merge_requests/{}", iid));
        let mr: GitLabMergeRequest = self.get(&url).await?;
        Ok(map_merge_request(owner, repo, &mr))
    }

    async fn list_issues(&self, org: &str, repo: &str, query: &str) -> Result<Vec<Issue>> {
        let pid = self.project_id(org, repo).await?;
        let mut url = self.project_api_url(pid, "/issues");
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        let issues: Vec<GitLabIssue> = self.get_all(&url).await?;
        let owner = self.owner(org);
        Ok(issues.iter().map(|i| map_issue(owner, repo, i)).collect())
    }

    fn hook_url(&self, data: &WebhookArguments) -> String {
        format!(
            "{}/{}/{}",
            data.url.trim_end_matches('/'),
            self.owner(&data.owner),
            data.repo_name()
        )
    }
}

// =============================================================================
// Mapping functions: GitLab types -> canonical types
// =============================================================================

fn map_user(gl_user: &GitLabUser) -> User {
    User {
        url: gl_user
            .web_url
            .clone()
            .or_else(|| gl_user.website_url.clone())
            .unwrap_or_default(),
        login: gl_user.username.clone(),
        name: gl_user.name.clone().unwrap_or_default(),
        email: gl_user.email.clone().unwrap_or_default(),
        avatar_url: gl_user.avatar_url.clone().unwrap_or_default(),
    }
}

fn map_project(gl_project: &GitLabProject) -> Repository {
    let (scheme, host) = url::Url::parse(&gl_project.web_url)
        .map(|u| (u.scheme().to_string(), u.host_str().unwrap_or_default().to_string()))
        .unwrap_or_default();
    let organisation = gl_project
        .namespace
        .as_ref()
        .map(|n| {
            if n.full_path.is_empty() {
                n.path.clone()
            } else {
                n.full_path.clone()
            }
        })
        .unwrap_or_default();
    Repository {
        name: gl_project.name.clone(),
        organisation,
        clone_url: gl_project.http_url_to_repo.clone(),
        ssh_url: gl_project.ssh_url_to_repo.clone(),
        html_url: gl_project.web_url.clone(),
        fork: gl_project.forked_from_project.is_some(),
        stars: gl_project.star_count,
        host,
        scheme,
        ..Default::default()
    }
}

fn map_merge_request(owner: &str, repo: &str, gl_mr: &GitLabMergeRequest) -> PullRequest {
    let mergeable = match gl_mr.merge_status.as_deref() {
        Some("can_be_merged") => Some(true),
        Some("cannot_be_merged") => Some(false),
        _ => None,
    };
    PullRequest {
        url: gl_mr.web_url.clone(),
        author: gl_mr.author.as_ref().map(map_user),
        owner: owner.to_string(),
        repo: repo.to_string(),
        number: Some(gl_mr.iid),
        mergeable,
        merged: Some(gl_mr.merged_at.is_some()),
        head_ref: Some(gl_mr.source_branch.clone()),
        state: Some(gl_mr.state.clone()),
        merge_commit_sha: gl_mr.merge_commit_sha.clone(),
        closed_at: gl_mr.closed_at.or(gl_mr.merged_at),
        merged_at: gl_mr.merged_at,
        last_commit_sha: gl_mr.sha.clone().unwrap_or_default(),
        title: gl_mr.title.clone(),
        body: gl_mr.description.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn map_commit(gl_commit: &GitLabCommit) -> Commit {
    Commit {
        sha: gl_commit.id.clone(),
        message: gl_commit.message.clone(),
        author: Some(User {
            name: gl_commit.author_name.clone(),
            email: gl_commit.author_email.clone(),
            ..Default::default()
        }),
        committer: Some(User {
            name: gl_commit.committer_name.clone(),
            email: gl_commit.committer_email.clone(),
            ..Default::default()
        }),
        url: gl_commit.web_url.clone(),
        branch: String::new(),
    }
}

fn map_commit_status(gl_status: &GitLabCommitStatus) -> RepoStatus {
    RepoStatus {
        id: gl_status.id.to_string(),
        context: gl_status.name.clone().unwrap_or_default(),
        url: gl_status.target_url.clone().unwrap_or_default(),
        state: normalize_state(STATUS_TABLE, &gl_status.status),
        target_url: gl_status.target_url.clone().unwrap_or_default(),
        description: gl_status.description.clone().unwrap_or_default(),
    }
}

/// Canonical state to the GitLab commit status state.
fn vendor_state(canonical: &str) -> &'static str {
    match canonical {
        status::SUCCESS => "success",
        status::IN_PROGRESS => "running",
        status::FAILURE | status::ERROR => "failed",
        status::STOPPED => "canceled",
        _ => "pending",
    }
}

fn map_issue(owner: &str, repo: &str, gl_issue: &GitLabIssue) -> Issue {
    Issue {
        url: gl_issue.web_url.clone(),
        owner: owner.to_string(),
        repo: repo.to_string(),
        number: Some(gl_issue.iid),
        key: gl_issue.iid.to_string(),
        title: gl_issue.title.clone(),
        body: gl_issue.description.clone().unwrap_or_default(),
        state: Some(gl_issue.state.clone()),
        labels: gl_issue
            .labels
            .iter()
            .map(|name| Label {
                name: name.clone(),
                ..Default::default()
            })
            .collect(),
        created_at: gl_issue.created_at,
        updated_at: gl_issue.updated_at,
        closed_at: gl_issue.closed_at,
        is_pull_request: false,
        user: gl_issue.author.as_ref().map(map_user),
        closed_by: gl_issue.closed_by.as_ref().map(map_user),
        assignees: gl_issue.assignees.iter().map(map_user).collect(),
    }
}

fn map_hook(owner: &str, repo: &str, gl_hook: &GitLabHook) -> WebhookArguments {
    WebhookArguments {
        id: gl_hook.id,
        owner: owner.to_string(),
        repo: Some(Repository {
            name: repo.to_string(),
            organisation: owner.to_string(),
            ..Default::default()
        }),
        url: gl_hook.url.clone(),
        secret: String::new(),
    }
}

fn map_release(gl_release: &GitLabRelease) -> Release {
    let links = gl_release
        .assets
        .as_ref()
        .map(|a| a.links.as_slice())
        .unwrap_or_default();
    Release {
        name: gl_release.name.clone().unwrap_or_default(),
        tag_name: gl_release.tag_name.clone(),
        body: gl_release.description.clone().unwrap_or_default(),
        url: String::new(),
        html_url: gl_release
            .links
            .as_ref()
            .and_then(|l| l.self_url.clone())
            .unwrap_or_default(),
        download_count: 0,
        assets: Some(
            links
                .iter()
                .map(|link| ReleaseAsset {
                    browser_download_url: link.url.clone(),
                    name: link.name.clone(),
                    content_type: link.link_type.clone().unwrap_or_default(),
                })
                .collect(),
        ),
    }
}

fn map_file(gl_file: GitLabFile) -> FileContent {
    FileContent {
        kind: "file".to_string(),
        encoding: gl_file.encoding,
        size: gl_file.size,
        name: gl_file.file_name,
        path: gl_file.file_path,
        content: gl_file.content,
        sha: gl_file.blob_id,
        ..Default::default()
    }
}

fn mr_iid(pr: &PullRequest) -> Result<u64> {
    pr.number
        .ok_or_else(|| Error::InvalidData(format!("Merge request {} has no iid", pr.url)))
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl OrganisationLister for GitLabProvider {
    async fn list_organisations(&self) -> Result<Vec<Organisation>> {
        let groups: Vec<GitLabGroup> = self.get_all(&self.api_url("/groups")).await?;
        Ok(groups.into_iter().map(|g| Organisation::new(g.path)).collect())
    }
}

#[async_trait]
impl GitProvider for GitLabProvider {
    fn kind(&self) -> Kind {
        Kind::GitLab
    }

    fn label(&self) -> &str {
        "GitLab"
    }

    fn server_url(&self) -> &str {
        &self.base_url
    }

    fn current_username(&self) -> &str {
        &self.auth.username
    }

    fn user_auth(&self) -> UserAuth {
        self.auth.clone()
    }

    fn issue_url(&self, org: &str, name: &str, number: u64, is_pull: bool) -> String {
        let kind = if is_pull { "merge_requests" } else { "issues" };
        format!("{}/{}/{}/-/{}/{}", self.base_url, org, name, kind, number)
    }

    fn branch_archive_url(&self, org: &str, name: &str, branch: &str) -> String {
        format!(
            "{}/{}/{}/-/archive/{}/{}-{}.zip",
            self.base_url, org, name, branch, name, branch
        )
    }

    fn webhook_path(&self, _git_url: &str, _secret: &str) -> String {
        "/project".to_string()
    }

    fn access_token_url(&self) -> String {
        format!("{}/profile/personal_access_tokens", self.base_url)
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let projects = self.list_projects(org).await?;
        Ok(projects.iter().map(map_project).collect())
    }

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository> {
        let project = self.find_project(org, name).await?;
        Ok(map_project(&project))
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<Repository> {
        let namespace_id = if org.is_empty() || org == self.auth.username {
            None
        } else {
            let group: GitLabGroup = self
                .get(&self.api_url(&format!("/groups/{}", encode(org))))
                .await?;
            Some(group.id)
        };
        let request = CreateProjectRequest {
            name: name.to_string(),
            visibility: if private { "private" } else { "public" }.to_string(),
            namespace_id,
        };
        let project: GitLabProject = self.post(&self.api_url("/projects"), &request).await?;
        info!(org = org, name = name, "Created GitLab project");
        Ok(map_project(&project))
    }

    async fn delete_repository(&self, org: &str, name: &str) -> Result<()> {
        let pid = self.project_id(org, name).await?;
        self.delete(&self.project_api_url(pid, "")).await
    }

    async fn fork_repository(
        &self,
        original_org: &str,
        name: &str,
        destination_org: &str,
    ) -> Result<Repository> {
        let pid = self.project_id(original_org, name).await?;
        let request = ForkProjectRequest {
            namespace_path: (!destination_org.is_empty()).then(|| destination_org.to_string()),
        };
        let project: GitLabProject = self
            .post(&self.project_api_url(pid, "/fork"), &request)
            .await?;
        Ok(map_project(&project))
    }

    async fn rename_repository(&self, org: &str, name: &str, new_name: &str) -> Result<Repository> {
        let pid = self.project_id(org, name).await?;
        let request = EditProjectRequest {
            name: new_name.to_string(),
        };
        let project: GitLabProject = self.put(&self.project_api_url(pid, ""), &request).await?;
        Ok(map_project(&project))
    }

    async fn get_content(
        &self,
        org: &str,
        name: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent> {
        let pid = self.project_id(org, name).await?;
        let git_ref = if git_ref.is_empty() { "HEAD" } else { git_ref };
        let url = self.project_api_url(
            pid,
            &format!(
                "/repository/files/{}?ref={}",
                encode(path.trim_start_matches('/')),
                encode(git_ref)
            ),
        );
        let file: GitLabFile = self.get(&url).await?;
        Ok(map_file(file))
    }

    async fn create_pull_request(&self, args: &PullRequestArguments) -> Result<PullRequest> {
        let owner = self.owner(&args.repository.organisation);
        let repo = &args.repository.name;
        let pid = self.project_id(owner, repo).await?;
        let request = CreateMergeRequestRequest {
            title: args.title.clone(),
            description: args.body.clone(),
            source_branch: args.head.clone(),
            target_branch: args.base.clone(),
        };
        let mr: GitLabMergeRequest = self
            .post(&self.project_api_url(pid, "/merge_requests"), &request)
            .await?;
        Ok(map_merge_request(owner, repo, &mr))
    }

    async fn update_pull_request_status(&self, pr: &mut PullRequest) -> Result<()> {
        let iid = mr_iid(pr)?;
        *pr = self.fetch_merge_request(&pr.owner, &pr.repo, iid).await?;
        Ok(())
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest> {
        let mut pr = self.fetch_merge_request(owner, &repo.name, number).await?;
        let login = pr.author.as_ref().map(|a| a.login.clone()).unwrap_or_default();
        if !login.is_empty() {
            match self.user_info(&login).await {
                Ok(user) if !user.email.is_empty() => pr.author = Some(user),
                Ok(_) => {}
                Err(e) => debug!(login = login, error = %e, "Could not look up merge request author"),
            }
        }
        Ok(pr)
    }

    async fn get_pull_request_commits(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<Vec<Commit>> {
        let pid = self.project_id(owner, &repo.name).await?;
        let url = self.project_api_url(pid, &format!("/merge_requests/{}/commits", number));
        let commits: Vec<GitLabCommit> = self.get_all(&url).await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn pull_request_last_commit_status(&self, pr: &PullRequest) -> Result<String> {
        if pr.last_commit_sha.is_empty() {
            return Err(Error::InvalidData(format!(
                "Merge request {} has no head commit",
                pr.number_string()
            )));
        }
        let statuses = self
            .list_commit_statuses(&pr.owner, &pr.repo, &pr.last_commit_sha)
            .await?;
        statuses
            .into_iter()
            .find(|s| !s.state.is_empty())
            .map(|s| s.state)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Could not find a status for repository {} with ref {}",
                    repo_full_name(&pr.owner, &pr.repo),
                    pr.last_commit_sha
                ))
            })
    }

    async fn merge_pull_request(&self, pr: &PullRequest, message: &str) -> Result<()> {
        let iid = mr_iid(pr)?;
        let pid = self.project_id(&pr.owner, &pr.repo).await?;
        let request = AcceptMergeRequestRequest {
            merge_commit_message: message.to_string(),
        };
        let _: GitLabMergeRequest = self
            .put(
                &self.project_api_url(pid, &format!("/merge_requests/{}/merge", iid)),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn add_pr_comment(&self, pr: &PullRequest, comment: &str) -> Result<()> {
        let iid = mr_iid(pr)?;
        let pid = self.project_id(&pr.owner, &pr.repo).await?;
        let request = CreateNoteRequest {
            body: comment.to_string(),
        };
        let _: serde_json::Value = self
            .post(
                &self.project_api_url(pid, &format!("/merge_requests/{}/notes", iid)),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn list_commit_statuses(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<RepoStatus>> {
        let pid = self.project_id(org, repo).await?;
        let url = self.project_api_url(pid, &format!("/repository/commits/{}/statuses", sha));
        let statuses: Vec<GitLabCommitStatus> = self.get_all(&url).await?;
        Ok(statuses.iter().map(map_commit_status).collect())
    }

    async fn update_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &RepoStatus,
    ) -> Result<RepoStatus> {
        let pid = self.project_id(org, repo).await?;
        let request = CreateCommitStatusRequest {
            state: vendor_state(&status.state).to_string(),
            name: status.context.clone(),
            target_url: status.target_url.clone(),
            description: status.description.clone(),
        };
        let gl_status: GitLabCommitStatus = self
            .post(&self.project_api_url(pid, &format!("/statuses/{}", sha)), &request)
            .await?;
        Ok(map_commit_status(&gl_status))
    }

    async fn search_issues(&self, org: &str, name: &str, query: &str) -> Result<Vec<Issue>> {
        let filter = if query.is_empty() {
            String::new()
        } else {
            format!("search={}", encode(query))
        };
        self.list_issues(org, name, &filter).await
    }

    async fn search_issues_closed_since(
        &self,
        org: &str,
        name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>> {
        let issues = self.list_issues(org, name, "state=closed").await?;
        Ok(filter_closed_since(issues, since))
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue> {
        let pid = self.project_id(org, name).await?;
        let gl_issue: GitLabIssue = self
            .get(&self.project_api_url(pid, &format!("/issues/{}", number)))
            .await?;
        Ok(map_issue(self.owner(org), name, &gl_issue))
    }

    async fn create_issue(&self, owner: &str, repo: &str, issue: &Issue) -> Result<Issue> {
        let pid = self.project_id(owner, repo).await?;
        let labels: Vec<&str> = issue
            .labels
            .iter()
            .map(|l| l.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();
        let request = CreateIssueRequest {
            title: issue.title.clone(),
            description: (!issue.body.is_empty()).then(|| issue.body.clone()),
            labels: (!labels.is_empty()).then(|| labels.join(",")),
        };
        let gl_issue: GitLabIssue = self
            .post(&self.project_api_url(pid, "/issues"), &request)
            .await?;
        Ok(map_issue(owner, repo, &gl_issue))
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
    ) -> Result<()> {
        let pid = self.project_id(owner, repo).await?;
        let request = CreateNoteRequest {
            body: comment.to_string(),
        };
        let _: serde_json::Value = self
            .post(
                &self.project_api_url(pid, &format!("/issues/{}/notes", number)),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner(&data.owner);
        let repo = data.repo_name();
        let url = self.hook_url(data);
        let hooks = self.list_webhooks(owner, repo).await?;
        if let Some(existing) = find_webhook(&hooks, &url) {
            warn!(
                url = url,
                id = existing.id,
                "Webhook already exists, skipping creation"
            );
            return Ok(());
        }

        let pid = self.project_id(owner, repo).await?;
        info!(owner = owner, repo = repo, url = url, "Creating GitLab project hook");
        let request = HookRequest {
            url,
            token: data.secret.clone(),
            push_events: true,
            merge_requests_events: true,
        };
        let _: GitLabHook = self
            .post(&self.project_api_url(pid, "/hooks"), &request)
            .await?;
        Ok(())
    }

    async fn list_webhooks(&self, org: &str, repo: &str) -> Result<Vec<WebhookArguments>> {
        let pid = self.project_id(org, repo).await?;
        let hooks: Vec<GitLabHook> = self.get_all(&self.project_api_url(pid, "/hooks")).await?;
        Ok(hooks.iter().map(|h| map_hook(org, repo, h)).collect())
    }

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner(&data.owner);
        let repo = data.repo_name();
        let url = self.hook_url(data);
        let id = if data.id != 0 {
            data.id
        } else {
            let hooks = self.list_webhooks(owner, repo).await?;
            match find_webhook(&hooks, &url) {
                Some(existing) => existing.id,
                None => return self.create_webhook(data).await,
            }
        };
        let pid = self.project_id(owner, repo).await?;
        let request = HookRequest {
            url,
            token: data.secret.clone(),
            push_events: true,
            merge_requests_events: true,
        };
        let _: GitLabHook = self
            .put(&self.project_api_url(pid, &format!("/hooks/{}", id)), &request)
            .await?;
        Ok(())
    }

    async fn list_releases(&self, org: &str, name: &str) -> Result<Vec<Release>> {
        let pid = self.project_id(org, name).await?;
        let releases: Vec<GitLabRelease> =
            self.get_all(&self.project_api_url(pid, "/releases")).await?;
        Ok(releases.iter().map(map_release).collect())
    }

    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        release: &Release,
    ) -> Result<()> {
        let pid = self.project_id(owner, repo).await?;
        let tag_url = self.project_api_url(pid, &format!("/releases/{}", encode(tag)));
        match self.get::<GitLabRelease>(&tag_url).await {
            Ok(existing) => {
                let mut merged = map_release(&existing);
                merged.merge_missing_from(release);
                let request = ReleaseRequest {
                    tag_name: tag.to_string(),
                    name: merged.name,
                    description: merged.body,
                };
                let _: GitLabRelease = self.put(&tag_url, &request).await?;
                Ok(())
            }
            Err(Error::NotFound(_)) => {
                let request = ReleaseRequest {
                    tag_name: tag.to_string(),
                    name: release.name.clone(),
                    description: release.body.clone(),
                };
                let _: GitLabRelease = self
                    .post(&self.project_api_url(pid, "/releases"), &request)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn user_info(&self, username: &str) -> Result<User> {
        let url = self.api_url(&format!("/users?username={}", encode(username)));
        let users: Vec<GitLabUser> = self.get(&url).await?;
        users
            .first()
            .map(|u| User {
                login: username.to_string(),
                ..map_user(u)
            })
            .ok_or_else(|| Error::NotFound(format!("GitLab user {}", username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        for vendor in [
            "pending",
            "created",
            "waiting_for_resource",
            "preparing",
            "scheduled",
            "manual",
        ] {
            assert_eq!(normalize_state(STATUS_TABLE, vendor), "pending", "{}", vendor);
        }
        assert_eq!(normalize_state(STATUS_TABLE, "running"), "in-progress");
        assert_eq!(normalize_state(STATUS_TABLE, "success"), "success");
        assert_eq!(normalize_state(STATUS_TABLE, "failed"), "failure");
        assert_eq!(normalize_state(STATUS_TABLE, "canceled"), "stopped");
        assert_eq!(normalize_state(STATUS_TABLE, "skipped"), "success");
        assert_eq!(normalize_state(STATUS_TABLE, "Bogus"), "pending");
    }

    #[test]
    fn test_vendor_state() {
        assert_eq!(vendor_state("in-progress"), "running");
        assert_eq!(vendor_state("stopped"), "canceled");
        assert_eq!(vendor_state("error"), "failed");
        assert_eq!(vendor_state("pending"), "pending");
    }

    #[test]
    fn test_map_merge_request_merged_at_means_merged() {
        let gl_mr: GitLabMergeRequest = serde_json::from_value(serde_json::json!({
            "id": 1,
            "iid": 3,
            "title": "Feature",
            "state": "merged",
            "source_branch": "feature",
            "target_branch": "main",
            "web_url": "https://gitlab.com/acme/widgets/-/merge_requests/3",
            "merged_at": "2024-05-01T10:00:00.000Z",
            "sha": "abc",
            "merge_status": "can_be_merged"
        }))
        .unwrap();

        let pr = map_merge_request("acme", "widgets", &gl_mr);
        assert!(pr.is_merged());
        assert!(pr.is_closed());
        assert_eq!(pr.mergeable, Some(true));
        assert_eq!(pr.last_commit_sha, "abc");
        assert_eq!(pr.head_ref.as_deref(), Some("feature"));
    }

    #[test]
    fn test_map_project() {
        let gl_project: GitLabProject = serde_json::from_value(serde_json::json!({
            "id": 5,
            "name": "widgets",
            "namespace": {"path": "acme", "full_path": "acme"},
            "web_url": "https://gitlab.example.com/acme/widgets",
            "http_url_to_repo": "https://gitlab.example.com/acme/widgets.git",
            "ssh_url_to_repo": "git@gitlab.example.com:acme/widgets.git",
            "forked_from_project": {"id": 1},
            "star_count": 4
        }))
        .unwrap();

        let repo = map_project(&gl_project);
        assert_eq!(repo.organisation, "acme");
        assert_eq!(repo.host, "gitlab.example.com");
        assert!(repo.fork);
        assert_eq!(repo.stars, 4);
    }

    #[test]
    fn test_urls() {
        let client = GitLabProvider::with_base_url(
            "https://gitlab.example.com/",
            UserAuth::new("alice", "token"),
        );
        assert_eq!(
            client.branch_archive_url("acme", "widgets", "main"),
            "https://gitlab.example.com/acme/widgets/-/archive/main/widgets-main.zip"
        );
        assert_eq!(
            client.access_token_url(),
            "https://gitlab.example.com/profile/personal_access_tokens"
        );
        assert_eq!(client.webhook_path("", ""), "/project");
        assert_eq!(
            client.issue_url("acme", "widgets", 4, false),
            "https://gitlab.example.com/acme/widgets/-/issues/4"
        );
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use chrono::TimeZone;
        use httpmock::prelude::*;

        fn create_test_client(server: &MockServer) -> GitLabProvider {
            GitLabProvider::with_base_url(server.base_url(), UserAuth::new("alice", "glpat-test"))
        }

        fn project_json(id: u64, name: &str) -> serde_json::Value {
            serde_json::json!({
                "id": id,
                "name": name,
                "namespace": {"path": "acme", "full_path": "acme"},
                "web_url": format!("https://gitlab.com/acme/{}", name),
                "http_url_to_repo": format!("https://gitlab.com/acme/{}.git", name),
                "ssh_url_to_repo": format!("git@gitlab.com:acme/{}.git", name)
            })
        }

        fn mock_group_projects(server: &MockServer) {
            server.mock(|when, then| {
                when.method(GET).path("/api/v4/groups/acme/projects");
                then.status(200).json_body(serde_json::json!([
                    project_json(123, "widgets"),
                    project_json(124, "gadgets")
                ]));
            });
        }

        #[tokio::test]
        async fn test_list_repositories_drains_pages() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/groups/acme/projects")
                    .query_param("page", "1")
                    .header("PRIVATE-TOKEN", "glpat-test");
                then.status(200).json_body(serde_json::json!([
                    project_json(1, "a"),
                    project_json(2, "b")
                ]));
            });
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/groups/acme/projects")
                    .query_param("page", "2");
                then.status(200)
                    .json_body(serde_json::json!([project_json(3, "c")]));
            });

            let client = create_test_client(&server).with_page_size(2);
            let repos = client.list_repositories("acme").await.unwrap();
            let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
        }

        #[tokio::test]
        async fn test_list_repositories_falls_back_to_user_projects() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v4/groups/alice/projects");
                then.status(404).body("{\"message\":\"404 Group Not Found\"}");
            });
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/users/alice/projects")
                    .query_param("owned", "true");
                then.status(200)
                    .json_body(serde_json::json!([project_json(9, "dotfiles")]));
            });

            let client = create_test_client(&server);
            let repos = client.list_repositories("alice").await.unwrap();
            assert_eq!(repos.len(), 1);
            assert_eq!(repos[0].name, "dotfiles");
        }

        #[tokio::test]
        async fn test_validate_repository_name() {
            let server = MockServer::start();
            mock_group_projects(&server);

            let client = create_test_client(&server);
            assert!(client.validate_repository_name("acme", "new-one").await.is_ok());
            assert!(matches!(
                client.validate_repository_name("acme", "widgets").await,
                Err(Error::AlreadyExists(_))
            ));
        }

        #[tokio::test]
        async fn test_create_and_refresh_merge_request() {
            let server = MockServer::start();
            mock_group_projects(&server);
            server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v4/projects/123/merge_requests")
                    .body_includes("\"source_branch\":\"feature\"");
                then.status(201).json_body(serde_json::json!({
                    "id": 1000,
                    "iid": 50,
                    "title": "Feature",
                    "state": "opened",
                    "source_branch": "feature",
                    "target_branch": "main",
                    "web_url": "https://gitlab.com/acme/widgets/-/merge_requests/50",
                    "sha": "abc"
                }));
            });
            server.mock(|when, then| {
                when.method(GET).path("/api/v4/projects/123/merge_requests/50");
                then.status(200).json_body(serde_json::json!({
                    "id": 1000,
                    "iid": 50,
                    "title": "Feature",
                    "state": "merged",
                    "source_branch": "feature",
                    "target_branch": "main",
                    "web_url": "https://gitlab.com/acme/widgets/-/merge_requests/50",
                    "sha": "abc",
                    "merge_commit_sha": "def",
                    "merged_at": "2024-05-01T10:00:00Z"
                }));
            });

            let client = create_test_client(&server);
            let mut pr = client
                .create_pull_request(&PullRequestArguments {
                    title: "Feature".to_string(),
                    head: "feature".to_string(),
                    base: "main".to_string(),
                    repository: Repository {
                        name: "widgets".to_string(),
                        organisation: "acme".to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(pr.number, Some(50));
            assert!(!pr.is_merged());

            client.update_pull_request_status(&mut pr).await.unwrap();
            assert!(pr.is_merged());
            assert_eq!(pr.merge_commit_sha.as_deref(), Some("def"));
            assert_eq!(pr.state.as_deref(), Some("merged"));
        }

        #[tokio::test]
        async fn test_last_commit_status_is_normalized() {
            let server = MockServer::start();
            mock_group_projects(&server);
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/projects/123/repository/commits/abc/statuses");
                then.status(200).json_body(serde_json::json!([
                    {"id": 1, "status": "canceled", "name": "build"},
                    {"id": 2, "status": "success", "name": "lint"}
                ]));
            });

            let client = create_test_client(&server);
            let pr = PullRequest {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                number: Some(50),
                last_commit_sha: "abc".to_string(),
                ..Default::default()
            };
            let state = client.pull_request_last_commit_status(&pr).await.unwrap();
            assert_eq!(state, "stopped");
        }

        #[tokio::test]
        async fn test_create_webhook_is_idempotent() {
            let server = MockServer::start();
            mock_group_projects(&server);
            server.mock(|when, then| {
                when.method(GET).path("/api/v4/projects/123/hooks");
                then.status(200).json_body(serde_json::json!([
                    {"id": 7, "url": "https://ci.example.com/hook/acme/widgets"}
                ]));
            });
            let create = server.mock(|when, then| {
                when.method(POST).path("/api/v4/projects/123/hooks");
                then.status(201)
                    .json_body(serde_json::json!({"id": 8, "url": "x"}));
            });

            let client = create_test_client(&server);
            let hook = WebhookArguments {
                owner: "acme".to_string(),
                repo: Some(Repository {
                    name: "widgets".to_string(),
                    ..Default::default()
                }),
                url: "https://ci.example.com/hook".to_string(),
                secret: "s3cret".to_string(),
                ..Default::default()
            };
            client.create_webhook(&hook).await.unwrap();
            create.assert_hits(0);
        }

        #[tokio::test]
        async fn test_search_issues_closed_since() {
            let server = MockServer::start();
            mock_group_projects(&server);
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/projects/123/issues")
                    .query_param("state", "closed");
                then.status(200).json_body(serde_json::json!([
                    {"id": 1, "iid": 1, "title": "old", "state": "closed",
                     "web_url": "https://gitlab.com/acme/widgets/-/issues/1",
                     "closed_at": "2023-06-01T00:00:00Z"},
                    {"id": 2, "iid": 2, "title": "new", "state": "closed",
                     "web_url": "https://gitlab.com/acme/widgets/-/issues/2",
                     "labels": ["bug"],
                     "closed_at": "2024-06-01T00:00:00Z"}
                ]));
            });

            let client = create_test_client(&server);
            let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let issues = client
                .search_issues_closed_since("acme", "widgets", since)
                .await
                .unwrap();
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].key, "2");
            assert_eq!(issues[0].labels[0].name, "bug");
        }

        #[tokio::test]
        async fn test_update_release_creates_when_missing() {
            let server = MockServer::start();
            mock_group_projects(&server);
            server.mock(|when, then| {
                when.method(GET).path("/api/v4/projects/123/releases/v1.0.0");
                then.status(404).body("{\"message\":\"404 Not Found\"}");
            });
            let create = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v4/projects/123/releases")
                    .body_includes("\"tag_name\":\"v1.0.0\"");
                then.status(201)
                    .json_body(serde_json::json!({"tag_name": "v1.0.0"}));
            });

            let client = create_test_client(&server);
            let release = Release {
                name: "One".to_string(),
                ..Default::default()
            };
            client
                .update_release("acme", "widgets", "v1.0.0", &release)
                .await
                .unwrap();
            create.assert();
        }

        #[tokio::test]
        async fn test_user_info_not_found() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v4/users")
                    .query_param("username", "ghost");
                then.status(200).json_body(serde_json::json!([]));
            });

            let client = create_test_client(&server);
            assert!(client.user_info("ghost").await.unwrap_err().is_not_found());
        }

        #[tokio::test]
        async fn test_unauthorized() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v4/groups");
                then.status(401).body("{\"message\":\"401 Unauthorized\"}");
            });

            let client = create_test_client(&server);
            let result = client.list_organisations().await;
            assert!(matches!(result.unwrap_err(), Error::Unauthorized(_)));
        }
    }
}
