//! Bitbucket Server API client implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitforge_core::status::{self, StatusTable};
use gitforge_core::{
    find_webhook, normalize_state, Commit, Error, FileContent, GitProvider, Issue, Kind,
    Organisation, OrganisationLister, PullRequest, PullRequestArguments, Release, RepoStatus,
    Repository, Result, Retry, User, UserAuth, WebhookArguments,
};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::types::{
    Activity, BitbucketServerCommit, BitbucketServerHook, BitbucketServerPullRequest,
    BitbucketServerRepository, BitbucketServerUser, BuildStatus, CommentRequest, CommitPerson,
    CreatePullRequestRef, CreatePullRequestRequest, CreateRepositoryRequest, ForkRequest,
    HookConfiguration, HookRequest, MergeRequest, Paged, ProjectRef, RenameRepositoryRequest,
    RepositoryRef,
};

const DEFAULT_PAGE_SIZE: u32 = 25;

const HOOK_NAME: &str = "gitforge webhook";

/// Repository and pull request events a webhook subscribes to.
const HOOK_EVENTS: [&str; 16] = [
    "repo:refs_changed",
    "repo:modified",
    "repo:forked",
    "repo:comment:added",
    "repo:comment:edited",
    "repo:comment:deleted",
    "pr:opened",
    "pr:reviewer:approved",
    "pr:reviewer:unapproved",
    "pr:reviewer:needs_work",
    "pr:merged",
    "pr:declined",
    "pr:deleted",
    "pr:comment:added",
    "pr:comment:edited",
    "pr:comment:deleted",
];

/// Bitbucket Server build states.
pub const STATUS_TABLE: StatusTable = &[
    ("SUCCESSFUL", status::SUCCESS),
    ("FAILED", status::FAILURE),
    ("INPROGRESS", status::IN_PROGRESS),
    ("STOPPED", status::STOPPED),
];

/// Bitbucket Server API client.
pub struct BitbucketServerProvider {
    base_url: String,
    auth: UserAuth,
    client: reqwest::Client,
    retry: Retry,
    page_size: u32,
}

impl BitbucketServerProvider {
    pub fn new(base_url: impl Into<String>, auth: UserAuth) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            client: reqwest::Client::new(),
            retry: Retry::read_back(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.auth.token()))
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/rest/api/1.0{}", self.base_url, endpoint)
    }

    fn repo_url(&self, project: &str, repo: &str, endpoint: &str) -> String {
        self.api_url(&format!("/projects/{}/repos/{}{}", project, repo, endpoint))
    }

    fn build_status_url(&self, sha: &str) -> String {
        format!("{}/rest/build-status/1.0/commits/{}", self.base_url, sha)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        debug!(url = url, method = %method, "Bitbucket Server request");
        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(
                status = status_code,
                message = message,
                "Bitbucket Server API error response"
            );
            return Err(Error::from_status(status_code, message));
        }
        Ok(response)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(reqwest::Method::GET, url, None).await?;
        parse(response).await
    }

    /// GET every page of a paged endpoint.
    async fn get_all<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();
        let mut start = 0;
        loop {
            let page_url = format!("{}{}start={}&limit={}", url, separator, start, self.page_size);
            let page: Paged<T> = self.get(&page_url).await?;
            all.extend(page.values);
            match page.next_page_start {
                Some(next) if !page.is_last_page => start = next,
                _ => break,
            }
        }
        Ok(all)
    }

    async fn write<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body)?;
        let response = self.send(method, url, Some(&body)).await?;
        parse(response).await
    }

    async fn fetch_pull_request(
        &self,
        project: &str,
        repo: &str,
        number: u64,
    ) -> Result<BitbucketServerPullRequest> {
        self.get(&self.repo_url(project, repo, &format!("/pull-requests/{}", number)))
            .await
    }

    async fn fetch_pull_request_commits(
        &self,
        project: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<BitbucketServerCommit>> {
        self.get_all(&self.repo_url(project, repo, &format!("/pull-requests/{}/commits", number)))
            .await
    }

    /// The commit that merged the pull request, from its activity stream.
    async fn merge_commit_sha(&self, project: &str, repo: &str, number: u64) -> Result<Option<String>> {
        let activities: Vec<Activity> = self
            .get_all(&self.repo_url(project, repo, &format!("/pull-requests/{}/activities", number)))
            .await?;
        let merged = activities
            .iter()
            .find(|a| a.action == "MERGED" && a.commit.is_some())
            .or_else(|| activities.iter().find(|a| a.commit.is_some()));
        Ok(merged.and_then(|a| a.commit.as_ref()).map(|c| c.id.clone()))
    }

    /// Fetch one repository, for a project or (with an empty project) a personal one.
    async fn fetch_repository(&self, project: &str, name: &str) -> Result<Repository> {
        let url = if project.is_empty() {
            self.api_url(&format!("/users/{}/repos/{}", self.auth.username, name))
        } else {
            self.repo_url(project, name, "")
        };
        let repo: BitbucketServerRepository = self.get(&url).await?;
        Ok(map_repository(&repo))
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
}

/// Extract `(project key, repository slug)` from a clone URL or a browser URL.
///
/// Clone URLs end with `/<project>/<repo>.git`; browser URLs contain
/// `/projects/<project>/repos/<repo>`.
pub fn parse_repository_url(url: &str) -> Option<(String, String)> {
    if let Some(trimmed) = url.strip_suffix(".git") {
        let (rest, repo) = trimmed.rsplit_once('/')?;
        let (_, project) = rest.rsplit_once('/')?;
        return Some((project.to_string(), repo.to_string()));
    }
    let (_, after_projects) = url.split_once("projects/")?;
    let (project, rest) = after_projects.split_once('/')?;
    let (_, after_repos) = rest.split_once("repos/")?;
    let repo = after_repos.split('/').next().unwrap_or(after_repos);
    Some((project.to_string(), repo.to_string()))
}

/// Project key and repository of a pull request, falling back to its URL.
fn pull_request_location(pr: &PullRequest) -> Result<(String, String)> {
    if !pr.owner.is_empty() && !pr.repo.is_empty() {
        return Ok((pr.owner.clone(), pr.repo.clone()));
    }
    parse_repository_url(&pr.url).ok_or_else(|| {
        Error::InvalidData(format!("Cannot determine repository of pull request {}", pr.url))
    })
}

// =============================================================================
// Mapping functions: Bitbucket Server types -> canonical types
// =============================================================================

fn map_user(bb_user: &BitbucketServerUser) -> User {
    User {
        url: bb_user.links.self_href(),
        login: if bb_user.slug.is_empty() {
            bb_user.name.clone()
        } else {
            bb_user.slug.clone()
        },
        name: bb_user.display_name.clone(),
        email: bb_user.email_address.clone(),
        avatar_url: String::new(),
    }
}

fn map_person(person: &CommitPerson) -> User {
    User {
        login: person.name.clone(),
        name: person.display_name.clone(),
        email: person.email_address.clone(),
        ..Default::default()
    }
}

fn map_repository(bb_repo: &BitbucketServerRepository) -> Repository {
    let ssh_url = bb_repo
        .links
        .clone
        .iter()
        .find(|l| l.name == "ssh")
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let clone_url = bb_repo
        .links
        .clone
        .iter()
        .find(|l| l.name == "http" || l.name == "https")
        .map(|l| {
            if l.href.ends_with(".git") {
                l.href.clone()
            } else {
                format!("{}.git", l.href)
            }
        })
        .unwrap_or_else(|| ssh_url.clone());
    let html_url = bb_repo.links.self_href();
    let (scheme, host) = url::Url::parse(&html_url)
        .map(|u| (u.scheme().to_string(), u.host_str().unwrap_or_default().to_string()))
        .unwrap_or_default();
    let project = bb_repo
        .project
        .as_ref()
        .map(|p| p.key.clone())
        .unwrap_or_default();
    Repository {
        name: if bb_repo.slug.is_empty() {
            bb_repo.name.clone()
        } else {
            bb_repo.slug.clone()
        },
        organisation: project.clone(),
        project,
        clone_url,
        ssh_url,
        url: html_url.clone(),
        html_url,
        fork: bb_repo.origin.is_some(),
        allow_merge_commit: true,
        host,
        scheme,
        ..Default::default()
    }
}

fn map_pull_request(bb_pr: &BitbucketServerPullRequest) -> PullRequest {
    let target = bb_pr.to_ref.as_ref().and_then(|r| r.repository.as_ref());
    let url = bb_pr.links.self_href();
    let merged = bb_pr.state == "MERGED";
    PullRequest {
        author: bb_pr.author.as_ref().map(|a| map_user(&a.user)),
        owner: target
            .and_then(|r| r.project.as_ref())
            .map(|p| p.key.clone())
            .unwrap_or_default(),
        repo: target.map(|r| r.slug.clone()).unwrap_or_default(),
        number: Some(bb_pr.id),
        merged: Some(merged),
        head_ref: bb_pr.from_ref.as_ref().map(|r| r.display_id.clone()),
        state: Some(bb_pr.state.clone()),
        diff_url: (!url.is_empty()).then(|| format!("{}/diff", url)),
        closed_at: bb_pr.closed_date.and_then(DateTime::<Utc>::from_timestamp_millis),
        merged_at: if merged {
            bb_pr.closed_date.and_then(DateTime::<Utc>::from_timestamp_millis)
        } else {
            None
        },
        last_commit_sha: bb_pr
            .from_ref
            .as_ref()
            .map(|r| r.latest_commit.clone())
            .unwrap_or_default(),
        title: bb_pr.title.clone(),
        body: bb_pr.description.clone(),
        url,
        ..Default::default()
    }
}

fn map_commit(bb_commit: &BitbucketServerCommit, repo: &Repository) -> Commit {
    Commit {
        sha: bb_commit.id.clone(),
        message: bb_commit.message.clone(),
        author: bb_commit.author.as_ref().map(map_person),
        committer: bb_commit.committer.as_ref().map(map_person),
        url: format!("{}/commits/{}", repo.html_url, bb_commit.id),
        branch: String::new(),
    }
}

fn map_status(build: &BuildStatus) -> RepoStatus {
    RepoStatus {
        id: build.key.clone(),
        context: if build.name.is_empty() {
            build.key.clone()
        } else {
            build.name.clone()
        },
        url: build.url.clone(),
        state: normalize_state(STATUS_TABLE, &build.state),
        target_url: build.url.clone(),
        description: build.description.clone(),
    }
}

fn vendor_state(canonical: &str) -> &'static str {
    match canonical {
        status::SUCCESS => "SUCCESSFUL",
        status::FAILURE | status::ERROR | status::STOPPED => "FAILED",
        _ => "INPROGRESS",
    }
}

fn map_hook(owner: &str, repo: &str, hook: &BitbucketServerHook) -> WebhookArguments {
    WebhookArguments {
        id: hook.id,
        owner: owner.to_string(),
        repo: Some(Repository {
            name: repo.to_string(),
            organisation: owner.to_string(),
            project: owner.to_string(),
            ..Default::default()
        }),
        url: hook.url.clone(),
        secret: String::new(),
    }
}

fn hook_request(data: &WebhookArguments) -> HookRequest {
    HookRequest {
        name: HOOK_NAME.to_string(),
        url: data.url.clone(),
        active: true,
        events: HOOK_EVENTS.iter().map(|e| e.to_string()).collect(),
        configuration: (!data.secret.is_empty()).then(|| HookConfiguration {
            secret: data.secret.clone(),
        }),
    }
}

/// Project key a webhook targets: the repository's project, else its owner.
fn hook_project(data: &WebhookArguments) -> String {
    data.repo
        .as_ref()
        .map(|r| r.project.clone())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| data.owner.clone())
}

fn pr_number(pr: &PullRequest) -> Result<u64> {
    pr.number
        .ok_or_else(|| Error::InvalidData(format!("Pull request {} has no number", pr.url)))
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl OrganisationLister for BitbucketServerProvider {
    async fn list_organisations(&self) -> Result<Vec<Organisation>> {
        let projects: Vec<ProjectRef> = self.get_all(&self.api_url("/projects")).await?;
        Ok(projects
            .into_iter()
            .map(|p| Organisation::new(p.key))
            .collect())
    }
}

#[async_trait]
impl GitProvider for BitbucketServerProvider {
    fn kind(&self) -> Kind {
        Kind::BitbucketServer
    }

    fn label(&self) -> &str {
        "Bitbucket Server"
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
        let prefix = if self.base_url.contains("://") {
            self.base_url.clone()
        } else {
            format!("https://{}", self.base_url)
        };
        let path = if is_pull { "pull" } else { "issues" };
        format!("{}/{}/{}/{}/{}", prefix, org, name, path, number)
    }

    fn branch_archive_url(&self, org: &str, name: &str, branch: &str) -> String {
        format!(
            "{}/rest/api/1.0/projects/{}/repos/{}/archive?format=zip&at={}",
            self.base_url, org, name, branch
        )
    }

    fn webhook_path(&self, _git_url: &str, _secret: &str) -> String {
        "/bitbucket-scmsource-hook/notify".to_string()
    }

    fn access_token_url(&self) -> String {
        format!("{}/plugins/servlet/access-tokens/manage", self.base_url)
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let repos: Vec<BitbucketServerRepository> = self
            .get_all(&self.api_url(&format!("/projects/{}/repos", org)))
            .await?;
        Ok(repos.iter().map(map_repository).collect())
    }

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository> {
        self.fetch_repository(org, name).await
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<Repository> {
        let request = CreateRepositoryRequest {
            name: name.to_string(),
            public: !private,
        };
        let repo: BitbucketServerRepository = self
            .write(
                reqwest::Method::POST,
                &self.api_url(&format!("/projects/{}/repos", org)),
                &request,
            )
            .await?;
        info!(project = org, name = name, "Created Bitbucket Server repository");
        Ok(map_repository(&repo))
    }

    async fn delete_repository(&self, org: &str, name: &str) -> Result<()> {
        self.send(reqwest::Method::DELETE, &self.repo_url(org, name, ""), None)
            .await?;
        Ok(())
    }

    async fn fork_repository(
        &self,
        original_org: &str,
        name: &str,
        destination_org: &str,
    ) -> Result<Repository> {
        let request = ForkRequest {
            project: (!destination_org.is_empty()).then(|| ProjectRef {
                key: destination_org.to_string(),
            }),
        };
        let created: BitbucketServerRepository = self
            .write(
                reqwest::Method::POST,
                &self.repo_url(original_org, name, ""),
                &request,
            )
            .await?;

        match self
            .retry
            .until_ok("fork", |_| self.fetch_repository(destination_org, name))
            .await
        {
            Ok(repo) => Ok(repo),
            Err(e) => {
                warn!(name = name, error = %e, "Fork not readable yet, returning create result");
                Ok(map_repository(&created))
            }
        }
    }

    async fn rename_repository(&self, org: &str, name: &str, new_name: &str) -> Result<Repository> {
        let request = RenameRepositoryRequest {
            name: new_name.to_string(),
        };
        let repo: BitbucketServerRepository = self
            .write(reqwest::Method::PUT, &self.repo_url(org, name, ""), &request)
            .await?;
        Ok(map_repository(&repo))
    }

    async fn get_content(
        &self,
        org: &str,
        name: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent> {
        let path = path.trim_start_matches('/');
        let mut url = self.repo_url(org, name, &format!("/raw/{}", path));
        if !git_ref.is_empty() {
            url.push_str(&format!("?at={}", encode(git_ref)));
        }
        let response = self.send(reqwest::Method::GET, &url, None).await?;
        let content = response
            .text()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to read file content: {}", e)))?;
        Ok(FileContent {
            kind: "file".to_string(),
            size: content.len() as u64,
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            content,
            url,
            ..Default::default()
        })
    }

    async fn create_pull_request(&self, args: &PullRequestArguments) -> Result<PullRequest> {
        let project = if args.repository.project.is_empty() {
            args.repository.organisation.clone()
        } else {
            args.repository.project.clone()
        };
        let repo = &args.repository.name;
        let repository_ref = RepositoryRef {
            slug: repo.clone(),
            project: ProjectRef {
                key: project.clone(),
            },
        };
        let request = CreatePullRequestRequest {
            title: args.title.clone(),
            description: args.body.clone(),
            state: "OPEN".to_string(),
            open: true,
            closed: false,
            from_ref: CreatePullRequestRef {
                id: args.head.clone(),
                repository: repository_ref.clone(),
            },
            to_ref: CreatePullRequestRef {
                id: args.base.clone(),
                repository: repository_ref,
            },
        };
        let created: BitbucketServerPullRequest = self
            .write(
                reqwest::Method::POST,
                &self.repo_url(&project, repo, "/pull-requests"),
                &request,
            )
            .await?;

        let read_back = self
            .retry
            .until_ok("pull request", |_| {
                self.fetch_pull_request(&project, repo, created.id)
            })
            .await;
        let bb_pr = match read_back {
            Ok(bb_pr) => bb_pr,
            Err(e) => {
                warn!(number = created.id, error = %e, "Pull request not readable yet, returning create result");
                created
            }
        };
        let mut pr = map_pull_request(&bb_pr);
        if pr.owner.is_empty() {
            pr.owner = project;
            pr.repo = repo.clone();
        }
        Ok(pr)
    }

    async fn update_pull_request_status(&self, pr: &mut PullRequest) -> Result<()> {
        let number = pr_number(pr)?;
        let (project, repo) = pull_request_location(pr)?;
        let bb_pr = self.fetch_pull_request(&project, &repo, number).await?;
        let mut updated = map_pull_request(&bb_pr);
        if updated.owner.is_empty() {
            updated.owner = project.clone();
            updated.repo = repo.clone();
        }
        if updated.is_merged() {
            updated.merge_commit_sha = self.merge_commit_sha(&project, &repo, number).await?;
        }
        if updated.last_commit_sha.is_empty() {
            let commits = self.fetch_pull_request_commits(&project, &repo, number).await?;
            if let Some(first) = commits.first() {
                updated.last_commit_sha = first.id.clone();
            }
        }
        *pr = updated;
        Ok(())
    }

    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<PullRequest> {
        let project = if repo.project.is_empty() {
            owner
        } else {
            &repo.project
        };
        let bb_pr = self.fetch_pull_request(project, &repo.name, number).await?;
        let mut pr = map_pull_request(&bb_pr);
        if pr.owner.is_empty() {
            pr.owner = project.to_string();
            pr.repo = repo.name.clone();
        }
        Ok(pr)
    }

    async fn get_pull_request_commits(
        &self,
        owner: &str,
        repo: &Repository,
        number: u64,
    ) -> Result<Vec<Commit>> {
        let project = if repo.project.is_empty() {
            owner
        } else {
            &repo.project
        };
        let commits = self
            .fetch_pull_request_commits(project, &repo.name, number)
            .await?;
        Ok(commits.iter().map(|c| map_commit(c, repo)).collect())
    }

    async fn pull_request_last_commit_status(&self, pr: &PullRequest) -> Result<String> {
        let number = pr_number(pr)?;
        let (project, repo) = pull_request_location(pr)?;
        let commits = self.fetch_pull_request_commits(&project, &repo, number).await?;
        let Some(last_commit) = commits.first() else {
            return Err(Error::InvalidData(format!(
                "Pull request {} has no commits",
                number
            )));
        };

        let builds: Vec<BuildStatus> = self.get_all(&self.build_status_url(&last_commit.id)).await?;
        // Builds reported before the commit landed belong to an older push.
        Ok(builds
            .iter()
            .filter(|b| b.date_added >= last_commit.committer_timestamp)
            .max_by_key(|b| b.date_added)
            .map(|b| normalize_state(STATUS_TABLE, &b.state))
            .unwrap_or_else(|| status::SUCCESS.to_string()))
    }

    async fn merge_pull_request(&self, pr: &PullRequest, message: &str) -> Result<()> {
        let number = pr_number(pr)?;
        let (project, repo) = pull_request_location(pr)?;
        let current = self.fetch_pull_request(&project, &repo, number).await?;
        let request = MergeRequest {
            message: message.to_string(),
        };
        let url = self.repo_url(
            &project,
            &repo,
            &format!("/pull-requests/{}/merge?version={}", number, current.version),
        );
        let _: serde_json::Value = self.write(reqwest::Method::POST, &url, &request).await?;
        Ok(())
    }

    async fn add_pr_comment(&self, pr: &PullRequest, comment: &str) -> Result<()> {
        let number = pr_number(pr)?;
        let (project, repo) = pull_request_location(pr)?;
        let request = CommentRequest {
            text: comment.to_string(),
        };
        let _: serde_json::Value = self
            .write(
                reqwest::Method::POST,
                &self.repo_url(&project, &repo, &format!("/pull-requests/{}/comments", number)),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn list_commit_statuses(
        &self,
        _org: &str,
        _repo: &str,
        sha: &str,
    ) -> Result<Vec<RepoStatus>> {
        let builds: Vec<BuildStatus> = self.get_all(&self.build_status_url(sha)).await?;
        Ok(builds.iter().map(map_status).collect())
    }

    async fn update_commit_status(
        &self,
        _org: &str,
        _repo: &str,
        sha: &str,
        status: &RepoStatus,
    ) -> Result<RepoStatus> {
        let build = BuildStatus {
            state: vendor_state(&status.state).to_string(),
            key: if status.id.is_empty() {
                status.context.clone()
            } else {
                status.id.clone()
            },
            name: status.context.clone(),
            url: status.target_url.clone(),
            description: status.description.clone(),
            date_added: 0,
        };
        let body = serde_json::to_value(&build)?;
        // Answers 204 with no body.
        self.send(reqwest::Method::POST, &self.build_status_url(sha), Some(&body))
            .await?;
        Ok(map_status(&build))
    }

    async fn search_issues(&self, org: &str, name: &str, _query: &str) -> Result<Vec<Issue>> {
        warn!(org = org, name = name, "Searching issues on Bitbucket Server is not supported");
        Ok(Vec::new())
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue> {
        warn!(org = org, name = name, number = number, "Bitbucket Server has no issue tracker");
        Ok(Issue {
            owner: org.to_string(),
            repo: name.to_string(),
            number: Some(number),
            ..Default::default()
        })
    }

    async fn create_issue(&self, owner: &str, repo: &str, _issue: &Issue) -> Result<Issue> {
        warn!(owner = owner, repo = repo, "Creating issues on Bitbucket Server is not supported");
        Ok(Issue::default())
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        _comment: &str,
    ) -> Result<()> {
        warn!(
            owner = owner,
            repo = repo,
            number = number,
            "Bitbucket Server does not support issue comments"
        );
        Ok(())
    }

    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let project = hook_project(data);
        let repo = data.repo_name();
        if repo.is_empty() {
            return Err(Error::Config("Missing property Repo".to_string()));
        }
        if data.url.is_empty() {
            return Err(Error::Config("Missing property URL".to_string()));
        }
        let hooks = self.list_webhooks(&project, repo).await?;
        if let Some(existing) = find_webhook(&hooks, &data.url) {
            warn!(
                url = data.url,
                id = existing.id,
                "Already has a webhook registered, skipping creation"
            );
            return Ok(());
        }

        info!(project = %project, repo = repo, url = data.url, "Creating Bitbucket Server webhook");
        let _: BitbucketServerHook = self
            .write(
                reqwest::Method::POST,
                &self.repo_url(&project, repo, "/webhooks"),
                &hook_request(data),
            )
            .await?;
        Ok(())
    }

    async fn list_webhooks(&self, org: &str, repo: &str) -> Result<Vec<WebhookArguments>> {
        let hooks: Vec<BitbucketServerHook> =
            self.get_all(&self.repo_url(org, repo, "/webhooks")).await?;
        Ok(hooks.iter().map(|h| map_hook(org, repo, h)).collect())
    }

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let project = hook_project(data);
        let repo = data.repo_name();
        let id = if data.id != 0 {
            data.id
        } else {
            let hooks = self.list_webhooks(&project, repo).await?;
            match find_webhook(&hooks, &data.url) {
                Some(existing) => existing.id,
                None => return self.create_webhook(data).await,
            }
        };
        let _: BitbucketServerHook = self
            .write(
                reqwest::Method::PUT,
                &self.repo_url(&project, repo, &format!("/webhooks/{}", id)),
                &hook_request(data),
            )
            .await?;
        Ok(())
    }

    async fn list_releases(&self, org: &str, name: &str) -> Result<Vec<Release>> {
        warn!(org = org, name = name, "Bitbucket Server does not support releases");
        Ok(Vec::new())
    }

    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        _release: &Release,
    ) -> Result<()> {
        warn!(owner = owner, repo = repo, tag = tag, "Bitbucket Server does not support releases");
        Ok(())
    }

    async fn user_info(&self, username: &str) -> Result<User> {
        let bb_user: BitbucketServerUser = self
            .get(&self.api_url(&format!("/users/{}", username)))
            .await?;
        Ok(User {
            login: username.to_string(),
            ..map_user(&bb_user)
        })
    }
}
