//! Gitea API client implementation.

use async_trait::async_trait;
use gitforge_core::status::{self, StatusTable};
use gitforge_core::{
    find_webhook, normalize_state, Commit, Error, FileContent, GitProvider, Issue, Kind, Label,
    Organisation, OrganisationLister, PullRequest, PullRequestArguments, Release, ReleaseAsset,
    RepoStatus, Repository, Result, Retry, User, UserAuth, WebhookArguments,
};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::types::{
    CreateForkOption, CreateHookOption, CreateIssueCommentOption, CreateIssueOption,
    CreatePullRequestOption, CreateRepoOption, CreateStatusOption, EditHookOption, GiteaCommit,
    GiteaContent, GiteaHook, GiteaHookConfig, GiteaIssue, GiteaOrganisation, GiteaPullRequest,
    GiteaRelease, GiteaRepository, GiteaStatus, GiteaUser, MergePullRequestOption, ReleaseOption,
};

const DEFAULT_PAGE_SIZE: u32 = 50;

/// Events a Gitea webhook subscribes to.
const HOOK_EVENTS: [&str; 3] = ["create", "push", "pull_request"];

/// Gitea commit states.
pub const STATUS_TABLE: StatusTable = &[
    ("pending", status::PENDING),
    ("success", status::SUCCESS),
    ("error", status::ERROR),
    ("failure", status::FAILURE),
    ("warning", status::FAILURE),
];

/// Gitea API client.
pub struct GiteaProvider {
    base_url: String,
    auth: UserAuth,
    client: reqwest::Client,
    retry: Retry,
    page_size: u32,
}

impl GiteaProvider {
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
            .header("Authorization", format!("token {}", self.auth.token()))
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/v1{}", self.base_url, endpoint)
    }

    fn repo_url(&self, owner: &str, repo: &str, endpoint: &str) -> String {
        self.api_url(&format!("/repos/{}/{}{}", owner, repo, endpoint))
    }

    fn owner<'a>(&'a self, org: &'a str) -> &'a str {
        if org.is_empty() {
            &self.auth.username
        } else {
            org
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        debug!(url = url, method = %method, "Gitea request");
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
                "Gitea API error response"
            );
            return Err(Error::from_status(status_code, message));
        }
        Ok(response)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(reqwest::Method::GET, url, None).await?;
        parse(response).await
    }

    /// GET every page of a list endpoint.
    async fn get_all<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();
        for page in 1.. {
            let page_url = format!("{}{}limit={}&page={}", url, separator, self.page_size, page);
            let items: Vec<T> = self.get(&page_url).await?;
            let count = items.len();
            all.extend(items);
            if count < self.page_size as usize {
                break;
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

    async fn fetch_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        let gt_pr: GiteaPullRequest = self
            .get(&self.repo_url(owner, repo, &format!("/pulls/{}", number)))
            .await?;
        Ok(map_pull_request(owner, repo, &gt_pr))
    }

    async fn list_issues(&self, org: &str, name: &str, query: &str) -> Result<Vec<Issue>> {
        let mut url = self.repo_url(org, name, "/issues?state=all&type=issues");
        if !query.is_empty() {
            url.push_str(&format!("&q={}", encode(query)));
        }
        let issues: Vec<GiteaIssue> = match self.get_all(&url).await {
            Ok(issues) => issues,
            Err(Error::NotFound(_)) => {
                debug!(org = org, name = name, "Issues are not enabled for repository");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Ok(issues
            .iter()
            .map(|i| self.map_issue(org, name, i))
            .collect())
    }

    fn map_issue(&self, org: &str, name: &str, gt_issue: &GiteaIssue) -> Issue {
        let url = if gt_issue.html_url.is_empty() {
            self.issue_url(org, name, gt_issue.number, false)
        } else {
            gt_issue.html_url.clone()
        };
        Issue {
            url,
            owner: org.to_string(),
            repo: name.to_string(),
            number: Some(gt_issue.number),
            key: gt_issue.number.to_string(),
            title: gt_issue.title.clone(),
            body: gt_issue.body.clone(),
            state: Some(gt_issue.state.clone()),
            labels: gt_issue
                .labels
                .iter()
                .map(|l| Label {
                    url: l.url.clone(),
                    name: l.name.clone(),
                    color: l.color.clone(),
                })
                .collect(),
            created_at: gt_issue.created_at,
            updated_at: gt_issue.updated_at,
            closed_at: gt_issue.closed_at,
            is_pull_request: gt_issue.pull_request.is_some(),
            user: gt_issue.user.as_ref().map(map_user),
            closed_by: None,
            assignees: gt_issue
                .assignees
                .iter()
                .flatten()
                .map(map_user)
                .collect(),
        }
    }
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
}

// =============================================================================
// Mapping functions: Gitea types -> canonical types
// =============================================================================

fn map_user(gt_user: &GiteaUser) -> User {
    User {
        login: gt_user.login.clone(),
        name: gt_user.full_name.clone(),
        email: gt_user.email.clone(),
        avatar_url: gt_user.avatar_url.clone(),
        ..Default::default()
    }
}

fn map_repository(gt_repo: &GiteaRepository) -> Repository {
    let (scheme, host) = url::Url::parse(&gt_repo.html_url)
        .map(|u| (u.scheme().to_string(), u.host_str().unwrap_or_default().to_string()))
        .unwrap_or_default();
    Repository {
        name: gt_repo.name.clone(),
        organisation: gt_repo
            .owner
            .as_ref()
            .map(|o| o.login.clone())
            .unwrap_or_default(),
        clone_url: gt_repo.clone_url.clone(),
        ssh_url: gt_repo.ssh_url.clone(),
        html_url: gt_repo.html_url.clone(),
        fork: gt_repo.fork,
        allow_merge_commit: true,
        stars: gt_repo.stars_count,
        host,
        scheme,
        ..Default::default()
    }
}

fn map_pull_request(owner: &str, repo: &str, gt_pr: &GiteaPullRequest) -> PullRequest {
    PullRequest {
        url: gt_pr.html_url.clone(),
        author: gt_pr.user.as_ref().map(map_user),
        owner: owner.to_string(),
        repo: repo.to_string(),
        number: Some(gt_pr.number),
        mergeable: Some(gt_pr.mergeable),
        merged: Some(gt_pr.merged),
        head_ref: gt_pr.head.as_ref().map(|h| h.ref_name.clone()),
        state: Some(gt_pr.state.clone()),
        diff_url: gt_pr.diff_url.clone(),
        merge_commit_sha: gt_pr.merge_commit_sha.clone(),
        closed_at: gt_pr.closed_at,
        merged_at: gt_pr.merged_at,
        last_commit_sha: gt_pr
            .head
            .as_ref()
            .map(|h| h.sha.clone())
            .unwrap_or_default(),
        title: gt_pr.title.clone(),
        body: gt_pr.body.clone(),
        ..Default::default()
    }
}

fn map_commit(gt_commit: &GiteaCommit) -> Commit {
    Commit {
        sha: gt_commit.sha.clone(),
        message: gt_commit
            .commit
            .as_ref()
            .map(|c| c.message.clone())
            .unwrap_or_default(),
        author: gt_commit.author.as_ref().map(map_user),
        committer: gt_commit.committer.as_ref().map(map_user),
        url: gt_commit.html_url.clone(),
        branch: String::new(),
    }
}

fn map_status(gt_status: &GiteaStatus) -> RepoStatus {
    RepoStatus {
        id: gt_status.id.to_string(),
        context: gt_status.context.clone(),
        url: gt_status.url.clone(),
        state: normalize_state(STATUS_TABLE, &gt_status.state),
        target_url: gt_status.target_url.clone(),
        description: gt_status.description.clone(),
    }
}

fn vendor_state(canonical: &str) -> &'static str {
    match canonical {
        status::SUCCESS => "success",
        status::ERROR | status::STOPPED => "error",
        status::FAILURE => "failure",
        _ => "pending",
    }
}

fn map_release(gt_release: &GiteaRelease) -> Release {
    Release {
        name: gt_release.name.clone(),
        tag_name: gt_release.tag_name.clone(),
        body: gt_release.body.clone(),
        url: gt_release.url.clone(),
        html_url: if gt_release.html_url.is_empty() {
            gt_release.url.clone()
        } else {
            gt_release.html_url.clone()
        },
        download_count: gt_release.assets.iter().map(|a| a.download_count).sum(),
        assets: Some(
            gt_release
                .assets
                .iter()
                .map(|a| ReleaseAsset {
                    browser_download_url: a.browser_download_url.clone(),
                    name: a.name.clone(),
                    content_type: String::new(),
                })
                .collect(),
        ),
    }
}

fn map_hook(owner: &str, repo: &str, gt_hook: &GiteaHook) -> WebhookArguments {
    WebhookArguments {
        id: gt_hook.id,
        owner: owner.to_string(),
        repo: Some(Repository {
            name: repo.to_string(),
            organisation: owner.to_string(),
            ..Default::default()
        }),
        url: gt_hook.config.url.clone(),
        secret: String::new(),
    }
}

fn hook_config(data: &WebhookArguments) -> GiteaHookConfig {
    GiteaHookConfig {
        url: data.url.clone(),
        content_type: "json".to_string(),
        secret: (!data.secret.is_empty()).then(|| data.secret.clone()),
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
impl OrganisationLister for GiteaProvider {
    async fn list_organisations(&self) -> Result<Vec<Organisation>> {
        let orgs: Vec<GiteaOrganisation> = self.get_all(&self.api_url("/user/orgs")).await?;
        Ok(orgs
            .into_iter()
            .filter(|o| !o.username.is_empty())
            .map(|o| Organisation::new(o.username))
            .collect())
    }
}

#[async_trait]
impl GitProvider for GiteaProvider {
    fn kind(&self) -> Kind {
        Kind::Gitea
    }

    fn label(&self) -> &str {
        "Gitea"
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
        format!("{}/{}/{}/archive/{}.zip", self.base_url, org, name, branch)
    }

    fn webhook_path(&self, _git_url: &str, _secret: &str) -> String {
        "/gitea-webhook/post".to_string()
    }

    fn access_token_url(&self) -> String {
        format!("{}/user/settings/applications", self.base_url)
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let url = if org.is_empty() {
            self.api_url("/user/repos")
        } else {
            self.api_url(&format!("/orgs/{}/repos", org))
        };
        let repos: Vec<GiteaRepository> = self.get_all(&url).await?;
        Ok(repos.iter().map(map_repository).collect())
    }

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository> {
        let gt_repo: GiteaRepository = self.get(&self.repo_url(self.owner(org), name, "")).await?;
        Ok(map_repository(&gt_repo))
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<Repository> {
        let url = if org.is_empty() || org == self.auth.username {
            self.api_url("/user/repos")
        } else {
            self.api_url(&format!("/orgs/{}/repos", org))
        };
        let request = CreateRepoOption {
            name: name.to_string(),
            private,
        };
        let gt_repo: GiteaRepository = self.write(reqwest::Method::POST, &url, &request).await?;
        info!(org = org, name = name, "Created Gitea repository");
        Ok(map_repository(&gt_repo))
    }

    async fn delete_repository(&self, org: &str, name: &str) -> Result<()> {
        self.send(
            reqwest::Method::DELETE,
            &self.repo_url(self.owner(org), name, ""),
            None,
        )
        .await?;
        Ok(())
    }

    async fn fork_repository(
        &self,
        original_org: &str,
        name: &str,
        destination_org: &str,
    ) -> Result<Repository> {
        let request = CreateForkOption {
            organization: (!destination_org.is_empty()).then(|| destination_org.to_string()),
        };
        let url = self.repo_url(original_org, name, "/forks");
        match self
            .write::<GiteaRepository, _>(reqwest::Method::POST, &url, &request)
            .await
        {
            Ok(gt_repo) => Ok(map_repository(&gt_repo)),
            Err(e) if e.to_string().contains("try again later") => {
                let owner = self.owner(destination_org);
                warn!(owner = owner, name = name, "Waiting for the fork to appear");
                self.retry
                    .until_ok("fork", |_| self.get_repository(owner, name))
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn rename_repository(&self, _org: &str, _name: &str, _new_name: &str) -> Result<Repository> {
        Err(Error::not_implemented("gitea", "rename_repository"))
    }

    async fn get_content(
        &self,
        org: &str,
        name: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent> {
        let mut url = self.repo_url(
            self.owner(org),
            name,
            &format!("/contents/{}", path.trim_start_matches('/')),
        );
        if !git_ref.is_empty() {
            url.push_str(&format!("?ref={}", encode(git_ref)));
        }
        let content: GiteaContent = self.get(&url).await?;
        Ok(FileContent {
            kind: content.kind,
            encoding: content.encoding.unwrap_or_default(),
            size: content.size,
            name: content.name,
            path: content.path,
            content: content.content.unwrap_or_default(),
            sha: content.sha,
            url: content.url,
            git_url: content.git_url.unwrap_or_default(),
            html_url: content.html_url.unwrap_or_default(),
            download_url: content.download_url.unwrap_or_default(),
        })
    }

    async fn create_pull_request(&self, args: &PullRequestArguments) -> Result<PullRequest> {
        let owner = self.owner(&args.repository.organisation);
        let repo = &args.repository.name;
        let request = CreatePullRequestOption {
            title: args.title.clone(),
            body: args.body.clone(),
            head: args.head.clone(),
            base: args.base.clone(),
        };
        let gt_pr: GiteaPullRequest = self
            .write(reqwest::Method::POST, &self.repo_url(owner, repo, "/pulls"), &request)
            .await?;
        Ok(map_pull_request(owner, repo, &gt_pr))
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
        let mut pr = self.fetch_pull_request(owner, &repo.name, number).await?;
        if let Some(login) = pr.author.as_ref().map(|a| a.login.clone()) {
            if let Ok(user) = self.user_info(&login).await {
                if !user.email.is_empty() {
                    pr.author = Some(user);
                }
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
        let url = self.repo_url(owner, &repo.name, &format!("/pulls/{}/commits", number));
        let commits: Vec<GiteaCommit> = self.get_all(&url).await?;
        Ok(commits.iter().map(map_commit).collect())
    }

    async fn pull_request_last_commit_status(&self, pr: &PullRequest) -> Result<String> {
        if pr.last_commit_sha.is_empty() {
            return Err(Error::InvalidData(format!(
                "Pull request {} has no head commit",
                pr.number_string()
            )));
        }
        let statuses = self
            .list_commit_statuses(&pr.owner, &pr.repo, &pr.last_commit_sha)
            .await?;
        statuses
            .into_iter()
            .map(|s| s.state)
            .find(|state| !state.is_empty())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Could not find a status for repository {}/{} with ref {}",
                    pr.owner, pr.repo, pr.last_commit_sha
                ))
            })
    }

    async fn merge_pull_request(&self, pr: &PullRequest, message: &str) -> Result<()> {
        let number = pr_number(pr)?;
        let request = MergePullRequestOption {
            merge_style: "merge".to_string(),
            message: message.to_string(),
        };
        let body = serde_json::to_value(&request)?;
        self.send(
            reqwest::Method::POST,
            &self.repo_url(&pr.owner, &pr.repo, &format!("/pulls/{}/merge", number)),
            Some(&body),
        )
        .await?;
        Ok(())
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
        let statuses: Vec<GiteaStatus> = self.get_all(&url).await?;
        Ok(statuses.iter().map(map_status).collect())
    }

    async fn update_commit_status(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        status: &RepoStatus,
    ) -> Result<RepoStatus> {
        let request = CreateStatusOption {
            state: vendor_state(&status.state).to_string(),
            context: status.context.clone(),
            target_url: status.target_url.clone(),
            description: status.description.clone(),
        };
        let gt_status: GiteaStatus = self
            .write(
                reqwest::Method::POST,
                &self.repo_url(org, repo, &format!("/statuses/{}", sha)),
                &request,
            )
            .await?;
        Ok(map_status(&gt_status))
    }

    async fn search_issues(&self, org: &str, name: &str, query: &str) -> Result<Vec<Issue>> {
        self.list_issues(org, name, query).await
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue> {
        let gt_issue: GiteaIssue = self
            .get(&self.repo_url(org, name, &format!("/issues/{}", number)))
            .await?;
        Ok(self.map_issue(org, name, &gt_issue))
    }

    async fn create_issue(&self, owner: &str, repo: &str, issue: &Issue) -> Result<Issue> {
        let request = CreateIssueOption {
            title: issue.title.clone(),
            body: issue.body.clone(),
        };
        let gt_issue: GiteaIssue = self
            .write(reqwest::Method::POST, &self.repo_url(owner, repo, "/issues"), &request)
            .await?;
        Ok(self.map_issue(owner, repo, &gt_issue))
    }

    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
    ) -> Result<()> {
        let request = CreateIssueCommentOption {
            body: comment.to_string(),
        };
        let _: serde_json::Value = self
            .write(
                reqwest::Method::POST,
                &self.repo_url(owner, repo, &format!("/issues/{}/comments", number)),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner(&data.owner);
        let repo = data.repo_name();
        if repo.is_empty() {
            return Err(Error::Config("Missing property Repo".to_string()));
        }
        if data.url.is_empty() {
            return Err(Error::Config("Missing property URL".to_string()));
        }
        let hooks = self.list_webhooks(owner, repo).await?;
        if let Some(existing) = find_webhook(&hooks, &data.url) {
            warn!(
                url = data.url,
                id = existing.id,
                "Already has a webhook registered, skipping creation"
            );
            return Ok(());
        }

        info!(owner = owner, repo = repo, url = data.url, "Creating Gitea webhook");
        let request = CreateHookOption {
            kind: "gitea".to_string(),
            config: hook_config(data),
            events: HOOK_EVENTS.iter().map(|e| e.to_string()).collect(),
            active: true,
        };
        let _: GiteaHook = self
            .write(reqwest::Method::POST, &self.repo_url(owner, repo, "/hooks"), &request)
            .await?;
        Ok(())
    }

    async fn list_webhooks(&self, org: &str, repo: &str) -> Result<Vec<WebhookArguments>> {
        let hooks: Vec<GiteaHook> = self.get_all(&self.repo_url(org, repo, "/hooks")).await?;
        Ok(hooks.iter().map(|h| map_hook(org, repo, h)).collect())
    }

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()> {
        let owner = self.owner(&data.owner);
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
        let request = EditHookOption {
            config: hook_config(data),
            events: HOOK_EVENTS.iter().map(|e| e.to_string()).collect(),
            active: true,
        };
        let _: GiteaHook = self
            .write(
                reqwest::Method::PATCH,
                &self.repo_url(owner, repo, &format!("/hooks/{}", id)),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn list_releases(&self, org: &str, name: &str) -> Result<Vec<Release>> {
        let releases: Vec<GiteaRelease> = self
            .get_all(&self.repo_url(self.owner(org), name, "/releases"))
            .await?;
        Ok(releases.iter().map(map_release).collect())
    }

    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        release: &Release,
    ) -> Result<()> {
        let releases: Vec<GiteaRelease> =
            self.get_all(&self.repo_url(owner, repo, "/releases")).await?;
        match releases.iter().find(|r| r.tag_name == tag) {
            Some(existing) => {
                let mut merged = map_release(existing);
                merged.merge_missing_from(release);
                let request = ReleaseOption {
                    tag_name: tag.to_string(),
                    name: merged.name,
                    body: merged.body,
                    draft: false,
                    prerelease: false,
                };
                let _: GiteaRelease = self
                    .write(
                        reqwest::Method::PATCH,
                        &self.repo_url(owner, repo, &format!("/releases/{}", existing.id)),
                        &request,
                    )
                    .await?;
            }
            None => {
                let request = ReleaseOption {
                    tag_name: tag.to_string(),
                    name: release.name.clone(),
                    body: release.body.clone(),
                    draft: false,
                    prerelease: false,
                };
                let _: GiteaRelease = self
                    .write(
                        reqwest::Method::POST,
                        &self.repo_url(owner, repo, "/releases"),
                        &request,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn user_info(&self, username: &str) -> Result<User> {
        let gt_user: GiteaUser = self
            .get(&self.api_url(&format!("/users/{}", username)))
            .await?;
        Ok(User {
            url: format!("{}/{}", self.base_url, username),
            login: username.to_string(),
            ..map_user(&gt_user)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(normalize_state(STATUS_TABLE, "warning"), "failure");
        assert_eq!(normalize_state(STATUS_TABLE, "success"), "success");
        assert_eq!(normalize_state(STATUS_TABLE, "pending"), "pending");
        assert_eq!(normalize_state(STATUS_TABLE, "error"), "error");
        assert_eq!(normalize_state(STATUS_TABLE, "failure"), "failure");
    }

    #[test]
    fn test_issue_url_adds_scheme() {
        let client = GiteaProvider::new("gitea.example.com", UserAuth::new("alice", "t"));
        assert_eq!(
            client.issue_url("acme", "widgets", 3, false),
            "https://gitea.example.com/acme/widgets/issues/3"
        );
        assert_eq!(
            client.issue_url("acme", "widgets", 4, true),
            "https://gitea.example.com/acme/widgets/pull/4"
        );
    }

    #[test]
    fn test_urls() {
        let client = GiteaProvider::new("https://gitea.example.com", UserAuth::new("alice", "t"));
        assert_eq!(
            client.branch_archive_url("acme", "widgets", "main"),
            "https://gitea.example.com/acme/widgets/archive/main.zip"
        );
        assert_eq!(client.webhook_path("", ""), "/gitea-webhook/post");
        assert_eq!(
            client.access_token_url(),
            "https://gitea.example.com/user/settings/applications"
        );
        assert!(client.is_gitea());
    }

    #[test]
    fn test_map_release_sums_downloads() {
        let gt_release: GiteaRelease = serde_json::from_value(serde_json::json!({
            "id": 1,
            "tag_name": "v1",
            "name": "One",
            "url": "https://gitea.example.com/api/v1/repos/acme/widgets/releases/1",
            "assets": [
                {"name": "a.tgz", "download_count": 2},
                {"name": "b.tgz", "download_count": 5}
            ]
        }))
        .unwrap();
        let release = map_release(&gt_release);
        assert_eq!(release.download_count, 7);
        assert_eq!(release.html_url, release.url);
        assert_eq!(release.assets.map(|a| a.len()), Some(2));
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use gitforge_core::InstantSleeper;
        use httpmock::prelude::*;
        use std::sync::Arc;

        fn create_test_client(server: &MockServer) -> GiteaProvider {
            GiteaProvider::new(server.base_url(), UserAuth::new("alice", "gitea-token"))
        }

        fn repo_json(owner: &str, name: &str) -> serde_json::Value {
            serde_json::json!({
                "name": name,
                "full_name": format!("{}/{}", owner, name),
                "owner": {"login": owner},
                "html_url": format!("https://gitea.example.com/{}/{}", owner, name),
                "clone_url": format!("https://gitea.example.com/{}/{}.git", owner, name)
            })
        }

        #[tokio::test]
        async fn test_list_repositories_drains_pages() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v1/orgs/acme/repos")
                    .query_param("page", "1")
                    .header("Authorization", "token gitea-token");
                then.status(200).json_body(serde_json::json!([
                    repo_json("acme", "a"),
                    repo_json("acme", "b")
                ]));
            });
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v1/orgs/acme/repos")
                    .query_param("page", "2");
                then.status(200).json_body(serde_json::json!([]));
            });

            let client = create_test_client(&server).with_page_size(2);
            let repos = client.list_repositories("acme").await.unwrap();
            assert_eq!(repos.len(), 2);
            assert!(repos.iter().all(|r| r.allow_merge_commit));
        }

        #[tokio::test]
        async fn test_fork_polls_after_try_again_later() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/api/v1/repos/upstream/widgets/forks");
                then.status(409)
                    .body("{\"message\":\"fork in progress, try again later\"}");
            });
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/alice/widgets");
                then.status(200).json_body(repo_json("alice", "widgets"));
            });

            let sleeper = Arc::new(InstantSleeper::new());
            let client =
                create_test_client(&server).with_retry(Retry::read_back_with(sleeper.clone()));
            let repo = client
                .fork_repository("upstream", "widgets", "")
                .await
                .unwrap();
            assert_eq!(repo.organisation, "alice");
        }

        #[tokio::test]
        async fn test_fork_gives_up_after_retry_budget() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(POST).path("/api/v1/repos/upstream/widgets/forks");
                then.status(409).body("try again later");
            });
            let read = server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/alice/widgets");
                then.status(404).body("{}");
            });

            let sleeper = Arc::new(InstantSleeper::new());
            let client =
                create_test_client(&server).with_retry(Retry::read_back_with(sleeper.clone()));
            let err = client
                .fork_repository("upstream", "widgets", "")
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            read.assert_hits(30);
            assert_eq!(sleeper.calls().len(), 29);
        }

        #[tokio::test]
        async fn test_create_webhook_uses_gitea_hook_shape() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/acme/widgets/hooks");
                then.status(200).json_body(serde_json::json!([]));
            });
            let create = server.mock(|when, then| {
                when.method(POST)
                    .path("/api/v1/repos/acme/widgets/hooks")
                    .body_includes("\"type\":\"gitea\"")
                    .body_includes("\"content_type\":\"json\"")
                    .body_includes("\"secret\":\"s3cret\"")
                    .body_includes("\"pull_request\"");
                then.status(201)
                    .json_body(serde_json::json!({"id": 1, "config": {}}));
            });

            let client = create_test_client(&server);
            client
                .create_webhook(&WebhookArguments {
                    owner: "acme".to_string(),
                    repo: Some(Repository {
                        name: "widgets".to_string(),
                        ..Default::default()
                    }),
                    url: "https://ci.example.com/gitea-webhook/post".to_string(),
                    secret: "s3cret".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
            create.assert();
        }

        #[tokio::test]
        async fn test_update_release_edits_existing_tag() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/acme/widgets/releases");
                then.status(200).json_body(serde_json::json!([
                    {"id": 4, "tag_name": "v1.0.0", "name": "", "body": "kept"}
                ]));
            });
            let edit = server.mock(|when, then| {
                when.method(PATCH)
                    .path("/api/v1/repos/acme/widgets/releases/4")
                    .body_includes("\"name\":\"Filled\"")
                    .body_includes("\"body\":\"kept\"");
                then.status(200)
                    .json_body(serde_json::json!({"id": 4, "tag_name": "v1.0.0"}));
            });

            let client = create_test_client(&server);
            client
                .update_release(
                    "acme",
                    "widgets",
                    "v1.0.0",
                    &Release {
                        name: "Filled".to_string(),
                        body: "ignored".to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            edit.assert();
        }

        #[tokio::test]
        async fn test_search_issues_missing_tracker_is_empty() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/api/v1/repos/acme/widgets/issues");
                then.status(404).body("{}");
            });

            let client = create_test_client(&server);
            let issues = client.search_issues("acme", "widgets", "").await.unwrap();
            assert!(issues.is_empty());
        }

        #[tokio::test]
        async fn test_last_commit_status_warning_is_failure() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/api/v1/repos/acme/widgets/commits/abc/statuses");
                then.status(200)
                    .json_body(serde_json::json!([{"id": 1, "state": "warning"}]));
            });

            let client = create_test_client(&server);
            let pr = PullRequest {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                number: Some(1),
                last_commit_sha: "abc".to_string(),
                ..Default::default()
            };
            assert_eq!(
                client.pull_request_last_commit_status(&pr).await.unwrap(),
                "failure"
            );
        }

        #[tokio::test]
        async fn test_rename_is_not_implemented() {
            let server = MockServer::start();
            let client = create_test_client(&server);
            assert!(matches!(
                client.rename_repository("acme", "a", "b").await,
                Err(Error::NotImplemented { .. })
            ));
        }
    }
}
