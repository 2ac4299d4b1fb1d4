//! Gerrit REST client.
//!
//! Gerrit hosts projects, not pull requests. Repository reads and creation go
//! through the REST API; review-centric operations are reported as
//! unsupported and issue tracking is absent.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gitforge_core::{
    Commit, Error, FileContent, GitProvider, Issue, Kind, Organisation, OrganisationLister,
    PullRequest, PullRequestArguments, Release, RepoStatus, Repository, Result, User, UserAuth,
    WebhookArguments,
};
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::types::{GerritAccount, GerritProject, ProjectInput};

/// Prefix Gerrit puts in front of every JSON body.
const XSSI_PREFIX: &str = ")]}'";

const PROVIDER: &str = "gerrit";

/// Gerrit API client.
pub struct GerritProvider {
    base_url: String,
    auth: UserAuth,
    client: reqwest::Client,
}

impl GerritProvider {
    pub fn new(base_url: impl Into<String>, auth: UserAuth) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.auth.username, Some(self.auth.token()))
    }

    /// Authenticated REST endpoints live under `/a`.
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/a{}", self.base_url, endpoint)
    }

    fn project_url(&self, org: &str, name: &str) -> String {
        self.api_url(&format!("/projects/{}", encode(&project_name(org, name))))
    }

    async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String> {
        debug!(url = url, method = %method, "Gerrit request");
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
                "Gerrit API error response"
            );
            return Err(Error::from_status(status_code, message));
        }
        response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.send(reqwest::Method::GET, url, None).await?;
        parse(&body)
    }

    fn map_project(&self, project: &GerritProject) -> Repository {
        let name = if project.name.is_empty() {
            urlencoding::decode(&project.id)
                .map(|n| n.into_owned())
                .unwrap_or_else(|_| project.id.clone())
        } else {
            project.name.clone()
        };
        let (organisation, short_name) = match name.rsplit_once('/') {
            Some((org, short)) => (org.to_string(), short.to_string()),
            None => (String::new(), name.clone()),
        };
        let (scheme, host) = url::Url::parse(&self.base_url)
            .map(|u| (u.scheme().to_string(), u.host_str().unwrap_or_default().to_string()))
            .unwrap_or_default();
        Repository {
            name: short_name,
            organisation,
            clone_url: format!("{}/{}", self.base_url, name),
            ssh_url: format!("{}:{}", self.base_url, name),
            html_url: format!("{}/admin/repos/{}", self.base_url, name),
            host,
            scheme,
            ..Default::default()
        }
    }
}

/// Full Gerrit project name for an optional parent path.
fn project_name(org: &str, name: &str) -> String {
    if org.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", org, name)
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let json = body.strip_prefix(XSSI_PREFIX).unwrap_or(body);
    serde_json::from_str(json.trim_start())
        .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
}

fn no_issue_tracking() {
    warn!("Gerrit does not support issue tracking");
}

// =============================================================================
// Trait implementations
// =============================================================================

#[async_trait]
impl OrganisationLister for GerritProvider {
    async fn list_organisations(&self) -> Result<Vec<Organisation>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl GitProvider for GerritProvider {
    fn kind(&self) -> Kind {
        Kind::Gerrit
    }

    fn label(&self) -> &str {
        "Gerrit"
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

    fn has_issues(&self) -> bool {
        false
    }

    fn issue_url(&self, _org: &str, _name: &str, _number: u64, _is_pull: bool) -> String {
        no_issue_tracking();
        String::new()
    }

    fn branch_archive_url(&self, _org: &str, _name: &str, _branch: &str) -> String {
        String::new()
    }

    fn webhook_path(&self, _git_url: &str, _secret: &str) -> String {
        String::new()
    }

    fn access_token_url(&self) -> String {
        format!("{}/settings/#HTTPCredentials", self.base_url)
    }

    async fn list_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let mut url = self.api_url("/projects/?d");
        if !org.is_empty() {
            url.push_str(&format!("&p={}", encode(&format!("{}/", org))));
        }
        let projects: BTreeMap<String, GerritProject> = self.get(&url).await?;
        Ok(projects
            .into_iter()
            .map(|(name, project)| self.map_project(&GerritProject { name, ..project }))
            .collect())
    }

    async fn get_repository(&self, org: &str, name: &str) -> Result<Repository> {
        let project: GerritProject = self.get(&self.project_url(org, name)).await?;
        Ok(self.map_project(&project))
    }

    async fn create_repository(&self, org: &str, name: &str, private: bool) -> Result<Repository> {
        let input = ProjectInput {
            submit_type: "INHERIT".to_string(),
            description: "Created by gitforge".to_string(),
            permissions_only: private,
            create_empty_commit: true,
        };
        let body = serde_json::to_value(&input)?;
        let response = self
            .send(reqwest::Method::PUT, &self.project_url(org, name), Some(&body))
            .await?;
        let project: GerritProject = parse(&response)?;
        info!(org = org, name = name, "Created Gerrit project");
        Ok(self.map_project(&project))
    }

    async fn delete_repository(&self, _org: &str, _name: &str) -> Result<()> {
        Err(Error::not_implemented(PROVIDER, "delete_repository"))
    }

    async fn fork_repository(
        &self,
        _original_org: &str,
        _name: &str,
        _destination_org: &str,
    ) -> Result<Repository> {
        Err(Error::not_implemented(PROVIDER, "fork_repository"))
    }

    async fn rename_repository(&self, _org: &str, _name: &str, _new_name: &str) -> Result<Repository> {
        Err(Error::not_implemented(PROVIDER, "rename_repository"))
    }

    async fn get_content(
        &self,
        org: &str,
        name: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent> {
        let branch = if git_ref.is_empty() { "HEAD" } else { git_ref };
        let path = path.trim_start_matches('/');
        let url = format!(
            "{}/branches/{}/files/{}/content",
            self.project_url(org, name),
            encode(branch),
            encode(path)
        );
        // The content endpoint answers with bare base64, not JSON.
        let content = self.send(reqwest::Method::GET, &url, None).await?;
        Ok(FileContent {
            kind: "file".to_string(),
            encoding: "base64".to_string(),
            size: content.len() as u64,
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            content: content.trim().to_string(),
            url,
            ..Default::default()
        })
    }

    async fn create_pull_request(&self, _args: &PullRequestArguments) -> Result<PullRequest> {
        Err(Error::not_implemented(PROVIDER, "create_pull_request"))
    }

    async fn update_pull_request_status(&self, _pr: &mut PullRequest) -> Result<()> {
        Err(Error::not_implemented(PROVIDER, "update_pull_request_status"))
    }

    async fn get_pull_request(
        &self,
        _owner: &str,
        _repo: &Repository,
        _number: u64,
    ) -> Result<PullRequest> {
        Err(Error::not_implemented(PROVIDER, "get_pull_request"))
    }

    async fn get_pull_request_commits(
        &self,
        _owner: &str,
        _repo: &Repository,
        _number: u64,
    ) -> Result<Vec<Commit>> {
        Err(Error::not_implemented(PROVIDER, "get_pull_request_commits"))
    }

    async fn pull_request_last_commit_status(&self, _pr: &PullRequest) -> Result<String> {
        Err(Error::not_implemented(PROVIDER, "pull_request_last_commit_status"))
    }

    async fn merge_pull_request(&self, _pr: &PullRequest, _message: &str) -> Result<()> {
        Err(Error::not_implemented(PROVIDER, "merge_pull_request"))
    }

    async fn add_pr_comment(&self, _pr: &PullRequest, _comment: &str) -> Result<()> {
        Err(Error::not_implemented(PROVIDER, "add_pr_comment"))
    }

    async fn list_commit_statuses(
        &self,
        _org: &str,
        _repo: &str,
        _sha: &str,
    ) -> Result<Vec<RepoStatus>> {
        Ok(Vec::new())
    }

    async fn search_issues(&self, _org: &str, _name: &str, _query: &str) -> Result<Vec<Issue>> {
        no_issue_tracking();
        Ok(Vec::new())
    }

    async fn get_issue(&self, org: &str, name: &str, number: u64) -> Result<Issue> {
        no_issue_tracking();
        Ok(Issue {
            owner: org.to_string(),
            repo: name.to_string(),
            number: Some(number),
            ..Default::default()
        })
    }

    async fn create_issue(&self, _owner: &str, _repo: &str, _issue: &Issue) -> Result<Issue> {
        no_issue_tracking();
        Ok(Issue::default())
    }

    async fn create_issue_comment(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        _comment: &str,
    ) -> Result<()> {
        no_issue_tracking();
        Ok(())
    }

    async fn create_webhook(&self, data: &WebhookArguments) -> Result<()> {
        warn!(url = data.url, "Gerrit webhooks are configured server side, skipping");
        Ok(())
    }

    async fn list_webhooks(&self, _org: &str, _repo: &str) -> Result<Vec<WebhookArguments>> {
        Ok(Vec::new())
    }

    async fn update_webhook(&self, data: &WebhookArguments) -> Result<()> {
        warn!(url = data.url, "Gerrit webhooks are configured server side, skipping");
        Ok(())
    }

    async fn list_releases(&self, _org: &str, _name: &str) -> Result<Vec<Release>> {
        Ok(Vec::new())
    }

    async fn update_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        _release: &Release,
    ) -> Result<()> {
        warn!(owner = owner, repo = repo, tag = tag, "Gerrit does not support releases");
        Ok(())
    }

    async fn user_info(&self, username: &str) -> Result<User> {
        let account: GerritAccount = self
            .get(&self.api_url(&format!("/accounts/{}", encode(username))))
            .await?;
        Ok(User {
            url: format!("{}/q/owner:{}", self.base_url, username),
            login: if account.username.is_empty() {
                username.to_string()
            } else {
                account.username
            },
            name: account.name,
            email: account.email,
            avatar_url: account
                .avatars
                .first()
                .map(|a| a.url.clone())
                .unwrap_or_default(),
        })
    }
}
