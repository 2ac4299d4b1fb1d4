//! Canned data for seeding a [`FakeProvider`].

use chrono::{TimeZone, Utc};
use gitforge_core::{status, Commit, Issue, PullRequest, Release, RepoStatus, Result, User};

use crate::provider::FakeProvider;

pub fn commit(sha: &str, message: &str, author: &str) -> Commit {
    let user = User {
        login: author.to_string(),
        email: format!("{}@fake.git", author),
        ..User::with_login(author)
    };
    Commit {
        sha: sha.to_string(),
        message: message.to_string(),
        author: Some(user.clone()),
        committer: Some(user),
        ..Default::default()
    }
}

pub fn commit_status(context: &str, state: &str) -> RepoStatus {
    RepoStatus {
        context: context.to_string(),
        state: state.to_string(),
        ..Default::default()
    }
}

pub fn release(tag: &str, download_count: u64) -> Release {
    Release {
        name: tag.to_string(),
        tag_name: tag.to_string(),
        download_count,
        ..Default::default()
    }
}

/// A provider for `alice` holding:
///
/// * `acme/widgets` with open PR #1 (two commits, green build), issue #2
///   still open, issue #3 closed on 2024-03-01 and releases `v1.0.0`/`v1.1.0`
/// * `acme/gadgets` and `alice/dotfiles`, both empty
pub fn sample_provider() -> Result<FakeProvider> {
    let provider = FakeProvider::new("alice");
    provider.add_user(User {
        name: "Alice Example".to_string(),
        email: "alice@fake.git".to_string(),
        ..User::with_login("alice")
    })?;

    provider.add_repository("acme", "widgets")?;
    provider.add_repository("acme", "gadgets")?;
    provider.add_repository("alice", "dotfiles")?;

    let commits = vec![
        commit("a1b2c3", "Add widget skeleton", "alice"),
        commit("d4e5f6", "Wire widget into build", "alice"),
    ];
    provider.add_pull_request(
        "acme",
        "widgets",
        PullRequest {
            title: "Add widget".to_string(),
            head_ref: Some("feature/widget".to_string()),
            state: Some("open".to_string()),
            mergeable: Some(true),
            merged: Some(false),
            author: Some(User::with_login("alice")),
            ..Default::default()
        },
        commits,
    )?;
    provider.add_commit_status(
        "acme",
        "widgets",
        "d4e5f6",
        commit_status("ci/build", status::SUCCESS),
    )?;

    provider.add_issue(
        "acme",
        "widgets",
        Issue {
            title: "Widget flickers".to_string(),
            body: "Seen on dark theme".to_string(),
            state: Some("open".to_string()),
            ..Default::default()
        },
    )?;
    let closed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single();
    provider.add_issue(
        "acme",
        "widgets",
        Issue {
            title: "Widget missing icon".to_string(),
            state: Some("closed".to_string()),
            closed_at: closed,
            ..Default::default()
        },
    )?;

    provider.add_release("acme", "widgets", release("v1.0.0", 10))?;
    provider.add_release("acme", "widgets", release("v1.1.0", 5))?;
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitforge_core::{release_download_count, GitProvider, OrganisationLister};

    #[tokio::test]
    async fn test_sample_provider_contents() {
        let provider = sample_provider().unwrap();

        let orgs = provider.list_organisations().await.unwrap();
        let logins: Vec<_> = orgs.iter().map(|o| o.login.as_str()).collect();
        assert_eq!(logins, vec!["acme", "alice"]);

        let repos = provider.list_repositories("acme").await.unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].clone_url, "https://fake.git/acme/widgets.git");

        let widgets = provider.get_repository("acme", "widgets").await.unwrap();
        let pr = provider.get_pull_request("acme", &widgets, 1).await.unwrap();
        assert_eq!(pr.last_commit_sha, "d4e5f6");
        assert_eq!(
            provider.pull_request_last_commit_status(&pr).await.unwrap(),
            status::SUCCESS
        );
        assert_eq!(
            provider
                .get_pull_request_commits("acme", &widgets, 1)
                .await
                .unwrap()
                .len(),
            2
        );

        let releases = provider.list_releases("acme", "widgets").await.unwrap();
        assert_eq!(release_download_count(&releases), 15);

        assert_eq!(provider.user_info("alice").await.unwrap().name, "Alice Example");
        assert!(provider.user_info("bob").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_closed_since_filters_fixture_issues() {
        let provider = sample_provider().unwrap();
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let closed = provider
            .search_issues_closed_since("acme", "widgets", since)
            .await
            .unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].number, Some(3));
    }

    #[tokio::test]
    async fn test_pull_request_without_status_reports_not_found() {
        let provider = sample_provider().unwrap();
        let pr = provider
            .add_pull_request(
                "acme",
                "gadgets",
                PullRequest::default(),
                vec![commit("ffff", "WIP", "alice")],
            )
            .unwrap();
        assert!(provider
            .pull_request_last_commit_status(&pr)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_comments_are_recorded() {
        let provider = sample_provider().unwrap();
        let widgets = provider.get_repository("acme", "widgets").await.unwrap();
        let pr = provider.get_pull_request("acme", &widgets, 1).await.unwrap();
        provider.add_pr_comment(&pr, "/lgtm").await.unwrap();
        assert_eq!(
            provider.pull_request_comments("acme", "widgets", 1).unwrap(),
            vec!["/lgtm".to_string()]
        );
    }
}
