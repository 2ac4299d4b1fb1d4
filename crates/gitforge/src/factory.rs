//! Builds the adapter for a server.

use gitforge_bitbucket_cloud::BitbucketCloudProvider;
use gitforge_bitbucket_server::BitbucketServerProvider;
use gitforge_core::{Error, GitProvider, Kind, Result, Server, UserAuth};
use gitforge_fake::FakeProvider;
use gitforge_gerrit::GerritProvider;
use gitforge_gitea::GiteaProvider;
use gitforge_github::GitHubProvider;
use gitforge_gitlab::{GitLabProvider, DEFAULT_GITLAB_URL};
use tracing::debug;

/// Kind to use for `url` when the server has none recorded.
pub fn kind_from_url(url: &str) -> Kind {
    Kind::from_url(url)
}

/// Create the provider for `server` acting as `auth`.
///
/// An unset kind is inferred from well-known hosts and otherwise falls back
/// to the GitHub adapter. Self-hosted kinds need a server URL.
pub fn create(kind: Kind, server: &Server, auth: UserAuth) -> Result<Box<dyn GitProvider>> {
    let url = server.url.trim_end_matches('/');
    let kind = if kind.is_unset() {
        kind_from_url(url)
    } else {
        kind
    };
    debug!(kind = %kind, url = url, username = %auth.username, "Creating git provider");

    let provider: Box<dyn GitProvider> = match kind {
        Kind::GitLab => {
            let base_url = if url.is_empty() { DEFAULT_GITLAB_URL } else { url };
            Box::new(GitLabProvider::with_base_url(base_url, auth))
        }
        Kind::Gitea => Box::new(GiteaProvider::new(required_url(kind, url)?, auth)),
        Kind::BitbucketCloud => Box::new(BitbucketCloudProvider::new(url, auth)),
        Kind::BitbucketServer => {
            Box::new(BitbucketServerProvider::new(required_url(kind, url)?, auth))
        }
        Kind::Gerrit => Box::new(GerritProvider::new(required_url(kind, url)?, auth)),
        Kind::Fake => Box::new(FakeProvider::with_auth(auth)),
        Kind::GitHub | Kind::Unset => Box::new(GitHubProvider::new(url, auth)?),
    };
    Ok(provider)
}

fn required_url(kind: Kind, url: &str) -> Result<&str> {
    if url.is_empty() {
        return Err(Error::Config(format!("{} requires a server URL", kind)));
    }
    url::Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(url: &str) -> Server {
        Server::new(url)
    }

    #[test]
    fn test_dispatch_by_kind() {
        let auth = UserAuth::new("alice", "token");
        let cases = [
            (Kind::GitHub, "https://github.com"),
            (Kind::GitLab, "https://gitlab.example.com"),
            (Kind::Gitea, "https://gitea.example.com"),
            (Kind::BitbucketCloud, "https://bitbucket.org"),
            (Kind::BitbucketServer, "https://stash.example.com"),
            (Kind::Gerrit, "https://review.example.com"),
            (Kind::Fake, "https://fake.git"),
        ];
        for (kind, url) in cases {
            let provider = create(kind, &server(url), auth.clone()).unwrap();
            assert_eq!(provider.kind(), kind, "{}", url);
            assert_eq!(provider.current_username(), "alice");
        }
    }

    #[test]
    fn test_unset_kind_falls_back_to_github() {
        let provider = create(
            Kind::Unset,
            &server("https://git.example.com"),
            UserAuth::new("alice", "token"),
        )
        .unwrap();
        assert_eq!(provider.kind(), Kind::GitHub);
        assert_eq!(provider.server_url(), "https://git.example.com");
    }

    #[test]
    fn test_unset_kind_uses_well_known_host() {
        let provider = create(
            Kind::Unset,
            &server("https://gitlab.com"),
            UserAuth::new("alice", "token"),
        )
        .unwrap();
        assert_eq!(provider.kind(), Kind::GitLab);
        assert_eq!(kind_from_url("https://bitbucket.org/acme"), Kind::BitbucketCloud);
        assert_eq!(kind_from_url("https://stash.example.com"), Kind::Unset);
    }

    #[test]
    fn test_self_hosted_kinds_need_a_valid_url() {
        let auth = UserAuth::new("alice", "token");
        assert!(matches!(
            create(Kind::Gitea, &server(""), auth.clone()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            create(Kind::Gerrit, &server("not a url"), auth),
            Err(Error::InvalidUrl { .. })
        ));
    }
}
