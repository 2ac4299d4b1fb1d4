//! Server and user credential records.
//!
//! These are the persisted shapes shared by the credential store and the
//! provider adapters. Adapters receive copies; nothing here is aliased
//! back into a store.

use serde::{Deserialize, Serialize};

use crate::kind::{Kind, GENERIC_ENV_PREFIX};

/// A single identity on a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAuth {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bearer_token: String,
}

impl UserAuth {
    pub fn new(username: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_token: api_token.into(),
            bearer_token: String::new(),
        }
    }

    pub fn with_bearer_token(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            ..Default::default()
        }
    }

    /// A credential is usable with a bearer token, or with both a username
    /// and an API token.
    pub fn is_invalid(&self) -> bool {
        self.bearer_token.is_empty() && (self.api_token.is_empty() || self.username.is_empty())
    }

    /// Read `{PREFIX}_USERNAME`, `{PREFIX}_API_TOKEN` and `{PREFIX}_BEARER_TOKEN`.
    pub fn from_environment(prefix: &str) -> Self {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Like [`UserAuth::from_environment`] but reading through `lookup`.
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |suffix: &str| lookup(&format!("{}_{}", prefix, suffix)).unwrap_or_default();
        Self {
            username: read("USERNAME"),
            api_token: read("API_TOKEN"),
            bearer_token: read("BEARER_TOKEN"),
        }
    }

    /// First valid credential from the kind's prefix, then the generic `GIT` prefix.
    pub fn from_environment_for(kind: Kind, lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let mut prefixes = vec![kind.env_prefix()];
        if prefixes[0] != GENERIC_ENV_PREFIX {
            prefixes.push(GENERIC_ENV_PREFIX.to_string());
        }
        prefixes
            .iter()
            .map(|prefix| Self::from_lookup(prefix, &lookup))
            .find(|auth| !auth.is_invalid())
    }

    /// The secret to send: the bearer token when set, else the API token.
    pub fn token(&self) -> &str {
        if self.bearer_token.is_empty() {
            &self.api_token
        } else {
            &self.bearer_token
        }
    }
}

/// A hosting server and the identities known for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_user: String,
    #[serde(default)]
    pub users: Vec<UserAuth>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Display name, falling back to the URL.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }

    pub fn description(&self) -> String {
        if self.name.is_empty() {
            self.url.clone()
        } else {
            format!("{} at {}", self.name, self.url)
        }
    }

    pub fn find_user(&self, username: &str) -> Option<&UserAuth> {
        self.users.iter().find(|u| u.username == username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_is_invalid_truth_table() {
        for username in ["", "alice"] {
            for api_token in ["", "tok"] {
                for bearer in ["", "bearer"] {
                    let auth = UserAuth {
                        username: username.to_string(),
                        api_token: api_token.to_string(),
                        bearer_token: bearer.to_string(),
                    };
                    let expected = bearer.is_empty() && (username.is_empty() || api_token.is_empty());
                    assert_eq!(
                        auth.is_invalid(),
                        expected,
                        "username={:?} api_token={:?} bearer={:?}",
                        username,
                        api_token,
                        bearer
                    );
                }
            }
        }
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [("GITLAB_USERNAME", "bob"), ("GITLAB_API_TOKEN", "t0k")]
            .into_iter()
            .collect();
        let auth = UserAuth::from_lookup("GITLAB", |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(auth, UserAuth::new("bob", "t0k"));
    }

    #[test]
    fn test_from_environment_for_falls_back_to_generic() {
        let env: HashMap<&str, &str> = [
            ("GITEA_USERNAME", "only-user"),
            ("GIT_USERNAME", "generic"),
            ("GIT_API_TOKEN", "generic-token"),
        ]
        .into_iter()
        .collect();
        let auth = UserAuth::from_environment_for(Kind::Gitea, |k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(auth.username, "generic");

        let none = UserAuth::from_environment_for(Kind::Gitea, |_| None);
        assert!(none.is_none());
    }

    #[test]
    fn test_token_prefers_bearer() {
        let mut auth = UserAuth::new("alice", "api");
        assert_eq!(auth.token(), "api");
        auth.bearer_token = "bearer".to_string();
        assert_eq!(auth.token(), "bearer");
    }

    #[test]
    fn test_server_label_and_description() {
        let mut server = Server::new("https://git.example.com");
        assert_eq!(server.label(), "https://git.example.com");
        assert_eq!(server.description(), "https://git.example.com");
        server.name = "Example".to_string();
        assert_eq!(server.label(), "Example");
        assert_eq!(server.description(), "Example at https://git.example.com");
    }
}
