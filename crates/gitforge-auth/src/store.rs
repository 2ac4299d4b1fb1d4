//! The in-memory registry of servers and their credentials.

use gitforge_core::{Kind, Server, UserAuth};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hosts that get a display name and kind when first registered.
const WELL_KNOWN_HOSTS: &[(&str, &str, Kind)] = &[
    ("github.com", "GitHub", Kind::GitHub),
    ("https://github.com", "GitHub", Kind::GitHub),
];

/// Every known server with its users, plus the store-wide defaults.
///
/// Lookups hand back copies; all mutation goes through the named methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_server: String,
    /// Server of the first credential ever saved. Never overwritten.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pipeline_server: String,
    /// Username of the first credential ever saved. Never overwritten.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pipeline_username: String,
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, url: &str) -> Option<usize> {
        self.servers.iter().position(|s| s.url == url)
    }

    /// Borrow a server by URL.
    pub fn server(&self, url: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.url == url)
    }

    /// Copy of a server by URL.
    pub fn get_server(&self, url: &str) -> Option<Server> {
        self.server(url).cloned()
    }

    pub fn server_urls(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.url.clone()).collect()
    }

    /// Return the server for `url`, registering it first if needed.
    pub fn get_or_create_server(&mut self, url: &str) -> Server {
        if let Some(server) = self.get_server(url) {
            return server;
        }
        let (name, kind) = WELL_KNOWN_HOSTS
            .iter()
            .find(|(host, _, _)| *host == url)
            .map(|(_, name, kind)| (name.to_string(), *kind))
            .unwrap_or_default();
        self.get_or_create_server_name(url, &name, kind)
    }

    /// Like [`AuthConfig::get_or_create_server`] with an explicit name and kind
    /// for new servers. Existing servers are returned unchanged.
    pub fn get_or_create_server_name(&mut self, url: &str, name: &str, kind: Kind) -> Server {
        if let Some(server) = self.get_server(url) {
            return server;
        }
        debug!(url = url, name = name, kind = %kind, "Registering server");
        let server = Server {
            url: url.to_string(),
            name: name.to_string(),
            kind,
            ..Default::default()
        };
        self.servers.push(server.clone());
        server
    }

    pub fn find_user_auths(&self, url: &str) -> Vec<UserAuth> {
        self.server(url)
            .map(|s| s.users.clone())
            .unwrap_or_default()
    }

    /// Find a user on a server.
    ///
    /// With an empty username the sole credential is returned, but only if
    /// the server has exactly one.
    pub fn find_user_auth(&self, url: &str, username: &str) -> Option<UserAuth> {
        let auths = self.find_user_auths(url);
        if username.is_empty() {
            return match auths.as_slice() {
                [only] => Some(only.clone()),
                _ => None,
            };
        }
        auths.into_iter().find(|a| a.username == username)
    }

    /// Return the user, registering an empty credential for it if needed.
    pub fn get_or_create_user_auth(&mut self, url: &str, username: &str) -> UserAuth {
        if let Some(auth) = self.find_user_auth(url, username) {
            return auth;
        }
        self.get_or_create_server(url);
        let auth = UserAuth {
            username: username.to_string(),
            ..Default::default()
        };
        if let Some(idx) = self.position(url) {
            self.servers[idx].users.push(auth.clone());
        }
        auth
    }

    /// Upsert a credential by username and make it the server's current user.
    pub fn set_user_auth(&mut self, url: &str, auth: UserAuth) {
        let username = auth.username.clone();
        match self.position(url) {
            Some(idx) => {
                let server = &mut self.servers[idx];
                match server.users.iter_mut().find(|u| u.username == username) {
                    Some(existing) => *existing = auth,
                    None => server.users.push(auth),
                }
                server.current_user = username;
            }
            None => self.servers.push(Server {
                url: url.to_string(),
                users: vec![auth],
                current_user: username,
                ..Default::default()
            }),
        }
    }

    /// Set a server's kind, registering the server if needed.
    pub fn set_server_kind(&mut self, url: &str, kind: Kind) {
        self.get_or_create_server(url);
        if let Some(idx) = self.position(url) {
            self.servers[idx].kind = kind;
        }
    }

    pub fn set_server_name(&mut self, url: &str, name: &str) {
        if let Some(idx) = self.position(url) {
            self.servers[idx].name = name.to_string();
        }
    }

    pub fn set_current_user(&mut self, url: &str, username: &str) {
        if let Some(idx) = self.position(url) {
            self.servers[idx].current_user = username.to_string();
        }
    }

    /// Remove a server. Clears `current_server` if it pointed at it.
    pub fn delete_server(&mut self, url: &str) {
        self.servers.retain(|s| s.url != url);
        if self.current_server == url {
            self.current_server.clear();
        }
    }
}
