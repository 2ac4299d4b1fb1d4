//! Decides which identity to use for a server.
//!
//! Credentials are looked up in a fixed order:
//!
//! 1. the credential store (one user is used directly unless confirmation was
//!    requested; several defer to the server's current user or a selection)
//! 2. the environment, `{KIND}_USERNAME`/`{KIND}_API_TOKEN`/`{KIND}_BEARER_TOKEN`
//!    and then the `GIT_` variables
//! 3. an interactive prompt, whose answer is saved to the store
//!
//! Batch mode stops after step 2 and never prompts.

use gitforge_auth::AuthConfigService;
use gitforge_core::{Error, GitProvider, Kind, Result, Server, UserAuth};
use tracing::{debug, info};

use crate::factory;
use crate::prompt::{required, Prompter};

type EnvLookup<'a> = &'a (dyn Fn(&str) -> Option<String> + Send + Sync);

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Outcome of looking in the store.
enum Stored {
    Found(UserAuth),
    /// The user declined the stored identity and named another one.
    Other(String),
    Missing,
}

/// Resolves a provider for a host URL against a credential store.
pub struct Resolver<'a> {
    service: &'a mut AuthConfigService,
    prompter: &'a dyn Prompter,
    env: EnvLookup<'a>,
    confirm_single_user: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(service: &'a mut AuthConfigService, prompter: &'a dyn Prompter) -> Self {
        Self {
            service,
            prompter,
            env: &process_env,
            confirm_single_user: false,
        }
    }

    /// Read credential variables through `lookup` instead of the process environment.
    pub fn with_env(mut self, lookup: EnvLookup<'a>) -> Self {
        self.env = lookup;
        self
    }

    /// Ask before using the only stored user in interactive mode.
    pub fn confirm_single_user(mut self) -> Self {
        self.confirm_single_user = true;
        self
    }

    pub fn service(&self) -> &AuthConfigService {
        self.service
    }

    pub fn prompter(&self) -> &'a dyn Prompter {
        self.prompter
    }

    /// Provider for `host_url`. `kind` overrides the stored kind when set.
    pub fn resolve(
        &mut self,
        host_url: &str,
        kind: Kind,
        batch_mode: bool,
    ) -> Result<Box<dyn GitProvider>> {
        self.resolve_with_username(host_url, kind, "", batch_mode)
    }

    /// Like [`Resolver::resolve`] but for a named user.
    pub fn resolve_with_username(
        &mut self,
        host_url: &str,
        kind: Kind,
        username: &str,
        batch_mode: bool,
    ) -> Result<Box<dyn GitProvider>> {
        let (server, auth) = self.resolve_user_auth(host_url, kind, username, batch_mode)?;
        info!(
            url = %server.url,
            kind = %server.kind,
            username = %auth.username,
            "Using git provider"
        );
        factory::create(server.kind, &server, auth)
    }

    /// The server record and credential [`Resolver::resolve`] would use.
    ///
    /// The returned server carries the effective kind, inferred from the
    /// host when none is stored.
    pub fn resolve_user_auth(
        &mut self,
        host_url: &str,
        kind: Kind,
        username: &str,
        batch_mode: bool,
    ) -> Result<(Server, UserAuth)> {
        let url = normalize_host_url(host_url)?;
        let mut server = self.service.config_mut().get_or_create_server(&url);
        if !kind.is_unset() && server.kind != kind {
            debug!(url = %url, kind = %kind, "Recording server kind");
            self.service.config_mut().set_server_kind(&url, kind);
            self.service.save_config()?;
            server.kind = kind;
        }
        if server.kind.is_unset() {
            server.kind = factory::kind_from_url(&url);
        }

        let mut username = username.to_string();
        let stored = if username.is_empty() {
            match self.stored_user_auth(&server, batch_mode)? {
                Stored::Found(auth) => Some(auth),
                Stored::Other(name) => {
                    username = name;
                    self.service.config().find_user_auth(&url, &username)
                }
                Stored::Missing => None,
            }
        } else {
            self.service.config().find_user_auth(&url, &username)
        };
        if let Some(auth) = stored.filter(|a| !a.is_invalid()) {
            return Ok((server, auth));
        }

        let from_env = UserAuth::from_environment_for(server.kind, self.env)
            .filter(|a| username.is_empty() || a.username == username);
        if let Some(auth) = from_env {
            debug!(url = %url, username = %auth.username, "Using credentials from the environment");
            return Ok((server, auth));
        }

        if batch_mode {
            let reason = if server.users.is_empty() {
                format!("Server {} has no user auths defined", url)
            } else {
                format!("no usable credential for user '{}' on {}", username, url)
            };
            return Err(Error::NoCredentials(reason));
        }

        let auth = self.prompt_user_auth(&server, &username)?;
        Ok((server, auth))
    }

    fn stored_user_auth(&self, server: &Server, batch_mode: bool) -> Result<Stored> {
        let auths = self.service.config().find_user_auths(&server.url);
        match auths.as_slice() {
            [] => Ok(Stored::Missing),
            [auth] => {
                if batch_mode || !self.confirm_single_user {
                    return Ok(Stored::Found(auth.clone()));
                }
                let message = format!("Do you wish to use {} as the git user name", auth.username);
                if self.prompter.confirm(&message, true)? {
                    return Ok(Stored::Found(auth.clone()));
                }
                let name = self.prompter.prompt_text("git user name", "", &required)?;
                Ok(Stored::Other(name))
            }
            _ => {
                if let Some(current) = auths.iter().find(|a| a.username == server.current_user) {
                    return Ok(Stored::Found(current.clone()));
                }
                if batch_mode {
                    return Err(Error::NoCredentials(format!(
                        "{} users are defined for {} and none is current",
                        auths.len(),
                        server.url
                    )));
                }
                let usernames: Vec<String> = auths.iter().map(|a| a.username.clone()).collect();
                let picked = self.prompter.select_one("git user name", &usernames, "")?;
                let found = auths.iter().find(|a| a.username == picked).cloned();
                Ok(found.map_or(Stored::Other(picked), Stored::Found))
            }
        }
    }

    fn prompt_user_auth(&mut self, server: &Server, username: &str) -> Result<UserAuth> {
        if let Ok(provider) = factory::create(server.kind, server, UserAuth::default()) {
            let token_url = provider.access_token_url();
            if !token_url.is_empty() {
                info!(
                    "An API token is needed for {}. Generate one at {}",
                    server.label(),
                    token_url
                );
            }
        }

        let default_username = if username.is_empty() {
            self.service.config().default_username.clone()
        } else {
            username.to_string()
        };
        let username = self
            .prompter
            .prompt_text("User name:", &default_username, &required)?;
        let api_token = self.prompter.prompt_secret("API Token:")?;
        let auth = UserAuth::new(username, api_token);

        self.service.save_user_auth(&server.url, &auth)?;
        if auth.is_invalid() {
            return Err(Error::Auth(
                "you did not properly define the user authentication".to_string(),
            ));
        }
        Ok(auth)
    }

    /// Store `auth` for `host_url` and return the server it was saved under.
    pub fn save_user_auth(&mut self, host_url: &str, kind: Kind, auth: &UserAuth) -> Result<Server> {
        let url = normalize_host_url(host_url)?;
        self.service.config_mut().get_or_create_server(&url);
        if !kind.is_unset() {
            self.service.config_mut().set_server_kind(&url, kind);
        }
        self.service.save_user_auth(&url, auth)?;
        let mut server = self
            .service
            .config()
            .get_server(&url)
            .unwrap_or_else(|| Server::new(&url));
        if server.kind.is_unset() {
            server.kind = factory::kind_from_url(&url);
        }
        Ok(server)
    }

    /// Choose among the stored servers.
    pub fn pick_server(&self, message: &str) -> Result<Server> {
        let servers = &self.service.config().servers;
        match servers.as_slice() {
            [] => Err(Error::Config("no servers available".to_string())),
            [server] => Ok(server.clone()),
            _ => {
                let urls: Vec<String> = servers.iter().map(|s| s.url.clone()).collect();
                let url = self.prompter.select_one(message, &urls, "")?;
                self.service
                    .config()
                    .get_server(&url)
                    .ok_or_else(|| Error::Config(format!("Could not find server for URL {}", url)))
            }
        }
    }
}

/// Canonical store key for a host: scheme included, no trailing slash.
pub fn normalize_host_url(host_url: &str) -> Result<String> {
    let trimmed = host_url.trim().trim_end_matches('/');
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let invalid = |message: String| Error::InvalidUrl {
        url: host_url.to_string(),
        message,
    };
    let parsed = url::Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::MockPrompter;
    use gitforge_auth::{AuthConfig, ConfigSaver, MemoryConfigSaver};
    use std::collections::HashMap;

    const HOST: &str = "https://git.example.com";

    fn service_with(servers: Vec<Server>) -> AuthConfigService {
        let config = AuthConfig {
            servers,
            ..Default::default()
        };
        AuthConfigService::load(MemoryConfigSaver::with_config(config)).unwrap()
    }

    fn server(url: &str, kind: Kind, users: &[&str], current: &str) -> Server {
        Server {
            url: url.to_string(),
            kind,
            current_user: current.to_string(),
            users: users
                .iter()
                .map(|u| UserAuth::new(*u, format!("{}-token", u)))
                .collect(),
            ..Default::default()
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_normalize_host_url() {
        assert_eq!(normalize_host_url("github.com").unwrap(), "https://github.com");
        assert_eq!(
            normalize_host_url("http://gitea.local:3000/").unwrap(),
            "http://gitea.local:3000"
        );
        assert!(matches!(
            normalize_host_url(""),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(normalize_host_url("https://exa mple.com").is_err());
    }

    #[test]
    fn test_single_stored_user_in_batch_mode_never_prompts() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice"], "")]);
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let (server, auth) = resolver.resolve_user_auth(HOST, Kind::Unset, "", true).unwrap();
        assert_eq!(server.kind, Kind::Gitea);
        assert_eq!(auth.username, "alice");
    }

    #[test]
    fn test_single_stored_user_is_confirmed_interactively() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice"], "")]);
        let mut prompter = MockPrompter::new();
        prompter
            .expect_confirm()
            .withf(|message, default| message.contains("alice") && *default)
            .times(1)
            .returning(|_, _| Ok(true));
        let mut resolver = Resolver::new(&mut service, &prompter)
            .with_env(&no_env)
            .confirm_single_user();

        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::Unset, "", false).unwrap();
        assert_eq!(auth.username, "alice");
    }

    #[test]
    fn test_single_stored_user_interactive_without_prompt() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice"], "")]);
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::Unset, "", false).unwrap();
        assert_eq!(auth.username, "alice");
    }

    #[test]
    fn test_declined_confirmation_prompts_for_other_user() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice"], "")]);
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm().returning(|_, _| Ok(false));
        prompter
            .expect_prompt_text()
            .withf(|message, _, _| message == "git user name")
            .times(1)
            .returning(|_, _, _| Ok("bob".to_string()));
        prompter
            .expect_prompt_text()
            .withf(|message, default, _| message == "User name:" && default == "bob")
            .times(1)
            .returning(|_, default, _| Ok(default.to_string()));
        prompter
            .expect_prompt_secret()
            .times(1)
            .returning(|_| Ok("bob-token".to_string()));
        let mut resolver = Resolver::new(&mut service, &prompter)
            .with_env(&no_env)
            .confirm_single_user();

        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::Unset, "", false).unwrap();
        assert_eq!(auth, UserAuth::new("bob", "bob-token"));
        assert_eq!(service.config().find_user_auths(HOST).len(), 2);
        assert_eq!(service.config().get_server(HOST).unwrap().current_user, "bob");
    }

    #[test]
    fn test_multiple_users_prefer_current_user() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice", "bob"], "bob")]);
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::Unset, "", false).unwrap();
        assert_eq!(auth.username, "bob");
    }

    #[test]
    fn test_multiple_users_without_current_user() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice", "bob"], "")]);
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);
        assert!(matches!(
            resolver.resolve_user_auth(HOST, Kind::Unset, "", true),
            Err(Error::NoCredentials(_))
        ));

        let mut prompter = MockPrompter::new();
        prompter
            .expect_select_one()
            .withf(|_, options, _| options == ["alice".to_string(), "bob".to_string()])
            .times(1)
            .returning(|_, _, _| Ok("alice".to_string()));
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);
        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::Unset, "", false).unwrap();
        assert_eq!(auth.username, "alice");
    }

    #[test]
    fn test_environment_kind_prefix_before_generic() {
        let mut service = service_with(Vec::new());
        let prompter = MockPrompter::new();
        let lookup = env(&[
            ("GITEA_USERNAME", "gitea-bot"),
            ("GITEA_API_TOKEN", "t1"),
            ("GIT_USERNAME", "generic"),
            ("GIT_API_TOKEN", "t2"),
        ]);
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&lookup);

        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::Gitea, "", true).unwrap();
        assert_eq!(auth, UserAuth::new("gitea-bot", "t1"));
    }

    #[test]
    fn test_incomplete_environment_falls_through_to_generic() {
        let mut service = service_with(Vec::new());
        let prompter = MockPrompter::new();
        let lookup = env(&[("GITLAB_USERNAME", "half"), ("GIT_BEARER_TOKEN", "bearer")]);
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&lookup);

        let (_, auth) = resolver.resolve_user_auth(HOST, Kind::GitLab, "", true).unwrap();
        assert_eq!(auth.bearer_token, "bearer");
    }

    #[test]
    fn test_batch_mode_without_credentials_fails() {
        let mut service = service_with(Vec::new());
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let err = resolver.resolve(HOST, Kind::Gitea, true).err().unwrap();
        assert_eq!(
            err.to_string(),
            "no credentials available: Server https://git.example.com has no user auths defined"
        );
    }

    #[test]
    fn test_interactive_entry_is_persisted() {
        let saver = MemoryConfigSaver::new();
        let mut service = AuthConfigService::new(saver.clone());
        service.config_mut().default_username = "alice".to_string();
        let mut prompter = MockPrompter::new();
        prompter
            .expect_prompt_text()
            .withf(|message, default, _| message == "User name:" && default == "alice")
            .times(1)
            .returning(|_, default, _| Ok(default.to_string()));
        prompter
            .expect_prompt_secret()
            .times(1)
            .returning(|_| Ok("s3cret".to_string()));
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let provider = resolver.resolve(HOST, Kind::Gitea, false).unwrap();
        assert_eq!(provider.kind(), Kind::Gitea);
        assert_eq!(provider.current_username(), "alice");

        let saved = saver.saved().unwrap();
        assert_eq!(
            saved.find_user_auth(HOST, "alice"),
            Some(UserAuth::new("alice", "s3cret"))
        );
        assert_eq!(saved.current_server, HOST);
        assert_eq!(saved.get_server(HOST).unwrap().kind, Kind::Gitea);
    }

    #[test]
    fn test_blank_token_is_rejected_after_saving() {
        let mut service = service_with(Vec::new());
        let mut prompter = MockPrompter::new();
        prompter
            .expect_prompt_text()
            .returning(|_, _, _| Ok("alice".to_string()));
        prompter.expect_prompt_secret().returning(|_| Ok(String::new()));
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let err = resolver.resolve(HOST, Kind::Gitea, false).err().unwrap();
        assert!(err
            .to_string()
            .contains("you did not properly define the user authentication"));
    }

    #[test]
    fn test_persistence_failure_is_surfaced() {
        struct FullDisk;
        impl ConfigSaver for FullDisk {
            fn load_config(&self) -> Result<AuthConfig> {
                Ok(AuthConfig::default())
            }
            fn save_config(&self, _config: &AuthConfig) -> Result<()> {
                Err(Error::Storage("disk full".to_string()))
            }
        }
        let mut service = AuthConfigService::load(FullDisk).unwrap();
        let mut prompter = MockPrompter::new();
        prompter
            .expect_prompt_text()
            .returning(|_, _, _| Ok("alice".to_string()));
        prompter
            .expect_prompt_secret()
            .returning(|_| Ok("token".to_string()));
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        assert!(matches!(
            resolver.resolve(HOST, Kind::Unset, false),
            Err(Error::Storage(_))
        ));
        assert!(service.config().find_user_auths(HOST).is_empty());
    }

    #[test]
    fn test_explicit_kind_is_sticky() {
        let mut service = service_with(vec![server(HOST, Kind::Unset, &["alice"], "alice")]);
        let prompter = MockPrompter::new();
        {
            let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);
            let provider = resolver.resolve(HOST, Kind::BitbucketServer, true).unwrap();
            assert_eq!(provider.kind(), Kind::BitbucketServer);
        }
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);
        let provider = resolver.resolve(HOST, Kind::Unset, true).unwrap();
        assert_eq!(provider.kind(), Kind::BitbucketServer);
    }

    #[test]
    fn test_named_user() {
        let mut service = service_with(vec![server(HOST, Kind::Gitea, &["alice", "bob"], "alice")]);
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let provider = resolver
            .resolve_with_username(HOST, Kind::Unset, "bob", true)
            .unwrap();
        assert_eq!(provider.current_username(), "bob");
        assert!(matches!(
            resolver.resolve_with_username(HOST, Kind::Unset, "carol", true),
            Err(Error::NoCredentials(_))
        ));
    }

    #[test]
    fn test_end_to_end_resolve_without_prompt() {
        let mut service = service_with(vec![server(
            "https://github.example",
            Kind::Unset,
            &["alice"],
            "",
        )]);
        let prompter = MockPrompter::new();
        let mut resolver = Resolver::new(&mut service, &prompter).with_env(&no_env);

        let provider = resolver
            .resolve("https://github.example", Kind::Unset, false)
            .unwrap();
        assert_eq!(provider.kind(), Kind::GitHub);
        assert_eq!(provider.current_username(), "alice");
        assert_eq!(provider.server_url(), "https://github.example");
    }

    #[test]
    fn test_pick_server() {
        let prompter = MockPrompter::new();
        let mut empty = service_with(Vec::new());
        let resolver = Resolver::new(&mut empty, &prompter);
        assert_eq!(
            resolver.pick_server("Which git provider?").unwrap_err().to_string(),
            "Configuration error: no servers available"
        );

        let mut single = service_with(vec![server(HOST, Kind::Gitea, &[], "")]);
        let resolver = Resolver::new(&mut single, &prompter);
        assert_eq!(resolver.pick_server("Which git provider?").unwrap().url, HOST);

        let mut many = service_with(vec![
            server(HOST, Kind::Gitea, &[], ""),
            server("https://github.com", Kind::GitHub, &[], ""),
        ]);
        let mut prompter = MockPrompter::new();
        prompter
            .expect_select_one()
            .returning(|_, options, _| Ok(options[1].clone()));
        let resolver = Resolver::new(&mut many, &prompter);
        assert_eq!(
            resolver.pick_server("Which git provider?").unwrap().kind,
            Kind::GitHub
        );
    }
}
