//! Owns the credential store and persists it after each change.

use gitforge_core::{Result, UserAuth};
use tracing::{debug, warn};

use crate::saver::ConfigSaver;
use crate::store::AuthConfig;

/// A credential store bound to its persistence.
pub struct AuthConfigService {
    config: AuthConfig,
    saver: Box<dyn ConfigSaver>,
}

impl std::fmt::Debug for AuthConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfigService")
            .field("servers", &self.config.servers.len())
            .finish()
    }
}

impl AuthConfigService {
    /// An empty store; call [`AuthConfigService::load_config`] to read the saved one.
    pub fn new(saver: impl ConfigSaver + 'static) -> Self {
        Self {
            config: AuthConfig::default(),
            saver: Box::new(saver),
        }
    }

    /// Build the service and load the persisted store.
    pub fn load(saver: impl ConfigSaver + 'static) -> Result<Self> {
        let mut service = Self::new(saver);
        service.load_config()?;
        Ok(service)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Mutable access for in-memory edits. Nothing is saved until
    /// [`AuthConfigService::save_config`].
    pub fn config_mut(&mut self) -> &mut AuthConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: AuthConfig) {
        self.config = config;
    }

    /// Replace the in-memory store with the persisted one.
    pub fn load_config(&mut self) -> Result<&AuthConfig> {
        self.config = self.saver.load_config()?;
        Ok(&self.config)
    }

    pub fn save_config(&self) -> Result<()> {
        self.saver.save_config(&self.config)
    }

    /// Store a credential for `url` and persist.
    ///
    /// Updates the default username and current server, and records the
    /// pipeline identity if none was recorded before. If saving fails the
    /// in-memory store is left as it was.
    pub fn save_user_auth(&mut self, url: &str, auth: &UserAuth) -> Result<()> {
        let previous = self.config.clone();

        self.config.set_user_auth(url, auth.clone());
        let username = auth.username.as_str();
        if !username.is_empty() {
            self.config.default_username = username.to_string();
        }
        if self.config.pipeline_username.is_empty() {
            self.config.pipeline_username = username.to_string();
            self.config.pipeline_server = url.to_string();
        }
        self.config.current_server = url.to_string();

        debug!(url = url, username = username, "Saving user auth");
        if let Err(e) = self.save_config() {
            warn!(url = url, error = %e, "Failed to persist user auth, discarding it");
            self.config = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Remove a server and persist.
    pub fn delete_server(&mut self, url: &str) -> Result<()> {
        self.config.delete_server(url);
        self.save_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saver::{MemoryConfigSaver, MockConfigSaver};
    use gitforge_core::Error;

    #[test]
    fn test_pipeline_identity_first_writer_wins() {
        let mut service = AuthConfigService::new(MemoryConfigSaver::new());

        service
            .save_user_auth("https://first.example.com", &UserAuth::new("first", "t1"))
            .unwrap();
        service
            .save_user_auth("https://second.example.com", &UserAuth::new("second", "t2"))
            .unwrap();

        let config = service.config();
        assert_eq!(config.pipeline_server, "https://first.example.com");
        assert_eq!(config.pipeline_username, "first");
        assert_eq!(config.default_username, "second");
        assert_eq!(config.current_server, "https://second.example.com");
    }

    #[test]
    fn test_save_user_auth_persists_whole_store() {
        let mut service = AuthConfigService::new(MemoryConfigSaver::new());
        service
            .save_user_auth("https://a.example.com", &UserAuth::new("alice", "tok"))
            .unwrap();

        let mut reloaded = AuthConfigService::new(MemoryConfigSaver::with_config(
            service.config().clone(),
        ));
        reloaded.load_config().unwrap();
        assert_eq!(
            reloaded.config().find_user_auth("https://a.example.com", "alice"),
            Some(UserAuth::new("alice", "tok"))
        );
    }

    #[test]
    fn test_save_failure_discards_credential() {
        let mut saver = MockConfigSaver::new();
        saver
            .expect_save_config()
            .times(1)
            .returning(|_| Err(Error::Storage("disk full".to_string())));

        let mut service = AuthConfigService::new(saver);
        let err = service
            .save_user_auth("https://a.example.com", &UserAuth::new("alice", "tok"))
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(service.config().servers.is_empty());
        assert!(service.config().pipeline_username.is_empty());
    }

    #[test]
    fn test_delete_server_saves() {
        let mut saver = MockConfigSaver::new();
        saver
            .expect_save_config()
            .withf(|config| config.servers.is_empty() && config.current_server.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let mut service = AuthConfigService::new(saver);
        service.config_mut().get_or_create_server("https://foo.com");
        service.config_mut().current_server = "https://foo.com".to_string();
        service.delete_server("https://foo.com").unwrap();
    }

    #[test]
    fn test_load_propagates_errors() {
        let mut saver = MockConfigSaver::new();
        saver
            .expect_load_config()
            .returning(|| Err(Error::Storage("unreadable".to_string())));
        assert!(AuthConfigService::load(saver).is_err());
    }
}
