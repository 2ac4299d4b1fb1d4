//! Persistence for the credential store.
//!
//! The store is written whole on every save. [`FileConfigSaver`] keeps it
//! as TOML in the platform config directory:
//!
//! - **macOS/Linux**: `~/.config/gitforge/auth.toml`
//! - **Windows**: `%APPDATA%\gitforge\auth.toml`

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use gitforge_core::{Error, Result};
use tracing::{debug, info};

use crate::store::AuthConfig;

/// Auth file name.
const AUTH_FILE_NAME: &str = "auth.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "gitforge";

/// Loads and saves the whole credential store.
#[cfg_attr(test, mockall::automock)]
pub trait ConfigSaver: Send + Sync {
    /// Load the store. A store that was never saved loads as empty.
    fn load_config(&self) -> Result<AuthConfig>;

    /// Replace the persisted store with `config`.
    fn save_config(&self, config: &AuthConfig) -> Result<()>;
}

// =============================================================================
// FileConfigSaver - TOML file implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct FileConfigSaver {
    path: PathBuf,
}

impl FileConfigSaver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Saver for the default location.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    /// Get the default auth file path.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME).join(AUTH_FILE_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSaver for FileConfigSaver {
    fn load_config(&self) -> Result<AuthConfig> {
        let path = &self.path;
        if !path.exists() {
            debug!(path = ?path, "Auth file does not exist, using empty store");
            return Ok(AuthConfig::default());
        }

        debug!(path = ?path, "Loading auth config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read auth file {:?}: {}", path, e)))?;

        let config: AuthConfig = toml::from_str(&contents)
            .map_err(|e| Error::Storage(format!("Failed to parse auth file {:?}: {}", path, e)))?;

        info!(path = ?path, servers = config.servers.len(), "Auth config loaded");
        Ok(config)
    }

    fn save_config(&self, config: &AuthConfig) -> Result<()> {
        let path = &self.path;
        if path.as_os_str().is_empty() {
            return Err(Error::Config("No auth file name defined".to_string()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create config directory: {}", e))
            })?;
        }

        debug!(path = ?path, "Saving auth config");

        let contents = toml::to_string_pretty(config)
            .map_err(|e| Error::Storage(format!("Failed to serialize auth config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Storage(format!("Failed to write auth file {:?}: {}", path, e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| Error::Storage(format!("Failed to restrict auth file permissions: {}", e)),
            )?;
        }

        info!(path = ?path, "Auth config saved");
        Ok(())
    }
}

// =============================================================================
// MemoryConfigSaver - In-memory implementation for testing
// =============================================================================

/// Keeps the last saved store in memory. Clones share the same slot.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigSaver {
    saved: Arc<RwLock<Option<AuthConfig>>>,
}

impl MemoryConfigSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-persisted store.
    pub fn with_config(config: AuthConfig) -> Self {
        Self {
            saved: Arc::new(RwLock::new(Some(config))),
        }
    }

    /// The last saved store, if any save happened.
    pub fn saved(&self) -> Option<AuthConfig> {
        self.saved.read().ok().and_then(|s| s.clone())
    }
}

impl ConfigSaver for MemoryConfigSaver {
    fn load_config(&self) -> Result<AuthConfig> {
        let saved = self
            .saved
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(saved.clone().unwrap_or_default())
    }

    fn save_config(&self, config: &AuthConfig) -> Result<()> {
        let mut saved = self
            .saved
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        *saved = Some(config.clone());
        Ok(())
    }
}
