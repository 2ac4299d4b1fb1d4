//! Server and credential registry for gitforge.
//!
//! [`AuthConfig`] is the plain data structure: servers in insertion order,
//! each with its users. [`AuthConfigService`] pairs it with a
//! [`ConfigSaver`] and persists the whole store after every change.
//!
//! # Example
//!
//! ```ignore
//! use gitforge_auth::{AuthConfigService, FileConfigSaver};
//! use gitforge_core::UserAuth;
//!
//! let mut service = AuthConfigService::load(FileConfigSaver::default_location()?)?;
//! service.save_user_auth("https://gitea.example.com", &UserAuth::new("alice", "token"))?;
//! ```

mod saver;
mod service;
mod store;

pub use saver::{ConfigSaver, FileConfigSaver, MemoryConfigSaver};
pub use service::AuthConfigService;
pub use store::AuthConfig;
