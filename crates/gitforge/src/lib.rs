//! One interface over GitHub, GitLab, Gitea, Bitbucket Cloud, Bitbucket
//! Server and Gerrit.
//!
//! [`Resolver`] turns a host URL into a ready [`GitProvider`], taking the
//! identity from the credential store, the environment or a prompt. The
//! [`select`] helpers drive the interactive organisation and repository
//! choices built on top of it.
//!
//! # Example
//!
//! ```ignore
//! use gitforge::{Resolver, TerminalPrompter};
//! use gitforge_auth::{AuthConfigService, FileConfigSaver};
//! use gitforge_core::Kind;
//!
//! let mut service = AuthConfigService::load(FileConfigSaver::default_location()?)?;
//! let prompter = TerminalPrompter::new();
//! let provider = Resolver::new(&mut service, &prompter).resolve("https://github.com", Kind::Unset, false)?;
//! let repos = provider.list_repositories("").await?;
//! ```

pub mod factory;
pub mod prompt;
pub mod resolver;
pub mod select;

pub use factory::{create, kind_from_url};
pub use prompt::{required, Prompter, TerminalPrompter, Validator};
pub use resolver::{normalize_host_url, Resolver};
pub use select::{
    organisation_choices, pick_new_repository, pick_organisation, pick_owner, pick_repositories,
    pick_repository_name, NewRepository, NewRepositoryOptions,
};

pub use gitforge_core::{Error, GitProvider, Kind, Result};
