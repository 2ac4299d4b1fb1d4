//! Backend kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifies which hosting service a server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    GitHub,
    GitLab,
    Gitea,
    BitbucketCloud,
    BitbucketServer,
    Gerrit,
    Fake,
    /// Not yet resolved. Stored as an empty string.
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Kind {
    /// All concrete kinds, in display order.
    pub const ALL: [Kind; 7] = [
        Kind::GitHub,
        Kind::GitLab,
        Kind::Gitea,
        Kind::BitbucketCloud,
        Kind::BitbucketServer,
        Kind::Gerrit,
        Kind::Fake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::GitHub => "github",
            Kind::GitLab => "gitlab",
            Kind::Gitea => "gitea",
            Kind::BitbucketCloud => "bitbucketcloud",
            Kind::BitbucketServer => "bitbucketserver",
            Kind::Gerrit => "gerrit",
            Kind::Fake => "fake",
            Kind::Unset => "",
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Kind::Unset)
    }

    /// Prefix for credential environment variables, e.g. `GITLAB` for
    /// `GITLAB_USERNAME`. Unset kinds use the generic prefix.
    pub fn env_prefix(&self) -> String {
        if self.is_unset() {
            GENERIC_ENV_PREFIX.to_string()
        } else {
            self.as_str().to_uppercase()
        }
    }

    /// Best-effort kind for well-known public hosts.
    pub fn from_url(url: &str) -> Kind {
        let host = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split(['/', ':'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match host.as_str() {
            "github.com" | "api.github.com" => Kind::GitHub,
            "gitlab.com" => Kind::GitLab,
            "bitbucket.org" | "api.bitbucket.org" => Kind::BitbucketCloud,
            _ => Kind::Unset,
        }
    }
}

/// Generic credential environment variable prefix.
pub const GENERIC_ENV_PREFIX: &str = "GIT";

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match normalized.as_str() {
            "github" => Ok(Kind::GitHub),
            "gitlab" => Ok(Kind::GitLab),
            "gitea" => Ok(Kind::Gitea),
            "bitbucketcloud" | "bitbucket" => Ok(Kind::BitbucketCloud),
            "bitbucketserver" => Ok(Kind::BitbucketServer),
            "gerrit" => Ok(Kind::Gerrit),
            "fake" => Ok(Kind::Fake),
            "" => Ok(Kind::Unset),
            _ => Err(Error::Config(format!("Unknown git provider kind: {}", s))),
        }
    }
}
