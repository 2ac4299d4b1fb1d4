//! Gerrit REST API types.

use serde::{Deserialize, Serialize};

/// Project entry from `/projects/`. The list endpoint keys entries by name
/// and omits `name` from the body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GerritProject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInput {
    pub submit_type: String,
    pub description: String,
    pub permissions_only: bool,
    pub create_empty_commit: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GerritAccount {
    #[serde(rename = "_account_id", default)]
    pub account_id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatars: Vec<GerritAvatar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GerritAvatar {
    pub url: String,
}
