//! Gerrit backend for gitforge.

mod client;
mod types;

pub use client::GerritProvider;
pub use types::*;
