//! In-memory backend for gitforge.
//!
//! [`FakeProvider`] keeps organisations, repositories, pull requests, issues,
//! statuses, releases and webhooks in process memory so code built on
//! [`gitforge_core::GitProvider`] can be tested without a server.

pub mod fixtures;
mod provider;

pub use provider::{
    fake_repository, FakeIssue, FakeOrganisation, FakeProvider, FakePullRequest, FakeRepository,
    FAKE_GIT_URL,
};
