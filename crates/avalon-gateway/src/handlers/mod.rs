//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod admin;
pub mod build;
pub mod buildings;
pub mod health;
pub mod metrics;
pub mod registry;

/// Strip the optional `v` prefix from a version path segment.
pub(crate) fn normalize_version(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}
