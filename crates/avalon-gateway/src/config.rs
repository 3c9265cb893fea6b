//! Gateway configuration types.
//!
//! This module defines the router-level settings of the HTTP gateway.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Resource name that role paths are checked against.
    #[serde(default = "GatewayConfig::default_role_resource")]
    pub role_resource: String,

    /// Deployed blueprint version, served from the cache.
    #[serde(default)]
    pub blueprint_version: String,

    /// Bus subject for build commands.
    #[serde(default = "GatewayConfig::default_build_subject")]
    pub build_subject: String,

    /// How long to wait for a bus reply, in seconds.
    #[serde(default = "GatewayConfig::default_rpc_deadline")]
    pub rpc_deadline_seconds: u64,
}

impl GatewayConfig {
    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    fn default_role_resource() -> String {
        "dev.avalon.cool".to_string()
    }

    fn default_build_subject() -> String {
        "build".to_string()
    }

    const fn default_rpc_deadline() -> u64 {
        10
    }

    /// Qualify a role name with the configured resource.
    #[must_use]
    pub fn role(&self, name: &str) -> String {
        format!("{}:{name}", self.role_resource)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the bus reply deadline as a `Duration`.
    #[must_use]
    pub const fn rpc_deadline(&self) -> Duration {
        Duration::from_secs(self.rpc_deadline_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            role_resource: Self::default_role_resource(),
            blueprint_version: String::new(),
            build_subject: Self::default_build_subject(),
            rpc_deadline_seconds: Self::default_rpc_deadline(),
        }
    }
}
