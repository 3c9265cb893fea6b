//! Bearer token verification for the Avalon gateway.
//!
//! This crate verifies ID tokens issued by an OpenID Connect provider:
//!
//! - Provider discovery via `.well-known/openid-configuration`
//! - JWKS (JSON Web Key Set) fetching and caching
//! - RSA, EC and Ed25519 signature validation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│  TokenVerifier   │
//! │   middleware     │     │  (trait)         │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  OidcVerifier    │
//!                          └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  JwksProvider    │
//!                          │  (key cache)     │
//!                          └────────┬─────────┘
//!                                   │ HTTPS
//!                          ┌────────▼─────────┐
//!                          │  OIDC provider   │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use avalon_auth::{AuthConfig, OidcVerifier, TokenVerifier};
//! use avalon_core::Claims;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig {
//!     issuer_url: "https://auth.avalon.cool/realms/avalon".to_string(),
//!     client_id: "avalon-gateway".to_string(),
//!     ..AuthConfig::default()
//! };
//!
//! let verifier = OidcVerifier::discover(config).await?;
//!
//! // In a request handler:
//! let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9...";
//! let claims: Claims = verifier.verify(token).await?.claims()?;
//!
//! println!("Subject: {}", claims.subject);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::time::Duration;

pub mod discovery;
pub mod error;
pub mod jwks;
pub mod verifier;

pub use discovery::{DiscoveryClient, ProviderMetadata};
pub use error::{AuthError, Result};
pub use jwks::JwksProvider;
pub use verifier::{OidcVerifier, TokenVerifier, VerifiedToken};

#[cfg(any(test, feature = "test-utils"))]
pub use verifier::MockTokenVerifier;

/// Configuration for the OpenID Connect provider.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Issuer URL (e.g., `https://auth.avalon.cool/realms/avalon`).
    pub issuer_url: String,
    /// Expected audience; the audience check is skipped when empty.
    pub client_id: String,
    /// How often to refresh the JWKS cache, in seconds.
    pub jwks_refresh_seconds: u64,
    /// Timeout for calls to the provider, in seconds.
    pub http_timeout_seconds: u64,
}

impl AuthConfig {
    /// Get the discovery document URL.
    #[must_use]
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.issuer_url.trim_end_matches('/')
        )
    }

    /// Get the expected token issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer_url
    }

    /// JWKS cache lifetime.
    #[must_use]
    pub const fn jwks_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.jwks_refresh_seconds)
    }

    /// Timeout for provider requests.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer_url: "https://auth.avalon.cool/realms/avalon".to_string(),
            client_id: String::new(),
            jwks_refresh_seconds: 300,
            http_timeout_seconds: 10,
        }
    }
}
