//! Token verification.
//!
//! This module provides the [`TokenVerifier`] capability consumed by the
//! gateway's authentication middleware, the OIDC-backed implementation, and a
//! mock for tests.

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::discovery::{DiscoveryClient, ProviderMetadata};
use crate::error::{AuthError, Result};
use crate::jwks::JwksProvider;
use crate::AuthConfig;

/// Asymmetric algorithms accepted from the provider.
const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

/// The payload of a token whose signature and standard claims were verified.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    payload: Value,
}

impl VerifiedToken {
    /// Wrap a verified payload.
    #[must_use]
    pub const fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// The raw claim payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// The `sub` claim, if present.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }

    /// Deserialize the payload into a typed claims model.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClaims` if the payload does not fit `T`.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.payload).map_err(|e| AuthError::InvalidClaims(e.to_string()))
    }
}

/// Capability for verifying bearer credentials.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be verified.
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

/// Audience claim that can be either a string or array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(Vec<String>),
    #[default]
    None,
}

impl Audience {
    fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Multiple(v) => v.iter().any(|s| s == value),
            Self::None => false,
        }
    }
}

/// OIDC verifier validating signatures against the provider's JWKS.
pub struct OidcVerifier {
    config: AuthConfig,
    issuer: String,
    jwks: JwksProvider,
}

impl OidcVerifier {
    /// Discover the provider and build a verifier for it.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn discover(config: AuthConfig) -> Result<Self> {
        let metadata = DiscoveryClient::new(config.clone())?.fetch().await?;

        tracing::info!(
            issuer = %metadata.issuer,
            jwks_uri = %metadata.jwks_uri,
            "Discovered OIDC provider"
        );

        Self::with_metadata(config, metadata)
    }

    /// Build a verifier from already-known provider metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_metadata(config: AuthConfig, metadata: ProviderMetadata) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AuthError::Internal(format!("failed to create HTTP client: {e}")))?;

        let jwks = JwksProvider::new(metadata.jwks_uri, config.jwks_refresh_interval(), client);

        Ok(Self {
            config,
            issuer: metadata.issuer,
            jwks,
        })
    }

    /// Get a reference to the JWKS provider for manual operations.
    #[must_use]
    pub const fn jwks(&self) -> &JwksProvider {
        &self.jwks
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::MissingClaim("kid".to_string()))?;

        let key = self.jwks.get_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        // Audience may be a string or an array; checked below.
        validation.validate_aud = false;
        validation.validate_exp = true;

        let token_data = decode::<Value>(token, &key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::MissingClaim(claim.clone())
            }
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        let payload = token_data.claims;

        if !self.config.client_id.is_empty() {
            let audience = payload
                .get("aud")
                .cloned()
                .map(serde_json::from_value::<Audience>)
                .transpose()
                .map_err(|e| AuthError::InvalidToken(format!("invalid aud claim: {e}")))?
                .unwrap_or_default();

            if !audience.contains(&self.config.client_id) {
                return Err(AuthError::InvalidAudience);
            }
        }

        Ok(VerifiedToken::new(payload))
    }
}

/// A mock verifier for testing.
///
/// Accepts only the tokens it was configured with and returns the associated
/// payload. Every call is counted.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockTokenVerifier {
    expected: std::collections::HashMap<String, Value>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockTokenVerifier {
    /// Create a verifier that rejects every token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` and answer with the serialized `claims`.
    ///
    /// # Panics
    ///
    /// Panics if the claims cannot be serialized.
    #[must_use]
    pub fn with_claims(self, token: impl Into<String>, claims: &avalon_core::Claims) -> Self {
        let payload = serde_json::to_value(claims).expect("claims serialize to JSON");
        self.with_payload(token, payload)
    }

    /// Accept `token` and answer with an arbitrary payload.
    #[must_use]
    pub fn with_payload(mut self, token: impl Into<String>, payload: Value) -> Self {
        self.expected.insert(token.into(), payload);
        self
    }

    /// Number of `verify` calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TokenVerifier for MockTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        self.expected
            .get(token)
            .cloned()
            .map(VerifiedToken::new)
            .ok_or_else(|| AuthError::InvalidToken("invalid id token".to_string()))
    }
}
