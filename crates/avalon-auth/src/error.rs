//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer credential was presented.
    #[error("missing bearer token")]
    MissingToken,

    /// The token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The token signature is invalid.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token issuer does not match the provider.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The token audience does not include the client ID.
    #[error("invalid audience")]
    InvalidAudience,

    /// The token is signed with an algorithm the verifier does not accept.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A required claim is missing from the token.
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    /// The verified payload could not be mapped onto the claims model.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// Provider discovery failed.
    #[error("OIDC discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Failed to fetch JWKS from the provider.
    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    /// The key ID specified in the token was not found.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The token format is invalid.
    #[error("invalid token format: {0}")]
    InvalidToken(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the failure lies with the identity provider rather
    /// than the presented credential.
    #[must_use]
    pub const fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryFailed(_) | Self::JwksFetchFailed(_) | Self::Internal(_)
        )
    }
}
