//! Common error types for the Avalon gateway.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the gateway.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The `exp` claim is outside the representable timestamp range.
    #[error("invalid expiry timestamp: {0}")]
    InvalidExpiry(i64),

    /// A blueprint kind tag was not recognized.
    #[error("invalid blueprint kind: {0}")]
    InvalidKind(String),

    /// A blueprint definition is missing its name.
    #[error("blueprint is missing a name")]
    MissingName,
}
