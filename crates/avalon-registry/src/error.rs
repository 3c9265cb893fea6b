//! Error types for the registry layer.

use avalon_core::BlueprintKind;
use thiserror::Error;

/// A result type using `RegistryError`.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// A definition already exists and the write was not forced.
    #[error("{kind} blueprint {slug} already exists in version {version}")]
    AlreadyExists {
        /// Blueprint kind.
        kind: BlueprintKind,
        /// Version tag.
        version: String,
        /// Lookup key.
        slug: String,
    },

    /// The definition cannot be stored.
    #[error("invalid blueprint: {0}")]
    Invalid(#[from] avalon_core::CoreError),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
