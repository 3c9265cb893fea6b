//! Bus error types.

use std::time::Duration;

use thiserror::Error;

/// A result type using `BusError`.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur while exchanging messages over the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// No response arrived before the deadline.
    #[error("request to {subject} timed out after {deadline:?}")]
    Timeout {
        /// Subject the request was sent to.
        subject: String,
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// Nothing is listening on the subject.
    #[error("no responders for subject: {0}")]
    NoResponder(String),

    /// The transport failed to deliver the request or its response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BusError {
    /// Returns `true` if the failure is an elapsed deadline.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
