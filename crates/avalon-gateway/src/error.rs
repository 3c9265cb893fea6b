//! API error types and responses.
//!
//! Every rejection is answered with a plain-text body. Downstream failures
//! carry the downstream error text; every other variant answers with the
//! canonical reason phrase of its status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use avalon_auth::AuthError;
use avalon_bus::RpcError;
use avalon_registry::RegistryError;

use crate::ingest::DecodeError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials, or a missing role.
    #[error("unauthorized")]
    Unauthorized,

    /// The request body is in a format the endpoint does not accept.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The bus could not deliver the command or no reply arrived in time.
    #[error("{0}")]
    DownstreamTransport(String),

    /// The worker reported a failure.
    #[error("{0}")]
    DownstreamLogic(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DownstreamTransport(_) | Self::DownstreamLogic(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the response body for this error.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::DownstreamTransport(msg) | Self::DownstreamLogic(msg) => msg.clone(),
            _ => self
                .status_code()
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, self.body()).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_provider_failure() {
            tracing::error!(error = %err, "Identity provider error");
        }
        Self::Unauthorized
    }
}

impl From<RpcError> for ApiError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Remote(msg) => Self::DownstreamLogic(msg),
            other => Self::DownstreamTransport(other.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::NotFound("blueprint".to_string()),
            RegistryError::AlreadyExists { .. } => Self::Conflict(err.to_string()),
            RegistryError::Invalid(e) => Self::BadRequest(e.to_string()),
            RegistryError::Database(_) | RegistryError::Serialization(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedMediaType(media_type) => Self::UnsupportedMediaType(media_type),
            other => Self::BadRequest(other.to_string()),
        }
    }
}
