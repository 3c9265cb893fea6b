//! Prometheus exposition endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use crate::error::ApiError;
use crate::state::GatewayState;

/// `GET /metrics`
///
/// Renders the gateway collectors in the Prometheus text format.
///
/// # Errors
///
/// Returns `Internal` if the collectors cannot be encoded.
pub async fn metrics(
    State(state): State<Arc<GatewayState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (body, content_type) = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("metric encode error: {e}")))?;

    Ok(([(CONTENT_TYPE, content_type)], body))
}
