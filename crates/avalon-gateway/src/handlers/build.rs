//! Build command endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use avalon_bus::Call;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// `POST /build`
///
/// Forwards a build command for the caller to the build worker and waits
/// for its reply. The optional JSON body selects the blueprint and duration;
/// an empty body builds the default.
///
/// Requires the `can-build` or `inventory:write` role on the configured
/// resource.
///
/// # Errors
///
/// Returns `Unauthorized` without either role, `BadRequest` for an
/// unparseable body, and a downstream error if the worker fails or does not
/// answer in time.
pub async fn build(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let config = &state.config;
    if !user.has_any_role([
        config.role("can-build"),
        config.role("inventory:write"),
    ]) {
        tracing::info!(subject = %user.subject, "Build rejected: missing role");
        return Err(ApiError::Unauthorized);
    }

    let call = if body.iter().all(u8::is_ascii_whitespace) {
        Call::default()
    } else {
        serde_json::from_slice::<Call>(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid build request: {e}")))?
    };

    state
        .rpc
        .request(
            &config.build_subject,
            &user.subject,
            &call,
            config.rpc_deadline(),
        )
        .await?;

    tracing::info!(subject = %user.subject, name = %call.name, "Build dispatched");

    Ok((StatusCode::OK, "OK"))
}
