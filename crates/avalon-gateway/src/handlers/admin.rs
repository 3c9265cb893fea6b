//! Administrative endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use avalon_registry::CURRENT_VERSION;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::normalize_version;
use crate::state::GatewayState;

/// Response for a cache reload.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// Always `"OK"`.
    pub status: &'static str,
    /// Version now held in the cache.
    pub version: String,
    /// Number of blueprints loaded.
    pub count: usize,
}

/// `POST /registry/reload/:version`
///
/// Points the blueprint cache at `version` and loads it from the registry.
/// `current` reloads the version already deployed.
///
/// Requires the `cache:reload` role on the configured resource.
///
/// # Errors
///
/// Returns `Unauthorized` without the role and `Internal` if the registry
/// cannot be read. A failed reload leaves the previous version in place.
pub async fn reload(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
    Path(version): Path<String>,
) -> Result<Json<ReloadResponse>, ApiError> {
    if !user.has_role(&state.config.role("cache:reload")) {
        tracing::info!(subject = %user.subject, "Reload rejected: missing role");
        return Err(ApiError::Unauthorized);
    }

    let cache = &state.cache;
    let version = match normalize_version(&version) {
        CURRENT_VERSION => cache.version(),
        other => other.to_string(),
    };

    let count = cache
        .load(state.registry.as_ref(), &version)
        .map_err(|e| ApiError::Internal(format!("cache reload failed: {e}")))?;

    tracing::info!(
        subject = %user.subject,
        version = %version,
        count = count,
        "Blueprint cache reloaded"
    );

    Ok(Json(ReloadResponse {
        status: "OK",
        version,
        count,
    }))
}
