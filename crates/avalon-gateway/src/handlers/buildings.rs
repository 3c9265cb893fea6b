//! Player building endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use avalon_registry::Building;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for listing buildings.
#[derive(Debug, Serialize)]
pub struct ListBuildingsResponse {
    /// Number of buildings.
    pub count: usize,
    /// The caller's buildings, oldest first.
    pub buildings: Vec<Building>,
}

/// `GET /buildings`
///
/// Lists the buildings owned by the caller.
///
/// # Errors
///
/// Returns `Internal` if the store cannot be read.
pub async fn list_buildings(
    State(state): State<Arc<GatewayState>>,
    user: AuthUser,
) -> Result<Json<ListBuildingsResponse>, ApiError> {
    let buildings = state.buildings.list_buildings_by_owner(&user.subject)?;

    Ok(Json(ListBuildingsResponse {
        count: buildings.len(),
        buildings,
    }))
}
