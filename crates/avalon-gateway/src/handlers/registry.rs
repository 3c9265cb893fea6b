//! Blueprint registry endpoints.
//!
//! Submissions are decoded from JSON or YAML according to `Content-Type`.
//! Reads of the deployed version are answered from the blueprint cache;
//! every other version is read from the registry.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use avalon_core::{BlueprintDefinition, BlueprintKind};
use avalon_registry::BlueprintSet;

use crate::error::ApiError;
use crate::handlers::normalize_version;
use crate::ingest;
use crate::state::GatewayState;

/// Acknowledgement for a stored submission.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// Always `"OK"`.
    pub status: &'static str,
    /// Number of blueprints stored.
    pub count: usize,
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// `POST /registry/blueprint`
///
/// Stores a single kind-tagged blueprint.
///
/// # Errors
///
/// Returns `UnsupportedMediaType` for a body that is neither JSON nor YAML,
/// `BadRequest` for a missing or unknown kind or a malformed body, and
/// `Conflict` if the blueprint exists and `force` is not set.
pub async fn add_blueprint(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let request = ingest::decode_blueprint(content_type(&headers), &body)?;
    ingest::save_blueprint(state.registry.as_ref(), &request)?;

    Ok(Json(SaveResponse {
        status: "OK",
        count: 1,
    }))
}

/// `POST /registry/blueprints`
///
/// Stores a batch of blueprints sharing a version. The batch stops at the
/// first failing item; items stored before it are kept.
///
/// # Errors
///
/// As [`add_blueprint`], plus `BadRequest` if the batch names no version.
pub async fn add_blueprints(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let batch = ingest::decode_batch(content_type(&headers), &body)?;
    let count = ingest::save_batch(state.registry.as_ref(), &batch)?;

    Ok(Json(SaveResponse {
        status: "OK",
        count,
    }))
}

/// `GET /registry/blueprint/:version/:kind/:slug`
///
/// # Errors
///
/// Returns `BadRequest` for an unknown kind and `NotFound` if no such
/// blueprint exists.
pub async fn get_blueprint(
    State(state): State<Arc<GatewayState>>,
    Path((version, kind, slug)): Path<(String, String, String)>,
) -> Result<Json<BlueprintDefinition>, ApiError> {
    let version = normalize_version(&version);
    let kind: BlueprintKind = kind
        .parse()
        .map_err(|e: avalon_core::CoreError| ApiError::BadRequest(e.to_string()))?;

    let definition = if state.cache.is_current(version) {
        state.cache.get(kind, &slug)
    } else {
        state.registry.get(kind, version, &slug)?
    };

    definition
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{kind} {version}/{slug}")))
}

/// `GET /registry/blueprint/:version`
///
/// Lists every blueprint of a version.
///
/// # Errors
///
/// Returns `NotFound` if the version holds no blueprints.
pub async fn get_blueprints(
    State(state): State<Arc<GatewayState>>,
    Path(version): Path<String>,
) -> Result<Json<BlueprintSet>, ApiError> {
    let version = normalize_version(&version);

    let set = if state.cache.is_current(version) {
        state.cache.snapshot()
    } else {
        state.registry.list_version(version)?
    };

    if set.is_empty() {
        return Err(ApiError::NotFound(format!("version {version}")));
    }

    Ok(Json(set))
}
