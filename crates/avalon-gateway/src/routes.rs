//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::authenticate;
use crate::handlers::{admin, build, buildings, health, metrics, registry};
use crate::metrics::track_metrics;
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /metrics` - Prometheus metrics
/// - `POST /registry/blueprint` - Submit one blueprint
/// - `POST /registry/blueprints` - Submit a batch of blueprints
/// - `GET /registry/blueprint/:version` - All blueprints of a version
/// - `GET /registry/blueprint/:version/:kind/:slug` - One blueprint
///
/// ## Authenticated
/// - `POST /build` - Build command (`can-build` or `inventory:write`)
/// - `GET /buildings` - The caller's buildings
/// - `POST /registry/reload/:version` - Reload the blueprint cache (`cache:reload`)
pub fn create_router(state: GatewayState) -> Router {
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    let protected = Router::new()
        .route("/build", post(build::build))
        .route("/buildings", get(buildings::list_buildings))
        .route("/registry/reload/:version", post(admin::reload))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            authenticate,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .route("/registry/blueprint", post(registry::add_blueprint))
        .route("/registry/blueprints", post(registry::add_blueprints))
        .route("/registry/blueprint/:version", get(registry::get_blueprints))
        .route(
            "/registry/blueprint/:version/:kind/:slug",
            get(registry::get_blueprint),
        )
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            track_metrics,
        ))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
