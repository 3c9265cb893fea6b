//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use avalon_auth::TokenVerifier;
use avalon_bus::RpcBridge;
use avalon_registry::{BlueprintCache, BuildingStore, Registry};

use crate::config::GatewayConfig;
use crate::metrics::GatewayMetrics;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Verifies bearer tokens.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Request/response bridge to bus workers.
    pub rpc: RpcBridge,
    /// Versioned blueprint storage.
    pub registry: Arc<dyn Registry>,
    /// Player building storage.
    pub buildings: Arc<dyn BuildingStore>,
    /// Deployed blueprint version.
    pub cache: Arc<BlueprintCache>,
    /// HTTP request metrics.
    pub metrics: Arc<GatewayMetrics>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl GatewayState {
    /// Create a new gateway state.
    ///
    /// The blueprint cache targets `config.blueprint_version` and starts
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric collectors cannot be registered.
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        rpc: RpcBridge,
        registry: Arc<dyn Registry>,
        buildings: Arc<dyn BuildingStore>,
        config: GatewayConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            verifier,
            rpc,
            registry,
            buildings,
            cache: Arc::new(BlueprintCache::new(config.blueprint_version.clone())),
            metrics: Arc::new(GatewayMetrics::new()?),
            config,
        })
    }
}
