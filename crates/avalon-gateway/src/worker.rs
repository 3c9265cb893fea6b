//! In-process build worker.
//!
//! When no external bus is configured the gateway answers its own build
//! commands: each request places a building for the calling player.

use std::sync::Arc;

use serde_json::json;

use avalon_bus::{BusError, LocalBus, RpcRequest, RpcResponse};
use avalon_registry::{Building, BuildingStore};

/// Register the build worker for `subject` on `bus`.
pub fn register_build_worker(bus: &LocalBus, subject: &str, store: Arc<dyn BuildingStore>) {
    bus.handle(subject, move |payload| {
        let store = Arc::clone(&store);
        async move {
            let request: RpcRequest = serde_json::from_value(payload)?;
            let response = place_building(store.as_ref(), &request);
            Ok::<_, BusError>(serde_json::to_value(response)?)
        }
    });

    tracing::info!(subject = subject, "Registered local build worker");
}

fn place_building(store: &dyn BuildingStore, request: &RpcRequest) -> RpcResponse {
    let Some(owner) = request.owner() else {
        return RpcResponse::error("missing owner");
    };

    let building = Building::new(owner, &request.name);
    if let Err(e) = store.put_building(&building) {
        tracing::error!(error = %e, owner = owner, "Failed to place building");
        return RpcResponse::error(e.to_string());
    }

    tracing::debug!(
        id = %building.id,
        owner = owner,
        blueprint = %building.blueprint,
        duration = %request.duration,
        "Placed building"
    );

    RpcResponse::ok(json!({ "id": building.id, "blueprint": building.blueprint }))
}
