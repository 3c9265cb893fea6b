//! Message bus and RPC bridge for the Avalon gateway.
//!
//! Game commands are not executed by the gateway. They are published on a
//! message bus as request envelopes and answered by workers; the gateway
//! waits for the correlated reply up to a deadline.
//!
//! - [`MessageBus`]: request/reply transport
//! - [`LocalBus`]: in-process handlers, used for development and tests
//! - [`HttpBus`]: an HTTP bus gateway
//! - [`RpcBridge`]: builds envelopes and interprets replies
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use avalon_bus::{BusError, Call, LocalBus, RpcBridge, RpcResponse};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = LocalBus::new();
//! bus.handle("build", |_| async {
//!     Ok::<_, BusError>(serde_json::to_value(RpcResponse::ok(serde_json::Value::Null))?)
//! });
//!
//! let bridge = RpcBridge::new(Arc::new(bus));
//! bridge.request_default("build", "subject-1", &Call::default()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub mod envelope;
pub mod error;
pub mod http;
pub mod local;
pub mod rpc;

pub use envelope::{RequestHeader, ResponseHeader, RpcRequest, RpcResponse, Status};
pub use error::{BusError, Result};
pub use http::HttpBus;
pub use local::LocalBus;
pub use rpc::{Call, RpcBridge, RpcError, DEFAULT_RPC_DEADLINE};

/// Request/reply transport.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish `payload` on `subject` and wait for the reply.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if no reply arrives within `deadline`, `NoResponder`
    /// if nothing listens on `subject`, and `Transport` for delivery failures.
    async fn request(&self, subject: &str, payload: Value, deadline: Duration) -> Result<Value>;
}
