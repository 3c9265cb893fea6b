//! Request/response bridge between HTTP handlers and bus workers.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::{RequestHeader, RpcRequest, RpcResponse, Status};
use crate::error::BusError;
use crate::MessageBus;

/// Deadline applied when the caller does not choose one.
pub const DEFAULT_RPC_DEADLINE: Duration = Duration::from_secs(10);

/// Failure modes of an RPC round trip.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No response within the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The bus could not carry the request.
    #[error("{0}")]
    Transport(String),

    /// The worker answered with an `ERROR` status.
    #[error("{0}")]
    Remote(String),

    /// The response did not match the envelope format.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<BusError> for RpcError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Timeout { deadline, .. } => Self::Timeout(deadline),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Command target and duration hint for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Command target.
    #[serde(default = "default_call_name")]
    pub name: String,
    /// Duration hint.
    #[serde(default = "default_call_duration")]
    pub duration: String,
}

fn default_call_name() -> String {
    "house".to_string()
}

fn default_call_duration() -> String {
    "10s".to_string()
}

impl Default for Call {
    fn default() -> Self {
        Self {
            name: default_call_name(),
            duration: default_call_duration(),
        }
    }
}

/// Issues correlated command requests over a [`MessageBus`].
#[derive(Clone)]
pub struct RpcBridge {
    bus: Arc<dyn MessageBus>,
}

impl RpcBridge {
    /// Create a bridge over `bus`.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self { bus }
    }

    /// Send `call` to the `command` subject on behalf of `caller` and wait
    /// for the worker's reply.
    ///
    /// Returns the response payload.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` when the deadline elapses, `Transport` when the bus
    /// fails, `Remote` when the worker reports an error, and `Decode` when the
    /// reply is not a response envelope.
    pub async fn request(
        &self,
        command: &str,
        caller: &str,
        call: &Call,
        deadline: Duration,
    ) -> Result<Value, RpcError> {
        let mut context = Map::new();
        context.insert("owner".to_string(), Value::String(caller.to_string()));

        let request = RpcRequest {
            header: RequestHeader::now(),
            name: call.name.clone(),
            duration: call.duration.clone(),
            context,
        };

        let payload =
            serde_json::to_value(&request).map_err(|e| RpcError::Transport(e.to_string()))?;

        tracing::debug!(
            command = command,
            owner = caller,
            name = %call.name,
            deadline = ?deadline,
            "Sending RPC request"
        );

        let reply = self.bus.request(command, payload, deadline).await?;

        let response: RpcResponse =
            serde_json::from_value(reply).map_err(|e| RpcError::Decode(e.to_string()))?;

        match response.header.status {
            Status::Ok => Ok(response.payload),
            Status::Error => Err(RpcError::Remote(response.header.error)),
        }
    }

    /// [`request`](Self::request) with [`DEFAULT_RPC_DEADLINE`].
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn request_default(
        &self,
        command: &str,
        caller: &str,
        call: &Call,
    ) -> Result<Value, RpcError> {
        self.request(command, caller, call, DEFAULT_RPC_DEADLINE)
            .await
    }
}
