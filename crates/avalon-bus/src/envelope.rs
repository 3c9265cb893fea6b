//! Wire envelopes exchanged with bus workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Distributed trace identifier; empty when tracing is not propagated.
    #[serde(default)]
    pub trace_id: String,
    /// When the request was issued.
    pub timestamp: DateTime<Utc>,
}

impl RequestHeader {
    /// A header stamped with the current time and no trace.
    #[must_use]
    pub fn now() -> Self {
        Self {
            trace_id: String::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome reported by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The command succeeded.
    Ok,
    /// The command failed; see [`ResponseHeader::error`].
    Error,
}

/// Metadata attached to every response.
///
/// `status` is required: a reply that does not state its outcome is not a
/// response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Command outcome.
    pub status: Status,
    /// Worker error text when `status` is `ERROR`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// A command request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Request metadata.
    pub header: RequestHeader,
    /// Command target (e.g. the blueprint to build).
    pub name: String,
    /// Duration hint for the worker.
    #[serde(default)]
    pub duration: String,
    /// Caller context; carries at least `owner`.
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl RpcRequest {
    /// The `owner` entry of the context, if present.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.context.get("owner").and_then(Value::as_str)
    }
}

/// A command response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Response metadata.
    pub header: ResponseHeader,
    /// Command-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl RpcResponse {
    /// A successful response carrying `payload`.
    #[must_use]
    pub fn ok(payload: Value) -> Self {
        Self {
            header: ResponseHeader {
                status: Status::Ok,
                error: String::new(),
            },
            payload,
        }
    }

    /// A failed response carrying the worker's error text.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            header: ResponseHeader {
                status: Status::Error,
                error: message.into(),
            },
            payload: Value::Null,
        }
    }
}
