//! HTTP message bus.
//!
//! Requests are POSTed as JSON to `{base_url}/rpc/{subject}` on a bus
//! gateway; the response body is the worker's reply. The caller's deadline is
//! applied as the per-request timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BusError, Result};
use crate::MessageBus;

/// Message bus backed by an HTTP bus gateway.
#[derive(Debug, Clone)]
pub struct HttpBus {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBus {
    /// Create a bus talking to the gateway at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BusError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a bus with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL of the bus gateway.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_error(subject: &str, deadline: Duration, err: &reqwest::Error) -> BusError {
        if err.is_timeout() {
            BusError::Timeout {
                subject: subject.to_string(),
                deadline,
            }
        } else {
            BusError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl MessageBus for HttpBus {
    async fn request(&self, subject: &str, payload: Value, deadline: Duration) -> Result<Value> {
        let url = format!("{}/rpc/{subject}", self.base_url);
        tracing::debug!(url = %url, "Sending bus request");

        let response = self
            .client
            .post(&url)
            .timeout(deadline)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::map_error(subject, deadline, &e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BusError::NoResponder(subject.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BusError::Transport(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Self::map_error(subject, deadline, &e))
    }
}
