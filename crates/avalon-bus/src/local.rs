//! In-process message bus.
//!
//! Requests are correlated with their responses by a UUID. Each request gets
//! a pending `oneshot` slot; a dispatcher task runs the subject's handler and
//! routes the result back through the slot. When the caller's deadline fires
//! the slot is dropped and a response arriving afterwards is discarded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{BusError, Result};
use crate::MessageBus;

/// A subject handler.
pub type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

type PendingMap = HashMap<Uuid, oneshot::Sender<Result<Value>>>;

/// A message bus that dispatches requests to handlers in the same process.
#[derive(Default)]
pub struct LocalBus {
    handlers: RwLock<HashMap<String, Handler>>,
    pending: Arc<Mutex<PendingMap>>,
}

impl LocalBus {
    /// Create a bus with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `subject`, replacing any previous one.
    pub fn handle<F, Fut>(&self, subject: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |payload| handler(payload).boxed());
        self.handlers.write().insert(subject.into(), handler);
    }

    /// Returns `true` if a handler is registered for `subject`.
    #[must_use]
    pub fn has_handler(&self, subject: &str) -> bool {
        self.handlers.read().contains_key(subject)
    }

    /// Number of requests still waiting for a response.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn dispatch(&self, id: Uuid, subject: String, handler: &Handler, payload: Value) {
        let pending = Arc::clone(&self.pending);
        let work = handler(payload);

        tokio::spawn(async move {
            let result = work.await;

            let slot = pending.lock().remove(&id);
            match slot {
                Some(tx) => {
                    if tx.send(result).is_err() {
                        tracing::debug!(
                            %id,
                            subject = %subject,
                            "Requester went away, dropping response"
                        );
                    }
                }
                None => {
                    tracing::debug!(%id, subject = %subject, "Discarding late response");
                }
            }
        });
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn request(&self, subject: &str, payload: Value, deadline: Duration) -> Result<Value> {
        let handler = self
            .handlers
            .read()
            .get(subject)
            .cloned()
            .ok_or_else(|| BusError::NoResponder(subject.to_string()))?;

        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        tracing::debug!(%id, subject = subject, "Dispatching request");
        self.dispatch(id, subject.to_string(), &handler, payload);

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BusError::Transport("response channel closed".to_string())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(BusError::Timeout {
                    subject: subject.to_string(),
                    deadline,
                })
            }
        }
    }
}
