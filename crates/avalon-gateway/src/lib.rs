//! HTTP gateway for the Avalon game back-end.
//!
//! This crate provides the public-facing API of the game. It handles:
//!
//! - Bearer token authentication against an OIDC provider
//! - Role checks on the verified claims
//! - Blueprint ingestion from JSON or YAML, with a cache of the deployed version
//! - Command dispatch to back-end workers over a message bus
//! - Prometheus request metrics
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │                         (HTTP)                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     avalon-gateway                          │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │    Auth     │ │   Router    │ │     Blueprint       │    │
//! │  │ Middleware  │ │  + Handlers │ │     Ingestion       │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │   OIDC   │   │ Registry │   │   Bus    │
//!        │ Provider │   │ (Rocks)  │   │ Workers  │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use avalon_auth::{AuthConfig, OidcVerifier};
//! use avalon_bus::{LocalBus, RpcBridge};
//! use avalon_gateway::{create_router, GatewayConfig, GatewayState};
//! use avalon_registry::RocksRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let verifier = Arc::new(OidcVerifier::discover(AuthConfig::default()).await?);
//! let registry = Arc::new(RocksRegistry::open("/tmp/avalon")?);
//! let rpc = RpcBridge::new(Arc::new(LocalBus::new()));
//!
//! let state = GatewayState::new(
//!     verifier,
//!     rpc,
//!     registry.clone(),
//!     registry,
//!     GatewayConfig::default(),
//! )?;
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod worker;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use metrics::GatewayMetrics;
pub use routes::create_router;
pub use state::GatewayState;

// Re-export key types for convenience
pub use auth::AuthUser;
pub use ingest::DecodeError;
