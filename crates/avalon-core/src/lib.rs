//! Core types for the Avalon gateway.
//!
//! This crate provides the foundational types shared by every gateway crate:
//!
//! - **Claims**: verified identity attributes and per-resource role grants
//! - **Blueprints**: kind-tagged building and resource definitions
//! - **Error types**: common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use avalon_core::Claims;
//! use chrono::Utc;
//!
//! let claims = Claims::new("player-1", "player@example.com", Utc::now())
//!     .with_access("dev.avalon.cool", ["can-build", "inventory:write"]);
//!
//! assert!(claims.has_role("dev.avalon.cool:can-build"));
//! assert!(claims.has_role("dev.avalon.cool:inventory:write"));
//! assert!(!claims.has_role("can-build"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blueprint;
pub mod claims;
pub mod error;

pub use blueprint::{
    slugify, Blueprint, BlueprintBatchRequest, BlueprintDefinition, BlueprintKind,
    BlueprintRequest, BuildingBlueprintRequest, ResourceBlueprintRequest,
};
pub use claims::{Access, Claims};
pub use error::{CoreError, Result};
