//! Blueprint registry and building storage for the Avalon gateway.
//!
//! This crate persists versioned blueprint definitions and player buildings,
//! and keeps the blueprints of the deployed version in memory.
//!
//! # Architecture
//!
//! `RocksDB` storage uses the following column families:
//!
//! - `building_blueprints`: building definitions, keyed by `version || slug`
//! - `resource_blueprints`: resource definitions, keyed by `version || slug`
//! - `buildings_by_owner`: player buildings, keyed by `owner || building_id`
//!
//! [`BlueprintCache`] holds one version loaded from any [`Registry`].
//!
//! # Example
//!
//! ```no_run
//! use avalon_core::BuildingBlueprintRequest;
//! use avalon_registry::{BlueprintCache, Registry, RocksRegistry};
//!
//! let registry = RocksRegistry::open("/tmp/avalon-db").unwrap();
//! registry
//!     .save_building(&BuildingBlueprintRequest::new("house").with_version("1"), false)
//!     .unwrap();
//!
//! let cache = BlueprintCache::new("1");
//! cache.refresh(&registry).unwrap();
//! assert!(cache.get_building("house").is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod schema;
pub mod types;

pub use cache::{BlueprintCache, CURRENT_VERSION};
pub use error::{RegistryError, Result};
pub use memory::MemoryRegistry;
pub use rocks::RocksRegistry;
pub use types::{BlueprintSet, Building};

use avalon_core::{
    BlueprintDefinition, BlueprintKind, BuildingBlueprintRequest, ResourceBlueprintRequest,
};

/// Versioned blueprint storage.
///
/// Blueprints are addressed by `(kind, version, slug)`. A save over an
/// existing address fails with `AlreadyExists` unless forced.
pub trait Registry: Send + Sync {
    /// Store a building blueprint under its own version.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the address is taken and `force` is false,
    /// `Invalid` if the definition has no name, or a storage error.
    fn save_building(&self, blueprint: &BuildingBlueprintRequest, force: bool) -> Result<()>;

    /// Store a resource blueprint under its own version.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the address is taken and `force` is false,
    /// `Invalid` if the definition has no name, or a storage error.
    fn save_resource(&self, blueprint: &ResourceBlueprintRequest, force: bool) -> Result<()>;

    /// Get a building blueprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get_building(&self, version: &str, slug: &str) -> Result<Option<BuildingBlueprintRequest>>;

    /// Get a resource blueprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get_resource(&self, version: &str, slug: &str) -> Result<Option<ResourceBlueprintRequest>>;

    /// List every blueprint of a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn list_version(&self, version: &str) -> Result<BlueprintSet>;

    /// Store a kind-tagged definition.
    ///
    /// # Errors
    ///
    /// See [`save_building`](Self::save_building).
    fn save(&self, definition: &BlueprintDefinition, force: bool) -> Result<()> {
        match definition {
            BlueprintDefinition::Building(b) => self.save_building(b, force),
            BlueprintDefinition::Resource(r) => self.save_resource(r, force),
        }
    }

    /// Get a blueprint by kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get(
        &self,
        kind: BlueprintKind,
        version: &str,
        slug: &str,
    ) -> Result<Option<BlueprintDefinition>> {
        Ok(match kind {
            BlueprintKind::Building => self
                .get_building(version, slug)?
                .map(BlueprintDefinition::Building),
            BlueprintKind::Resource => self
                .get_resource(version, slug)?
                .map(BlueprintDefinition::Resource),
        })
    }
}

/// Storage for player buildings.
pub trait BuildingStore: Send + Sync {
    /// Insert or update a building.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn put_building(&self, building: &Building) -> Result<()>;

    /// List the buildings owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn list_buildings_by_owner(&self, owner: &str) -> Result<Vec<Building>>;
}
