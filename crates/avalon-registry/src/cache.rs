//! In-memory cache of the deployed blueprint version.
//!
//! Reads of the deployed version are served from here instead of the
//! registry. The cache is filled by [`BlueprintCache::load`] and swapped in
//! one step, so readers never observe a half-loaded version.

use std::collections::HashMap;

use avalon_core::{
    Blueprint, BlueprintDefinition, BlueprintKind, BuildingBlueprintRequest,
    ResourceBlueprintRequest,
};
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::types::BlueprintSet;
use crate::Registry;

/// Alias accepted for the deployed version.
pub const CURRENT_VERSION: &str = "current";

#[derive(Debug, Default)]
struct Loaded {
    version: String,
    buildings: HashMap<String, BuildingBlueprintRequest>,
    resources: HashMap<String, ResourceBlueprintRequest>,
}

/// A cache for the blueprints of one version.
///
/// The version tag and its contents live behind one lock, so a reader
/// always sees a version together with the blueprints loaded for it.
#[derive(Debug, Default)]
pub struct BlueprintCache {
    loaded: RwLock<Loaded>,
    // Serializes loads so overlapping reloads apply in call order.
    load_lock: Mutex<()>,
}

impl BlueprintCache {
    /// Create an empty cache for `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            loaded: RwLock::new(Loaded {
                version: version.into(),
                ..Loaded::default()
            }),
            load_lock: Mutex::new(()),
        }
    }

    /// The version the cache holds.
    #[must_use]
    pub fn version(&self) -> String {
        self.loaded.read().version.clone()
    }

    /// Returns `true` if `version` names the cached version.
    #[must_use]
    pub fn is_current(&self, version: &str) -> bool {
        version == CURRENT_VERSION || version == self.loaded.read().version
    }

    /// Load `version` from `registry`, replacing the cached version and
    /// contents in one step.
    ///
    /// Returns the number of blueprints loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read; the previous version
    /// and contents stay in place.
    pub fn load(&self, registry: &dyn Registry, version: &str) -> Result<usize> {
        let _guard = self.load_lock.lock();

        let set = registry.list_version(version)?;
        let count = set.len();

        let loaded = Loaded {
            version: version.to_string(),
            buildings: set.buildings.into_iter().map(|b| (b.slug(), b)).collect(),
            resources: set.resources.into_iter().map(|r| (r.slug(), r)).collect(),
        };

        *self.loaded.write() = loaded;

        tracing::info!(version = %version, count = count, "Loaded blueprint cache");
        Ok(count)
    }

    /// Reload the cached version from `registry`.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn refresh(&self, registry: &dyn Registry) -> Result<usize> {
        let version = self.version();
        self.load(registry, &version)
    }

    /// Get a cached building blueprint.
    #[must_use]
    pub fn get_building(&self, slug: &str) -> Option<BuildingBlueprintRequest> {
        self.loaded.read().buildings.get(slug).cloned()
    }

    /// Get a cached resource blueprint.
    #[must_use]
    pub fn get_resource(&self, slug: &str) -> Option<ResourceBlueprintRequest> {
        self.loaded.read().resources.get(slug).cloned()
    }

    /// Get a cached blueprint by kind.
    #[must_use]
    pub fn get(&self, kind: BlueprintKind, slug: &str) -> Option<BlueprintDefinition> {
        match kind {
            BlueprintKind::Building => self.get_building(slug).map(BlueprintDefinition::Building),
            BlueprintKind::Resource => self.get_resource(slug).map(BlueprintDefinition::Resource),
        }
    }

    /// Copy out every cached blueprint, ordered by slug.
    #[must_use]
    pub fn snapshot(&self) -> BlueprintSet {
        let loaded = self.loaded.read();

        let mut buildings: Vec<_> = loaded.buildings.values().cloned().collect();
        buildings.sort_by_key(Blueprint::slug);
        let mut resources: Vec<_> = loaded.resources.values().cloned().collect();
        resources.sort_by_key(Blueprint::slug);

        BlueprintSet {
            version: loaded.version.clone(),
            buildings,
            resources,
        }
    }

    /// Number of cached blueprints.
    #[must_use]
    pub fn len(&self) -> usize {
        let loaded = self.loaded.read();
        loaded.buildings.len() + loaded.resources.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
