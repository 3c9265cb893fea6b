//! In-memory registry.
//!
//! Useful for tests and for running the gateway without a data directory.

use std::collections::BTreeMap;

use avalon_core::{Blueprint, BuildingBlueprintRequest, ResourceBlueprintRequest};
use parking_lot::RwLock;

use crate::error::{RegistryError, Result};
use crate::types::{BlueprintSet, Building};
use crate::{BuildingStore, Registry};

type Table<T> = BTreeMap<(String, String), T>;

/// Registry backed by ordered maps.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    buildings: RwLock<Table<BuildingBlueprintRequest>>,
    resources: RwLock<Table<ResourceBlueprintRequest>>,
    placed: RwLock<Vec<Building>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert<T: Blueprint + Clone>(
    table: &RwLock<Table<T>>,
    blueprint: &T,
    force: bool,
) -> Result<()> {
    blueprint.validate()?;

    let slug = blueprint.slug();
    let key = (blueprint.version().to_string(), slug);

    let mut table = table.write();
    if !force && table.contains_key(&key) {
        let (version, slug) = key;
        return Err(RegistryError::AlreadyExists {
            kind: T::KIND,
            version,
            slug,
        });
    }
    table.insert(key, blueprint.clone());
    Ok(())
}

fn lookup<T: Clone>(table: &RwLock<Table<T>>, version: &str, slug: &str) -> Option<T> {
    table
        .read()
        .get(&(version.to_string(), slug.to_string()))
        .cloned()
}

fn in_version<T: Clone>(table: &RwLock<Table<T>>, version: &str) -> Vec<T> {
    table
        .read()
        .iter()
        .filter(|((v, _), _)| v.as_str() == version)
        .map(|(_, bp)| bp.clone())
        .collect()
}

impl Registry for MemoryRegistry {
    fn save_building(&self, blueprint: &BuildingBlueprintRequest, force: bool) -> Result<()> {
        insert(&self.buildings, blueprint, force)
    }

    fn save_resource(&self, blueprint: &ResourceBlueprintRequest, force: bool) -> Result<()> {
        insert(&self.resources, blueprint, force)
    }

    fn get_building(&self, version: &str, slug: &str) -> Result<Option<BuildingBlueprintRequest>> {
        Ok(lookup(&self.buildings, version, slug))
    }

    fn get_resource(&self, version: &str, slug: &str) -> Result<Option<ResourceBlueprintRequest>> {
        Ok(lookup(&self.resources, version, slug))
    }

    fn list_version(&self, version: &str) -> Result<BlueprintSet> {
        Ok(BlueprintSet {
            version: version.to_string(),
            buildings: in_version(&self.buildings, version),
            resources: in_version(&self.resources, version),
        })
    }
}

impl BuildingStore for MemoryRegistry {
    fn put_building(&self, building: &Building) -> Result<()> {
        let mut placed = self.placed.write();
        match placed.iter_mut().find(|b| b.id == building.id) {
            Some(existing) => existing.clone_from(building),
            None => placed.push(building.clone()),
        }
        Ok(())
    }

    fn list_buildings_by_owner(&self, owner: &str) -> Result<Vec<Building>> {
        Ok(self
            .placed
            .read()
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect())
    }
}
