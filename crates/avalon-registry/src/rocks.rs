//! `RocksDB` storage implementation.
//!
//! This module provides `RocksRegistry`, which implements both [`Registry`]
//! and [`BuildingStore`].

use std::path::Path;
use std::sync::Arc;

use avalon_core::{Blueprint, BuildingBlueprintRequest, ResourceBlueprintRequest};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RegistryError, Result};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{BlueprintSet, Building};
use crate::{BuildingStore, Registry};

/// RocksDB-backed registry.
pub struct RocksRegistry {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    // Serializes the exists-check and the write of a blueprint save.
    write_lock: Mutex<()>,
}

impl RocksRegistry {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| RegistryError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| RegistryError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    fn put_blueprint<T: Blueprint + Serialize>(
        &self,
        cf_name: &str,
        blueprint: &T,
        force: bool,
    ) -> Result<()> {
        blueprint.validate()?;

        let cf = self.cf(cf_name)?;
        let slug = blueprint.slug();
        let key = keys::blueprint_key(blueprint.version(), &slug);
        let value = Self::serialize(blueprint)?;

        let _guard = self.write_lock.lock();

        if !force {
            let existing = self
                .db
                .get_pinned_cf(&cf, &key)
                .map_err(|e| RegistryError::Database(e.to_string()))?;
            if existing.is_some() {
                return Err(RegistryError::AlreadyExists {
                    kind: T::KIND,
                    version: blueprint.version().to_string(),
                    slug,
                });
            }
        }

        self.db
            .put_cf(&cf, &key, &value)
            .map_err(|e| RegistryError::Database(e.to_string()))?;

        tracing::debug!(
            kind = %T::KIND,
            version = blueprint.version(),
            slug = %slug,
            "Stored blueprint"
        );

        Ok(())
    }

    fn get_blueprint<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        version: &str,
        slug: &str,
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let key = keys::blueprint_key(version, slug);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| RegistryError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect every value under `prefix` in a column family.
    fn scan_prefix<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;

        let mut values = Vec::new();
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, value) = item.map_err(|e| RegistryError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }

            values.push(Self::deserialize(&value)?);
        }

        Ok(values)
    }
}

impl Registry for RocksRegistry {
    fn save_building(&self, blueprint: &BuildingBlueprintRequest, force: bool) -> Result<()> {
        self.put_blueprint(cf::BUILDING_BLUEPRINTS, blueprint, force)
    }

    fn save_resource(&self, blueprint: &ResourceBlueprintRequest, force: bool) -> Result<()> {
        self.put_blueprint(cf::RESOURCE_BLUEPRINTS, blueprint, force)
    }

    fn get_building(&self, version: &str, slug: &str) -> Result<Option<BuildingBlueprintRequest>> {
        self.get_blueprint(cf::BUILDING_BLUEPRINTS, version, slug)
    }

    fn get_resource(&self, version: &str, slug: &str) -> Result<Option<ResourceBlueprintRequest>> {
        self.get_blueprint(cf::RESOURCE_BLUEPRINTS, version, slug)
    }

    fn list_version(&self, version: &str) -> Result<BlueprintSet> {
        let prefix = keys::version_prefix(version);

        Ok(BlueprintSet {
            version: version.to_string(),
            buildings: self.scan_prefix(cf::BUILDING_BLUEPRINTS, &prefix)?,
            resources: self.scan_prefix(cf::RESOURCE_BLUEPRINTS, &prefix)?,
        })
    }
}

impl BuildingStore for RocksRegistry {
    fn put_building(&self, building: &Building) -> Result<()> {
        let cf = self.cf(cf::BUILDINGS_BY_OWNER)?;
        let key = keys::owner_building_key(&building.owner, &building.id);
        let value = Self::serialize(building)?;

        self.db
            .put_cf(&cf, &key, &value)
            .map_err(|e| RegistryError::Database(e.to_string()))
    }

    fn list_buildings_by_owner(&self, owner: &str) -> Result<Vec<Building>> {
        let mut buildings: Vec<Building> =
            self.scan_prefix(cf::BUILDINGS_BY_OWNER, &keys::owner_prefix(owner))?;
        buildings.sort_by_key(|b| b.created_at);
        Ok(buildings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_registry() -> (RocksRegistry, TempDir) {
        let dir = TempDir::new().unwrap();
        let registry = RocksRegistry::open(dir.path()).unwrap();
        (registry, dir)
    }

    fn house(version: &str) -> BuildingBlueprintRequest {
        let mut bp = BuildingBlueprintRequest::new("House").with_version(version);
        bp.attributes
            .insert("cost".to_string(), json!([{ "resource": "wood", "amount": 5 }]));
        bp
    }

    #[test]
    fn blueprint_crud() {
        let (registry, _dir) = create_test_registry();

        registry.save_building(&house("1"), false).unwrap();

        let stored = registry.get_building("1", "house").unwrap().unwrap();
        assert_eq!(stored, house("1"));

        assert!(registry.get_building("2", "house").unwrap().is_none());
        assert!(registry.get_resource("1", "house").unwrap().is_none());
    }

    #[test]
    fn save_without_force_conflicts() {
        let (registry, _dir) = create_test_registry();

        registry.save_building(&house("1"), false).unwrap();

        let err = registry.save_building(&house("1"), false).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::AlreadyExists { ref slug, ref version, .. }
                if slug == "house" && version == "1"
        ));

        let mut updated = house("1");
        updated.attributes.insert("build_time".to_string(), json!("20s"));
        registry.save_building(&updated, true).unwrap();

        let stored = registry.get_building("1", "house").unwrap().unwrap();
        assert_eq!(stored.attributes["build_time"], "20s");
    }

    #[test]
    fn blank_name_is_rejected() {
        let (registry, _dir) = create_test_registry();

        let err = registry
            .save_resource(&ResourceBlueprintRequest::new(" "), false)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Invalid(_)));
    }

    #[test]
    fn list_version_is_scoped() {
        let (registry, _dir) = create_test_registry();

        registry.save_building(&house("1"), false).unwrap();
        registry
            .save_resource(&ResourceBlueprintRequest::new("Wood").with_version("1"), false)
            .unwrap();
        registry
            .save_resource(&ResourceBlueprintRequest::new("Stone").with_version("1"), false)
            .unwrap();
        registry.save_building(&house("10"), false).unwrap();

        let set = registry.list_version("1").unwrap();
        assert_eq!(set.version, "1");
        assert_eq!(set.buildings.len(), 1);
        assert_eq!(set.resources.len(), 2);
        // Ordered by slug.
        assert_eq!(set.resources[0].name, "Stone");

        assert_eq!(registry.list_version("10").unwrap().len(), 1);
        assert!(registry.list_version("2").unwrap().is_empty());
    }

    #[test]
    fn buildings_by_owner() {
        let (registry, _dir) = create_test_registry();

        registry.put_building(&Building::new("owner-1", "house")).unwrap();
        registry.put_building(&Building::new("owner-1", "farm")).unwrap();
        registry.put_building(&Building::new("owner-10", "house")).unwrap();

        let owned = registry.list_buildings_by_owner("owner-1").unwrap();
        assert_eq!(owned.len(), 2);
        assert!(owned.iter().all(|b| b.owner == "owner-1"));

        assert_eq!(registry.list_buildings_by_owner("owner-10").unwrap().len(), 1);
        assert!(registry.list_buildings_by_owner("owner-2").unwrap().is_empty());
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();

        {
            let registry = RocksRegistry::open(dir.path()).unwrap();
            registry.save_building(&house("1"), false).unwrap();
        }

        let registry = RocksRegistry::open(dir.path()).unwrap();
        assert!(registry.get_building("1", "house").unwrap().is_some());
    }
}
