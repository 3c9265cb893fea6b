//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Building blueprints, keyed by `version || 0 || slug`.
    pub const BUILDING_BLUEPRINTS: &str = "building_blueprints";

    /// Resource blueprints, keyed by `version || 0 || slug`.
    pub const RESOURCE_BLUEPRINTS: &str = "resource_blueprints";

    /// Player buildings, keyed by `owner || 0 || building_id`.
    pub const BUILDINGS_BY_OWNER: &str = "buildings_by_owner";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BUILDING_BLUEPRINTS,
        cf::RESOURCE_BLUEPRINTS,
        cf::BUILDINGS_BY_OWNER,
    ]
}
