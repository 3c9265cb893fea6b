//! Key encoding utilities for `RocksDB`.
//!
//! Composite keys join their parts with a NUL separator so that every record
//! of a version (or owner) shares a scannable prefix.

use uuid::Uuid;

const SEPARATOR: u8 = 0;

fn prefixed(prefix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1);
    key.extend_from_slice(prefix.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Encode a blueprint key: `version || 0 || slug`.
#[must_use]
pub fn blueprint_key(version: &str, slug: &str) -> Vec<u8> {
    let mut key = prefixed(version);
    key.extend_from_slice(slug.as_bytes());
    key
}

/// Encode a version prefix for scanning all blueprints of a version.
#[must_use]
pub fn version_prefix(version: &str) -> Vec<u8> {
    prefixed(version)
}

/// Encode an owner-building key: `owner || 0 || building_id`.
#[must_use]
pub fn owner_building_key(owner: &str, id: &Uuid) -> Vec<u8> {
    let mut key = prefixed(owner);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Encode an owner prefix for scanning all buildings of an owner.
#[must_use]
pub fn owner_prefix(owner: &str) -> Vec<u8> {
    prefixed(owner)
}
