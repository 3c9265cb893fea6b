//! Records stored by the registry.

use avalon_core::{BuildingBlueprintRequest, ResourceBlueprintRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A building placed by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Unique identifier.
    pub id: Uuid,
    /// Subject of the owning player.
    pub owner: String,
    /// Slug of the blueprint it was built from.
    pub blueprint: String,
    /// Display name.
    pub name: String,
    /// When construction was requested.
    pub created_at: DateTime<Utc>,
}

impl Building {
    /// Create a building for `owner` from the named blueprint.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            blueprint: avalon_core::slugify(&name),
            name,
            created_at: Utc::now(),
        }
    }
}

/// Every blueprint of one version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlueprintSet {
    /// Version tag.
    pub version: String,
    /// Building blueprints, ordered by slug.
    pub buildings: Vec<BuildingBlueprintRequest>,
    /// Resource blueprints, ordered by slug.
    pub resources: Vec<ResourceBlueprintRequest>,
}

impl BlueprintSet {
    /// An empty set for `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Number of blueprints in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len() + self.resources.len()
    }

    /// Returns `true` if the set holds no blueprints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty() && self.resources.is_empty()
    }
}
