//! Blueprint definitions.
//!
//! A blueprint is a versioned template for a game-world entity. The gateway
//! only relies on a blueprint's name, slug and version; every other field is
//! carried through verbatim in `attributes`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Discriminator for the two blueprint families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlueprintKind {
    /// A building template.
    Building,
    /// A resource template.
    Resource,
}

impl BlueprintKind {
    /// The wire tag for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for BlueprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlueprintKind {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "building" => Ok(Self::Building),
            "resource" => Ok(Self::Resource),
            other => Err(CoreError::InvalidKind(other.to_string())),
        }
    }
}

/// Shared accessors for blueprint definitions.
pub trait Blueprint {
    /// The kind this definition belongs to.
    const KIND: BlueprintKind;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Version tag; empty when unversioned.
    fn version(&self) -> &str;

    /// Overwrite the version tag.
    fn set_version(&mut self, version: &str);

    /// Explicit slug, if the definition carries one.
    fn explicit_slug(&self) -> Option<&str>;

    /// Lookup key: the explicit slug or one derived from the name.
    fn slug(&self) -> String {
        self.explicit_slug()
            .map_or_else(|| slugify(self.name()), ToString::to_string)
    }

    /// Check the definition can be stored.
    ///
    /// # Errors
    ///
    /// Returns `MissingName` if the name is blank.
    fn validate(&self) -> Result<()> {
        if self.name().trim().is_empty() {
            return Err(CoreError::MissingName);
        }
        Ok(())
    }
}

macro_rules! blueprint_request {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Human-readable name.
            pub name: String,
            /// Version tag; empty when unversioned.
            #[serde(default)]
            pub version: String,
            /// Explicit lookup key.
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub slug: Option<String>,
            /// Remaining schema fields, opaque to the gateway.
            #[serde(flatten)]
            pub attributes: Map<String, Value>,
        }

        impl $name {
            /// Create a definition with only a name.
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    name: name.into(),
                    version: String::new(),
                    slug: None,
                    attributes: Map::new(),
                }
            }

            /// Builder-style version setter.
            #[must_use]
            pub fn with_version(mut self, version: impl Into<String>) -> Self {
                self.version = version.into();
                self
            }
        }

        impl Blueprint for $name {
            const KIND: BlueprintKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn version(&self) -> &str {
                &self.version
            }

            fn set_version(&mut self, version: &str) {
                version.clone_into(&mut self.version);
            }

            fn explicit_slug(&self) -> Option<&str> {
                self.slug.as_deref().filter(|s| !s.is_empty())
            }
        }
    };
}

blueprint_request!(
    /// Definition of a building template.
    BuildingBlueprintRequest,
    BlueprintKind::Building
);

blueprint_request!(
    /// Definition of a resource template.
    ResourceBlueprintRequest,
    BlueprintKind::Resource
);

/// A decoded blueprint definition, tagged by kind.
///
/// Serializes as the bare definition; the kind travels out of band.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlueprintDefinition {
    /// Building definition.
    Building(BuildingBlueprintRequest),
    /// Resource definition.
    Resource(ResourceBlueprintRequest),
}

impl BlueprintDefinition {
    /// The kind tag matching the variant.
    #[must_use]
    pub const fn kind(&self) -> BlueprintKind {
        match self {
            Self::Building(_) => BlueprintKind::Building,
            Self::Resource(_) => BlueprintKind::Resource,
        }
    }

    /// Name of the wrapped definition.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Building(b) => b.name(),
            Self::Resource(r) => r.name(),
        }
    }

    /// Version of the wrapped definition.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Building(b) => b.version(),
            Self::Resource(r) => r.version(),
        }
    }

    /// Slug of the wrapped definition.
    #[must_use]
    pub fn slug(&self) -> String {
        match self {
            Self::Building(b) => b.slug(),
            Self::Resource(r) => r.slug(),
        }
    }

    /// Check the wrapped definition can be stored.
    ///
    /// # Errors
    ///
    /// Returns `MissingName` if the name is blank.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Building(b) => b.validate(),
            Self::Resource(r) => r.validate(),
        }
    }

    /// Stamp a version into the wrapped definition.
    pub fn set_version(&mut self, version: &str) {
        match self {
            Self::Building(b) => b.set_version(version),
            Self::Resource(r) => r.set_version(version),
        }
    }
}

/// A single-blueprint ingestion request.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintRequest {
    /// Version named by the request envelope; empty when absent.
    pub version: String,
    /// Overwrite an existing definition.
    pub force: bool,
    /// The kind-tagged definition.
    pub definition: BlueprintDefinition,
}

impl BlueprintRequest {
    /// Kind of the carried definition.
    #[must_use]
    pub const fn kind(&self) -> BlueprintKind {
        self.definition.kind()
    }
}

/// A batch of building and resource definitions sharing a version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlueprintBatchRequest {
    /// Target version for every item.
    #[serde(default)]
    pub version: String,
    /// Overwrite existing definitions.
    #[serde(default)]
    pub force: bool,
    /// Building definitions, saved first.
    #[serde(default)]
    pub buildings: Vec<BuildingBlueprintRequest>,
    /// Resource definitions, saved after the buildings.
    #[serde(default)]
    pub resources: Vec<ResourceBlueprintRequest>,
}

impl BlueprintBatchRequest {
    /// Number of definitions in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len() + self.resources.len()
    }

    /// Returns `true` if the batch carries no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty() && self.resources.is_empty()
    }
}

/// Derive a lookup slug from a display name.
///
/// Lowercases ASCII, turns whitespace and underscores into `-`, drops other
/// punctuation, and collapses repeated separators.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_matches('-').to_string()
}
