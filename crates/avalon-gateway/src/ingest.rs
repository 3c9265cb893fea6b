//! Blueprint ingestion.
//!
//! Request bodies arrive as JSON or YAML. Decoding happens in two passes:
//! the body is first parsed into a loose document to read the `kind`
//! discriminator and envelope fields, then the definition is decoded into the
//! concrete type the kind names.

use serde_json::{Map, Value};
use thiserror::Error;

use avalon_core::{
    BlueprintBatchRequest, BlueprintDefinition, BlueprintKind, BlueprintRequest,
    BuildingBlueprintRequest, ResourceBlueprintRequest,
};
use avalon_registry::{Registry, RegistryError};

/// Errors raised while decoding an ingestion request.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The content type is not one of the supported formats.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The `kind` field is absent or empty.
    #[error("missing kind field")]
    MissingKind,

    /// The `kind` field names no known blueprint family.
    #[error("invalid kind: {0}")]
    InvalidKind(String),

    /// A batch request did not name its version.
    #[error("missing version field")]
    MissingVersion,

    /// The body could not be parsed or does not fit the target type.
    #[error("malformed body: {0}")]
    Malformed(String),
}

/// Supported body formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// `application/json`
    Json,
    /// `application/yaml`, `application/x-yaml` or `text/yaml`
    Yaml,
}

impl MediaType {
    /// Resolve a `Content-Type` header value.
    ///
    /// Parameters such as `charset` are ignored and the comparison is
    /// case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMediaType` for a missing or unknown media type.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, DecodeError> {
        let raw = content_type.unwrap_or_default();
        let essence = raw.split(';').next().unwrap_or_default().trim();

        if essence.eq_ignore_ascii_case("application/json") {
            Ok(Self::Json)
        } else if ["application/yaml", "application/x-yaml", "text/yaml"]
            .iter()
            .any(|t| essence.eq_ignore_ascii_case(t))
        {
            Ok(Self::Yaml)
        } else {
            Err(DecodeError::UnsupportedMediaType(raw.to_string()))
        }
    }

    fn parse(self, body: &[u8]) -> Result<Value, DecodeError> {
        let document: Value = match self {
            Self::Json => serde_json::from_slice(body)
                .map_err(|e| DecodeError::Malformed(e.to_string()))?,
            Self::Yaml => serde_yaml::from_slice(body)
                .map_err(|e| DecodeError::Malformed(e.to_string()))?,
        };

        match document {
            Value::Object(_) => Ok(document),
            other => Err(DecodeError::Malformed(format!(
                "expected a mapping, found {}",
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Read an optional version field. YAML authors often write `version: 1`,
/// so numbers are accepted and rendered as text.
fn read_version(document: &Map<String, Value>) -> Result<String, DecodeError> {
    match document.get("version") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(DecodeError::Malformed(format!(
            "version must be a string, found {}",
            type_name(other)
        ))),
    }
}

fn read_force(document: &Map<String, Value>) -> Result<bool, DecodeError> {
    match document.get("force") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(DecodeError::Malformed(format!(
            "force must be a boolean, found {}",
            type_name(other)
        ))),
    }
}

fn read_kind(document: &Map<String, Value>) -> Result<BlueprintKind, DecodeError> {
    match document.get("kind") {
        None | Some(Value::Null) => Err(DecodeError::MissingKind),
        Some(Value::String(s)) if s.is_empty() => Err(DecodeError::MissingKind),
        Some(Value::String(s)) => s.parse().map_err(|_| DecodeError::InvalidKind(s.clone())),
        Some(other) => Err(DecodeError::InvalidKind(other.to_string())),
    }
}

fn malformed(err: &serde_json::Error) -> DecodeError {
    DecodeError::Malformed(err.to_string())
}

/// Decode a single-blueprint request.
///
/// # Errors
///
/// Returns `UnsupportedMediaType` before touching the body if the content
/// type is not supported, `MissingKind` or `InvalidKind` for a bad
/// discriminator, and `Malformed` if the body or definition does not parse.
pub fn decode_blueprint(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<BlueprintRequest, DecodeError> {
    let media_type = MediaType::from_content_type(content_type)?;
    let Value::Object(mut document) = media_type.parse(body)? else {
        return Err(DecodeError::Malformed("expected a mapping".to_string()));
    };

    let kind = read_kind(&document)?;
    let version = read_version(&document)?;
    let force = read_force(&document)?;

    let body = document
        .remove("body")
        .or_else(|| document.remove("definition"));
    let definition = match body {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(body @ Value::Object(_)) => body,
        Some(other) => {
            return Err(DecodeError::Malformed(format!(
                "body must be a mapping, found {}",
                type_name(&other)
            )))
        }
    };

    let mut definition = match kind {
        BlueprintKind::Building => BlueprintDefinition::Building(
            serde_json::from_value::<BuildingBlueprintRequest>(definition)
                .map_err(|e| malformed(&e))?,
        ),
        BlueprintKind::Resource => BlueprintDefinition::Resource(
            serde_json::from_value::<ResourceBlueprintRequest>(definition)
                .map_err(|e| malformed(&e))?,
        ),
    };

    if !version.is_empty() {
        definition.set_version(&version);
    }

    Ok(BlueprintRequest {
        version,
        force,
        definition,
    })
}

/// Decode a batch request.
///
/// The batch version is stamped into every item that does not carry its own.
///
/// # Errors
///
/// Returns `UnsupportedMediaType` for an unsupported content type,
/// `MissingVersion` if the batch names no version, and `Malformed` if the
/// body does not parse.
pub fn decode_batch(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<BlueprintBatchRequest, DecodeError> {
    let media_type = MediaType::from_content_type(content_type)?;
    let Value::Object(mut document) = media_type.parse(body)? else {
        return Err(DecodeError::Malformed("expected a mapping".to_string()));
    };

    let version = read_version(&document)?;
    if version.is_empty() {
        return Err(DecodeError::MissingVersion);
    }
    document.insert("version".to_string(), Value::String(version.clone()));

    let mut batch: BlueprintBatchRequest =
        serde_json::from_value(Value::Object(document)).map_err(|e| malformed(&e))?;

    for building in &mut batch.buildings {
        if building.version.is_empty() {
            building.version.clone_from(&version);
        }
    }
    for resource in &mut batch.resources {
        if resource.version.is_empty() {
            resource.version.clone_from(&version);
        }
    }

    Ok(batch)
}

/// Store a decoded single-blueprint request.
///
/// # Errors
///
/// Returns the registry error if the save fails.
pub fn save_blueprint(
    registry: &dyn Registry,
    request: &BlueprintRequest,
) -> Result<(), RegistryError> {
    registry.save(&request.definition, request.force)?;

    tracing::info!(
        kind = %request.kind(),
        name = request.definition.name(),
        version = request.definition.version(),
        force = request.force,
        "Saved blueprint"
    );

    Ok(())
}

/// Store every item of a batch: all buildings, then all resources.
///
/// Stops at the first failing save. Items saved before the failure stay
/// saved. Returns the number of items saved.
///
/// # Errors
///
/// Returns the first registry error encountered.
pub fn save_batch(
    registry: &dyn Registry,
    batch: &BlueprintBatchRequest,
) -> Result<usize, RegistryError> {
    let mut saved = 0;

    for building in &batch.buildings {
        registry.save_building(building, batch.force).map_err(|e| {
            tracing::error!(
                error = %e,
                name = %building.name,
                saved = saved,
                "Batch aborted on building"
            );
            e
        })?;
        saved += 1;
    }

    for resource in &batch.resources {
        registry.save_resource(resource, batch.force).map_err(|e| {
            tracing::error!(
                error = %e,
                name = %resource.name,
                saved = saved,
                "Batch aborted on resource"
            );
            e
        })?;
        saved += 1;
    }

    tracing::info!(version = %batch.version, count = saved, "Saved blueprint batch");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use avalon_core::Blueprint;
    use avalon_registry::{BlueprintSet, MemoryRegistry};

    const JSON: Option<&str> = Some("application/json");
    const YAML: Option<&str> = Some("application/yaml");

    /// Records every save attempt and fails on the sentinel version.
    #[derive(Default)]
    struct RecordingRegistry {
        attempts: Mutex<Vec<(BlueprintKind, String)>>,
    }

    const SENTINEL_VERSION: &str = "e";

    impl RecordingRegistry {
        fn record<T: Blueprint>(&self, blueprint: &T) -> Result<(), RegistryError> {
            self.attempts
                .lock()
                .unwrap()
                .push((T::KIND, blueprint.name().to_string()));

            if blueprint.version() == SENTINEL_VERSION {
                return Err(RegistryError::Database("sentinel".to_string()));
            }
            Ok(())
        }

        fn attempts(&self) -> Vec<(BlueprintKind, String)> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl Registry for RecordingRegistry {
        fn save_building(
            &self,
            blueprint: &BuildingBlueprintRequest,
            _force: bool,
        ) -> avalon_registry::Result<()> {
            self.record(blueprint)
        }

        fn save_resource(
            &self,
            blueprint: &ResourceBlueprintRequest,
            _force: bool,
        ) -> avalon_registry::Result<()> {
            self.record(blueprint)
        }

        fn get_building(
            &self,
            _version: &str,
            _slug: &str,
        ) -> avalon_registry::Result<Option<BuildingBlueprintRequest>> {
            Ok(None)
        }

        fn get_resource(
            &self,
            _version: &str,
            _slug: &str,
        ) -> avalon_registry::Result<Option<ResourceBlueprintRequest>> {
            Ok(None)
        }

        fn list_version(&self, version: &str) -> avalon_registry::Result<BlueprintSet> {
            Ok(BlueprintSet::new(version))
        }
    }

    #[test]
    fn media_types() {
        assert_eq!(MediaType::from_content_type(JSON).unwrap(), MediaType::Json);
        assert_eq!(
            MediaType::from_content_type(Some("Application/JSON; charset=utf-8")).unwrap(),
            MediaType::Json
        );
        assert_eq!(MediaType::from_content_type(YAML).unwrap(), MediaType::Yaml);
        assert_eq!(
            MediaType::from_content_type(Some("text/yaml")).unwrap(),
            MediaType::Yaml
        );
        assert!(matches!(
            MediaType::from_content_type(Some("application/xml")),
            Err(DecodeError::UnsupportedMediaType(t)) if t == "application/xml"
        ));
        assert!(matches!(
            MediaType::from_content_type(None),
            Err(DecodeError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn decode_json_building() {
        let request =
            decode_blueprint(JSON, br#"{"kind":"building","body":{"name":"house"}}"#).unwrap();

        assert_eq!(request.kind(), BlueprintKind::Building);
        assert!(!request.force);
        assert!(matches!(
            request.definition,
            BlueprintDefinition::Building(ref b) if b.name == "house"
        ));
    }

    #[test]
    fn unsupported_media_type_wins_over_body() {
        let body = br#"{"kind":"building","body":{"name":"house"}}"#;
        assert!(matches!(
            decode_blueprint(Some("application/xml"), body),
            Err(DecodeError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            decode_blueprint(Some("text/plain"), b"not even json"),
            Err(DecodeError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn decode_yaml_resource() {
        let body = b"
kind: resource
version: 2
force: true
body:
  name: Iron Ore
  weight: 3
";
        let request = decode_blueprint(YAML, body).unwrap();

        assert_eq!(request.kind(), BlueprintKind::Resource);
        assert_eq!(request.version, "2");
        assert!(request.force);
        assert_eq!(request.definition.version(), "2");
        assert_eq!(request.definition.slug(), "iron-ore");

        let BlueprintDefinition::Resource(resource) = request.definition else {
            panic!("expected a resource");
        };
        assert_eq!(resource.attributes["weight"], 3);
    }

    #[test]
    fn definition_alias_and_missing_body() {
        let request = decode_blueprint(
            JSON,
            br#"{"kind":"resource","definition":{"name":"wood"}}"#,
        )
        .unwrap();
        assert_eq!(request.definition.name(), "wood");

        // No body decodes as an empty definition, which lacks a name.
        assert!(matches!(
            decode_blueprint(JSON, br#"{"kind":"resource"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn missing_and_invalid_kind_are_distinct() {
        let missing = decode_blueprint(JSON, br#"{"body":{"name":"house"}}"#).unwrap_err();
        let empty = decode_blueprint(JSON, br#"{"kind":"","body":{"name":"house"}}"#).unwrap_err();
        let invalid =
            decode_blueprint(JSON, br#"{"kind":"bogus","body":{"name":"house"}}"#).unwrap_err();

        assert!(matches!(missing, DecodeError::MissingKind));
        assert!(matches!(empty, DecodeError::MissingKind));
        assert!(matches!(invalid, DecodeError::InvalidKind(ref k) if k == "bogus"));
    }

    #[test]
    fn malformed_bodies() {
        assert!(matches!(
            decode_blueprint(JSON, b"{not json"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_blueprint(JSON, b"[1, 2]"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_blueprint(JSON, br#"{"kind":"building","body":"house"}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode_blueprint(JSON, br#"{"kind":"building","force":"yes","body":{"name":"a"}}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn version_is_not_stamped_when_absent() {
        let request = decode_blueprint(
            JSON,
            br#"{"kind":"building","body":{"name":"house","version":"3"}}"#,
        )
        .unwrap();
        assert_eq!(request.version, "");
        assert_eq!(request.definition.version(), "3");
    }

    #[test]
    fn batch_requires_version() {
        assert!(matches!(
            decode_batch(JSON, br#"{"buildings":[{"name":"house"}]}"#),
            Err(DecodeError::MissingVersion)
        ));
    }

    #[test]
    fn batch_stamps_unversioned_items() {
        let body = br#"{
            "version": "1",
            "buildings": [{ "name": "house" }, { "name": "farm", "version": "0" }],
            "resources": [{ "name": "wood" }]
        }"#;
        let batch = decode_batch(JSON, body).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.buildings[0].version, "1");
        assert_eq!(batch.buildings[1].version, "0");
        assert_eq!(batch.resources[0].version, "1");
    }

    #[test]
    fn save_single_blueprint() {
        let registry = MemoryRegistry::new();
        let request = decode_blueprint(
            JSON,
            br#"{"kind":"building","version":"1","body":{"name":"house"}}"#,
        )
        .unwrap();

        save_blueprint(&registry, &request).unwrap();
        assert!(registry.get_building("1", "house").unwrap().is_some());

        assert!(matches!(
            save_blueprint(&registry, &request),
            Err(RegistryError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn batch_halts_on_first_failure() {
        let registry = RecordingRegistry::default();
        let batch = BlueprintBatchRequest {
            version: "1".to_string(),
            force: false,
            buildings: vec![
                BuildingBlueprintRequest::new("house").with_version("1"),
                BuildingBlueprintRequest::new("farm").with_version(SENTINEL_VERSION),
            ],
            resources: vec![ResourceBlueprintRequest::new("wood").with_version("1")],
        };

        let result = save_batch(&registry, &batch);

        assert!(matches!(result, Err(RegistryError::Database(_))));
        assert_eq!(
            registry.attempts(),
            vec![
                (BlueprintKind::Building, "house".to_string()),
                (BlueprintKind::Building, "farm".to_string()),
            ]
        );
    }

    #[test]
    fn batch_saves_buildings_before_resources() {
        let registry = RecordingRegistry::default();
        let batch = decode_batch(
            YAML,
            b"
version: '1'
resources:
  - name: wood
buildings:
  - name: house
",
        )
        .unwrap();

        assert_eq!(save_batch(&registry, &batch).unwrap(), 2);
        assert_eq!(
            registry.attempts(),
            vec![
                (BlueprintKind::Building, "house".to_string()),
                (BlueprintKind::Resource, "wood".to_string()),
            ]
        );
    }
}
