//! Verified identity claims and role checks.
//!
//! [`Claims`] is built from the payload of a verified access token. Role
//! grants are keyed by resource name, mirroring the identity provider's
//! `resource_access` document:
//!
//! ```text
//! {
//!   "sub": "196176fd-...",
//!   "email": "player@example.com",
//!   "exp": 1700000000,
//!   "resource_access": {
//!     "dev.avalon.cool": { "resource": "dev.avalon.cool", "roles": ["can-build"] }
//!   }
//! }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Roles granted to a principal on a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    /// Resource the roles apply to.
    pub resource: String,
    /// Granted role names, in provider order.
    pub roles: Vec<String>,
}

impl Access {
    /// Create a grant for `resource` with the given roles.
    #[must_use]
    pub fn new<I, S>(resource: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource: resource.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `role` is granted, by exact match.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Identity attributes extracted from a verified token.
///
/// Lives for the duration of a single request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClaims", into = "RawClaims")]
pub struct Claims {
    /// Opaque principal identifier (`sub`).
    pub subject: String,
    /// Informational email address; not used for authorization.
    pub email: String,
    /// Role grants keyed by resource name. Each key equals `Access::resource`.
    pub access: HashMap<String, Access>,
    /// Token expiry (`exp`), second precision.
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Create claims with no role grants.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            access: HashMap::new(),
            expires_at,
        }
    }

    /// Add (or replace) the grant for a resource.
    #[must_use]
    pub fn with_access<I, S>(mut self, resource: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let access = Access::new(resource, roles);
        self.access.insert(access.resource.clone(), access);
        self
    }

    /// Check a `"<resource>:<role>"` permission path.
    ///
    /// The path is split on the first `:` only, so the role name may itself
    /// contain colons (`"game:inventory:write"` checks role `inventory:write`
    /// on resource `game`). Paths without a `:` never match.
    #[must_use]
    pub fn has_role(&self, path: &str) -> bool {
        let Some((resource, role)) = path.split_once(':') else {
            return false;
        };

        self.access
            .get(resource)
            .is_some_and(|access| access.contains(role))
    }

    /// Returns `true` if any of the given permission paths match.
    #[must_use]
    pub fn has_any_role<I, S>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths.into_iter().any(|path| self.has_role(path.as_ref()))
    }
}

/// Wire form of [`Claims`].
#[derive(Debug, Serialize, Deserialize)]
struct RawClaims {
    sub: String,
    email: String,
    exp: i64,
    #[serde(default)]
    resource_access: Option<HashMap<String, RawAccess>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawAccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = CoreError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let expires_at =
            DateTime::from_timestamp(raw.exp, 0).ok_or(CoreError::InvalidExpiry(raw.exp))?;

        // The outer key is authoritative for the resource name.
        let access = raw
            .resource_access
            .unwrap_or_default()
            .into_iter()
            .map(|(resource, grant)| {
                let access = Access {
                    resource: resource.clone(),
                    roles: grant.roles,
                };
                (resource, access)
            })
            .collect();

        Ok(Self {
            subject: raw.sub,
            email: raw.email,
            access,
            expires_at,
        })
    }
}

impl From<Claims> for RawClaims {
    fn from(claims: Claims) -> Self {
        let resource_access = claims
            .access
            .into_values()
            .map(|access| {
                let raw = RawAccess {
                    resource: Some(access.resource.clone()),
                    roles: access.roles,
                };
                (access.resource, raw)
            })
            .collect();

        Self {
            sub: claims.subject,
            email: claims.email,
            exp: claims.expires_at.timestamp(),
            resource_access: Some(resource_access),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_claims() -> Claims {
        let expires_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Claims::new("test", "bogus@test.com", expires_at).with_access(
            "test-resource",
            ["test-role", "other-role", "nested:role"],
        )
    }

    #[test]
    fn has_role_paths() {
        let claims = test_claims();

        let cases = [
            ("test-resource:test-role", true),
            ("test-resource:other-role", true),
            ("test-resource:bogus", false),
            ("test-resource:nested:role", true),
            ("test-resource:nested", false),
            ("non-existent:resource", false),
            ("wrong-number", false),
            ("", false),
            (":test-role", false),
            ("test-resource:", false),
        ];

        for (path, expected) in cases {
            assert_eq!(claims.has_role(path), expected, "path {path:?}");
        }
    }

    #[test]
    fn has_role_without_grants() {
        let claims = Claims::new("test", "", Utc::now());
        assert!(!claims.has_role("test-resource:test-role"));
    }

    #[test]
    fn has_any_role_matches_second_path() {
        let claims = test_claims();
        assert!(claims.has_any_role(["test-resource:missing", "test-resource:test-role"]));
        assert!(!claims.has_any_role(["test-resource:missing", "other:test-role"]));
        assert!(!claims.has_any_role(Vec::<&str>::new()));
    }

    #[test]
    fn round_trip() {
        let claims = test_claims();

        let raw = serde_json::to_string(&claims).unwrap();
        let decoded: Claims = serde_json::from_str(&raw).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn round_trip_truncates_to_seconds() {
        let now = Utc::now();
        let claims = Claims::new("test", "bogus@test.com", now);

        let raw = serde_json::to_vec(&claims).unwrap();
        let decoded: Claims = serde_json::from_slice(&raw).unwrap();

        assert_eq!(decoded.expires_at.timestamp(), now.timestamp());
        assert!(now - decoded.expires_at < Duration::seconds(1));
        assert_eq!(decoded.subject, claims.subject);
        assert_eq!(decoded.email, claims.email);
        assert_eq!(decoded.access, claims.access);
    }

    #[test]
    fn serializes_resource_access_document() {
        let value = serde_json::to_value(test_claims()).unwrap();

        assert_eq!(value["sub"], "test");
        assert_eq!(value["exp"], 1_700_000_000);
        assert_eq!(
            value["resource_access"]["test-resource"]["resource"],
            "test-resource"
        );
        assert_eq!(
            value["resource_access"]["test-resource"]["roles"][2],
            "nested:role"
        );
    }

    #[test]
    fn provider_payload() {
        let raw = r#"{
            "email": "test@test.com",
            "email_verified": true,
            "exp": 1700000300,
            "preferred_username": "testing",
            "resource_access": {
                "test-resource": { "roles": ["test-role"] }
            },
            "sub": "196176fd-6e54-49c2-9e49-eb81406c68d5"
        }"#;

        let claims: Claims = serde_json::from_str(raw).unwrap();
        assert_eq!(claims.subject, "196176fd-6e54-49c2-9e49-eb81406c68d5");
        assert_eq!(claims.expires_at.timestamp(), 1_700_000_300);
        assert_eq!(claims.access["test-resource"].resource, "test-resource");
        assert!(claims.has_role("test-resource:test-role"));
    }

    #[test]
    fn missing_resource_access_is_empty() {
        let raw = r#"{"sub":"a","email":"b","exp":1700000000}"#;
        let claims: Claims = serde_json::from_str(raw).unwrap();
        assert!(claims.access.is_empty());

        let raw = r#"{"sub":"a","email":"b","exp":1700000000,"resource_access":null}"#;
        let claims: Claims = serde_json::from_str(raw).unwrap();
        assert!(claims.access.is_empty());
    }

    #[test]
    fn outer_key_wins_over_inner_resource() {
        let raw = r#"{
            "sub": "a", "email": "b", "exp": 1700000000,
            "resource_access": { "real": { "resource": "fake", "roles": ["r"] } }
        }"#;
        let claims: Claims = serde_json::from_str(raw).unwrap();
        assert_eq!(claims.access["real"].resource, "real");
        assert!(claims.has_role("real:r"));
    }

    #[test]
    fn malformed_documents_fail() {
        let cases = [
            "not json",
            r#"{"email":"b","exp":1700000000}"#,
            r#"{"sub":"a","exp":1700000000}"#,
            r#"{"sub":"a","email":"b"}"#,
            r#"{"sub":1,"email":"b","exp":1700000000}"#,
            r#"{"sub":"a","email":"b","exp":"tomorrow"}"#,
            r#"{"sub":"a","email":"b","exp":1700000000,"resource_access":{"r":{"roles":"x"}}}"#,
            r#"{"sub":"a","email":"b","exp":9223372036854775807}"#,
        ];

        for raw in cases {
            assert!(
                serde_json::from_str::<Claims>(raw).is_err(),
                "expected failure for {raw}"
            );
        }
    }
}
