//! SCIM PATCH support (RFC 7644 §3.5.2).
//!
//! A [`PatchRequest`] carries an ordered list of [`PatchOperation`]s that
//! [`PatchEngine`] applies as one unit: either every operation succeeds and a
//! restamped resource comes back, or the first failure is reported and the
//! caller's resource is left exactly as it was.
//!
//! ```rust
//! use scim_engine::patch::{PatchEngine, PatchOperation};
//! use scim_engine::schema::TypeDefinitionRegistry;
//! use scim_engine::Resource;
//! use serde_json::json;
//!
//! let registry = TypeDefinitionRegistry::builtin().unwrap();
//! let users = registry.definition("User").unwrap();
//! let user = Resource::from_json("User", json!({
//!     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!     "userName": "daniel"
//! })).unwrap();
//!
//! let patched = PatchEngine::apply(users, &user, &[
//!     PatchOperation::replace("userName", json!("daniel2")),
//!     PatchOperation::add("emails[type eq \"work\"].value", json!("d@example.com")),
//! ])
//! .into_result()
//! .unwrap();
//!
//! assert_eq!(patched.get_str("userName"), Some("daniel2"));
//! assert_eq!(user.get_str("userName"), Some("daniel"));
//! ```

mod engine;
mod path;

pub use engine::PatchEngine;
pub use path::{PatchTarget, resolve_path};

use crate::error::{ScimError, ScimResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Schema URI of a PATCH request body.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// PATCH operation kind. Parsed case-insensitively since some clients send `Replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

impl FromStr for PatchOpKind {
    type Err = ScimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOpKind::Add),
            "remove" => Ok(PatchOpKind::Remove),
            "replace" => Ok(PatchOpKind::Replace),
            other => Err(ScimError::invalid_syntax(format!(
                "Unknown PATCH operation '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PatchOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchOpKind::Add => "add",
            PatchOpKind::Remove => "remove",
            PatchOpKind::Replace => "replace",
        })
    }
}

impl Serialize for PatchOpKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PatchOpKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One `{op, path, value}` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOpKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: Some(path.into()),
            value: None,
        }
    }

    /// A path-less `add`/`replace` whose value object names the attributes.
    pub fn merge(op: PatchOpKind, value: Value) -> Self {
        Self {
            op,
            path: None,
            value: Some(value),
        }
    }

    /// Structural checks that do not need the resource.
    pub fn validate(&self) -> ScimResult<()> {
        match self.op {
            PatchOpKind::Remove if self.path.as_deref().is_none_or(|p| p.trim().is_empty()) => {
                Err(ScimError::no_target("<none>"))
            }
            PatchOpKind::Add | PatchOpKind::Replace if self.value.is_none() => Err(
                ScimError::invalid_syntax(format!("'{}' operation requires a value", self.op)),
            ),
            _ => Ok(()),
        }
    }
}

/// A PATCH request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations", alias = "operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// Parse and validate a request body.
    pub fn from_json(body: Value) -> ScimResult<Self> {
        let request: PatchRequest = serde_json::from_value(body)
            .map_err(|e| ScimError::invalid_syntax(format!("Malformed PATCH body: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> ScimResult<()> {
        if !self
            .schemas
            .iter()
            .any(|schema| schema.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
        {
            return Err(ScimError::invalid_syntax(format!(
                "PATCH request must declare schema '{}'",
                PATCH_OP_SCHEMA
            )));
        }
        if self.operations.is_empty() {
            return Err(ScimError::invalid_syntax(
                "PATCH request must contain at least one operation",
            ));
        }
        self.operations.iter().try_for_each(PatchOperation::validate)
    }
}
