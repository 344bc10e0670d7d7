//! Core SCIM resource representation.
//!
//! A [`Resource`] keeps the server-managed envelope fields (`id`, `meta`,
//! `schemas`, `externalId`) typed, and holds schema-defined attributes and
//! extension blocks as JSON so any registered definition can describe them.

use super::attributes::{get_ci, insert_ci};
use super::meta::Meta;
use super::version::{RawVersion, VersionCalculator};
use chrono::{DateTime, Utc};
use crate::error::{ValidationError, ValidationResult};
use crate::schema::{AttributeDefinition, ResourceTypeDefinition};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One SCIM resource of a registered resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Name of the resource type (`User`, `Group`, ...)
    pub resource_type: String,
    /// Assigned once by the repository, immutable afterwards
    pub id: Option<String>,
    pub external_id: Option<String>,
    pub schemas: Vec<String>,
    pub meta: Option<Meta>,
    /// Core schema attributes, keyed as the client sent them
    pub attributes: Map<String, Value>,
    /// Extension attribute blocks keyed by extension schema URI
    pub extensions: BTreeMap<String, Map<String, Value>>,
}

impl Resource {
    /// An empty resource of the given type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            external_id: None,
            schemas: Vec::new(),
            meta: None,
            attributes: Map::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Split a JSON payload into envelope fields, attributes and extensions.
    ///
    /// Keys beginning with `urn:` are treated as extension blocks. A `meta`
    /// block that does not parse is dropped; it is server-managed anyway.
    ///
    /// ```rust
    /// use scim_engine::Resource;
    /// use serde_json::json;
    ///
    /// let resource = Resource::from_json("User", json!({
    ///     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
    ///     "userName": "bjensen",
    ///     "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User": {
    ///         "employeeNumber": "701984"
    ///     }
    /// })).unwrap();
    ///
    /// assert_eq!(resource.get_str("userName"), Some("bjensen"));
    /// assert_eq!(resource.extensions.len(), 1);
    /// ```
    pub fn from_json(resource_type: impl Into<String>, data: Value) -> ValidationResult<Self> {
        let Value::Object(obj) = data else {
            return Err(ValidationError::custom("Resource must be a JSON object"));
        };

        let mut resource = Self::new(resource_type);
        for (key, value) in obj {
            if key.eq_ignore_ascii_case("schemas") {
                resource.schemas = extract_schemas(value)?;
            } else if key.eq_ignore_ascii_case("id") {
                resource.id = optional_string("id", value)?;
            } else if key.eq_ignore_ascii_case("externalId") {
                resource.external_id = optional_string("externalId", value)?;
            } else if key.eq_ignore_ascii_case("meta") {
                resource.meta = serde_json::from_value(value).ok();
            } else if is_extension_key(&key) {
                match value {
                    Value::Object(block) => {
                        resource.extensions.insert(key, block);
                    }
                    Value::Null => {}
                    other => {
                        return Err(ValidationError::invalid_type(
                            key,
                            "complex",
                            value_kind(&other),
                        ));
                    }
                }
            } else {
                resource.attributes.insert(key, value);
            }
        }
        Ok(resource)
    }

    /// Full wire representation.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "schemas".to_string(),
            Value::Array(self.schemas.iter().cloned().map(Value::String).collect()),
        );
        if let Some(id) = &self.id {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        if let Some(external_id) = &self.external_id {
            obj.insert("externalId".to_string(), Value::String(external_id.clone()));
        }
        for (key, value) in &self.attributes {
            obj.insert(key.clone(), value.clone());
        }
        for (uri, block) in &self.extensions {
            obj.insert(uri.clone(), Value::Object(block.clone()));
        }
        if let Some(meta) = &self.meta {
            if let Ok(meta_json) = serde_json::to_value(meta) {
                obj.insert("meta".to_string(), meta_json);
            }
        }
        Value::Object(obj)
    }

    /// Content that participates in versioning: everything except `id` and `meta`.
    ///
    /// Attribute names and schema URIs are case-insensitive, so they are
    /// folded to lowercase here; values keep their case.
    pub fn tracked_content(&self) -> Value {
        let mut obj = Map::new();
        let mut schemas: Vec<String> = self.schemas.iter().map(|uri| uri.to_ascii_lowercase()).collect();
        schemas.sort();
        obj.insert(
            "schemas".to_string(),
            Value::Array(schemas.into_iter().map(Value::String).collect()),
        );
        if let Some(external_id) = &self.external_id {
            obj.insert("externalId".to_string(), Value::String(external_id.clone()));
        }
        obj.insert("attributes".to_string(), fold_keys(&self.attributes));
        let extensions: Map<String, Value> = self
            .extensions
            .iter()
            .map(|(uri, block)| (uri.to_ascii_lowercase(), fold_keys(block)))
            .collect();
        obj.insert("extensions".to_string(), Value::Object(extensions));
        Value::Object(obj)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Core attribute by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Value> {
        get_ci(&self.attributes, name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Set a core attribute, keeping the existing key's casing.
    pub fn set(&mut self, name: &str, value: Value) {
        insert_ci(&mut self.attributes, name, value);
    }

    /// Extension block by schema URI, ignoring case.
    pub fn extension(&self, schema_id: &str) -> Option<&Map<String, Value>> {
        self.extensions
            .iter()
            .find(|(uri, _)| uri.eq_ignore_ascii_case(schema_id))
            .map(|(_, block)| block)
    }

    /// Attribute value from the core schema or an extension block.
    pub fn value_of(&self, extension: Option<&str>, name: &str) -> Option<&Value> {
        match extension {
            None => self.get(name),
            Some(uri) => get_ci(self.extension(uri)?, name),
        }
    }

    /// The stored version, if the resource has been stamped.
    pub fn version(&self) -> Option<RawVersion> {
        self.meta.as_ref().and_then(Meta::raw_version)
    }

    /// Move `lastModified` to `now` and recompute the version from content.
    /// `created` is left alone when a meta block already exists.
    pub fn stamp_modified(&mut self, now: DateTime<Utc>) {
        let version = VersionCalculator::compute(self);
        let meta = match &self.meta {
            Some(meta) => meta.touched(now),
            None => Meta::new_for_creation(self.resource_type.clone(), now),
        };
        self.meta = Some(meta.with_version(&version));
    }

    /// Put extension blocks under their canonical URIs, drop empty ones,
    /// rename attribute keys to the casing their definitions use and make
    /// `schemas` list exactly the core schema plus the extensions present.
    pub fn normalize_schemas(&mut self, definition: &ResourceTypeDefinition) {
        canonicalize_keys(&mut self.attributes, &definition.attributes);
        let extensions = std::mem::take(&mut self.extensions);
        for (uri, mut block) in extensions {
            if block.is_empty() {
                continue;
            }
            let key = match definition.extension(&uri) {
                Some(ext) => {
                    canonicalize_keys(&mut block, &ext.attributes);
                    ext.schema_id.clone()
                }
                None => uri,
            };
            self.extensions.insert(key, block);
        }

        let unknown: Vec<String> = self
            .schemas
            .iter()
            .filter(|uri| !definition.schema_ids().any(|id| id.eq_ignore_ascii_case(uri)))
            .cloned()
            .collect();

        let mut schemas = Vec::with_capacity(1 + self.extensions.len());
        if self
            .schemas
            .iter()
            .any(|uri| uri.eq_ignore_ascii_case(&definition.schema_id))
        {
            schemas.push(definition.schema_id.clone());
        }
        schemas.extend(self.extensions.keys().cloned());
        // Unknown URIs stay so validation can reject them.
        schemas.extend(unknown);
        self.schemas = schemas;
    }
}

/// Rename keys to their definitions' casing, down into complex values.
/// Keys without a definition are left for validation to reject.
fn canonicalize_keys(block: &mut Map<String, Value>, attributes: &[AttributeDefinition]) {
    let keys: Vec<String> = block.keys().cloned().collect();
    for key in keys {
        let Some(attr) = attributes.iter().find(|a| a.name.eq_ignore_ascii_case(&key)) else {
            continue;
        };
        let Some(mut value) = block.remove(&key) else {
            continue;
        };
        if !attr.sub_attributes.is_empty() {
            match &mut value {
                Value::Object(entry) => canonicalize_keys(entry, &attr.sub_attributes),
                Value::Array(items) => {
                    for entry in items.iter_mut().filter_map(Value::as_object_mut) {
                        canonicalize_keys(entry, &attr.sub_attributes);
                    }
                }
                _ => {}
            }
        }
        block.insert(attr.name.clone(), value);
    }
}

fn fold_keys(block: &Map<String, Value>) -> Value {
    fn fold(value: &Value) -> Value {
        match value {
            Value::Object(obj) => fold_keys(obj),
            Value::Array(items) => Value::Array(items.iter().map(fold).collect()),
            other => other.clone(),
        }
    }
    Value::Object(
        block
            .iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), fold(value)))
            .collect(),
    )
}

fn is_extension_key(key: &str) -> bool {
    key.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("urn:"))
}

fn extract_schemas(value: Value) -> ValidationResult<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(uri) => Ok(uri),
                other => Err(ValidationError::invalid_type(
                    "schemas",
                    "string",
                    value_kind(&other),
                )),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(ValidationError::ExpectedMultiValue {
            attribute: format!("schemas ({})", value_kind(&other)),
        }),
    }
}

fn optional_string(name: &str, value: Value) -> ValidationResult<Option<String>> {
    match value {
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => Err(ValidationError::invalid_type(
            name,
            "string",
            value_kind(&other),
        )),
    }
}

/// JSON kind name used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
