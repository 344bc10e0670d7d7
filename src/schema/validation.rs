//! Schema validation for SCIM resources.
//!
//! [`ResourceTypeDefinition::validate`] checks a resource against the core
//! schema and every extension attached to its type: the `schemas` list,
//! unknown attributes, required attributes, multiplicity, value kinds,
//! canonical values and complex sub-attributes. Mutability is not checked
//! here; it depends on the previous state and is enforced by the write paths.

use super::definition::ResourceTypeDefinition;
use super::types::{AttributeDefinition, AttributeType};
use crate::error::{ValidationError, ValidationResult};
use crate::resource::Resource;
use crate::resource::attributes::get_ci;
use crate::resource::value_kind;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::DateTime;
use serde_json::{Map, Value};

/// Envelope fields held outside `Resource::attributes`.
const ENVELOPE_ATTRIBUTES: [&str; 3] = ["id", "externalId", "meta"];

impl ResourceTypeDefinition {
    /// Validate a resource of this type.
    ///
    /// ```rust
    /// use scim_engine::schema::TypeDefinitionRegistry;
    /// use scim_engine::Resource;
    /// use serde_json::json;
    ///
    /// let registry = TypeDefinitionRegistry::builtin().unwrap();
    /// let users = registry.definition("User").unwrap();
    ///
    /// let valid = Resource::from_json("User", json!({
    ///     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
    ///     "userName": "bjensen"
    /// })).unwrap();
    /// assert!(users.validate(&valid).is_ok());
    ///
    /// let missing = Resource::from_json("User", json!({
    ///     "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"]
    /// })).unwrap();
    /// assert!(users.validate(&missing).is_err());
    /// ```
    pub fn validate(&self, resource: &Resource) -> ValidationResult<()> {
        self.validate_schemas(resource)?;

        for (key, value) in &resource.attributes {
            let Some(attr) = self.attribute(key) else {
                return Err(ValidationError::UnknownAttribute {
                    attribute: key.clone(),
                    schema_id: self.schema_id.clone(),
                });
            };
            if is_envelope(&attr.name) {
                continue;
            }
            validate_value(attr, value, &attr.name)?;
        }
        for attr in self.attributes.iter().filter(|a| !is_envelope(&a.name)) {
            check_required(attr, resource.get(&attr.name), &attr.name)?;
        }

        for extension in &self.extensions {
            let block = resource.extension(&extension.schema_id);
            if extension.required && block.is_none_or(Map::is_empty) {
                return Err(ValidationError::custom(format!(
                    "Required extension '{}' is missing",
                    extension.schema_id
                )));
            }
            let Some(block) = block else {
                continue;
            };
            validate_block(&extension.attributes, block, &extension.schema_id)?;
        }

        if let Some(uri) = resource
            .extensions
            .keys()
            .find(|uri| self.extension(uri).is_none())
        {
            return Err(ValidationError::UnknownSchemaUri { uri: uri.clone() });
        }

        Ok(())
    }

    fn validate_schemas(&self, resource: &Resource) -> ValidationResult<()> {
        if resource.schemas.is_empty() {
            return Err(ValidationError::MissingSchemas);
        }
        for uri in &resource.schemas {
            if !self.schema_ids().any(|id| id.eq_ignore_ascii_case(uri)) {
                return Err(ValidationError::UnknownSchemaUri { uri: uri.clone() });
            }
        }
        if !resource
            .schemas
            .iter()
            .any(|uri| uri.eq_ignore_ascii_case(&self.schema_id))
        {
            return Err(ValidationError::MissingBaseSchema {
                schema_id: self.schema_id.clone(),
            });
        }
        Ok(())
    }
}

fn is_envelope(name: &str) -> bool {
    ENVELOPE_ATTRIBUTES
        .iter()
        .any(|envelope| envelope.eq_ignore_ascii_case(name))
}

fn validate_block(
    attributes: &[AttributeDefinition],
    block: &Map<String, Value>,
    schema_id: &str,
) -> ValidationResult<()> {
    for (key, value) in block {
        let attr = attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| ValidationError::UnknownAttribute {
                attribute: key.clone(),
                schema_id: schema_id.to_string(),
            })?;
        validate_value(attr, value, &attr.name)?;
    }
    for attr in attributes {
        check_required(attr, get_ci(block, &attr.name), &attr.name)?;
    }
    Ok(())
}

fn check_required(attr: &AttributeDefinition, value: Option<&Value>, path: &str) -> ValidationResult<()> {
    let missing = match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if attr.required && missing {
        return Err(ValidationError::missing_required(path));
    }
    Ok(())
}

/// Validate multiplicity, then each value against the attribute's kind.
fn validate_value(attr: &AttributeDefinition, value: &Value, path: &str) -> ValidationResult<()> {
    if value.is_null() {
        return Ok(());
    }

    if attr.multi_valued {
        let Value::Array(items) = value else {
            return Err(ValidationError::ExpectedMultiValue {
                attribute: path.to_string(),
            });
        };
        for item in items {
            validate_single(attr, item, path)?;
        }
        if attr.is_complex() {
            let primaries = items
                .iter()
                .filter(|item| {
                    item.as_object()
                        .and_then(|obj| get_ci(obj, "primary"))
                        .and_then(Value::as_bool)
                        .unwrap_or(false)
                })
                .count();
            if primaries > 1 {
                return Err(ValidationError::MultiplePrimaryValues {
                    attribute: path.to_string(),
                });
            }
        }
        return Ok(());
    }

    if value.is_array() {
        return Err(ValidationError::ExpectedSingleValue {
            attribute: path.to_string(),
        });
    }
    validate_single(attr, value, path)
}

fn validate_single(attr: &AttributeDefinition, value: &Value, path: &str) -> ValidationResult<()> {
    let kind_error = || ValidationError::invalid_type(path, attr.data_type.to_string(), value_kind(value));

    match attr.data_type {
        AttributeType::String | AttributeType::Reference => {
            let text = value.as_str().ok_or_else(kind_error)?;
            check_canonical(attr, text, path)?;
        }
        AttributeType::Boolean => {
            if !value.is_boolean() {
                return Err(kind_error());
            }
        }
        AttributeType::Integer => {
            if !(value.is_i64() || value.is_u64()) {
                return Err(kind_error());
            }
        }
        AttributeType::Decimal => {
            if !value.is_number() {
                return Err(kind_error());
            }
        }
        AttributeType::DateTime => {
            let text = value.as_str().ok_or_else(kind_error)?;
            if DateTime::parse_from_rfc3339(text).is_err() {
                return Err(ValidationError::InvalidDateTimeFormat {
                    attribute: path.to_string(),
                    value: text.to_string(),
                });
            }
        }
        AttributeType::Binary => {
            let text = value.as_str().ok_or_else(kind_error)?;
            if BASE64.decode(text).is_err() {
                return Err(ValidationError::InvalidBinaryData {
                    attribute: path.to_string(),
                });
            }
        }
        AttributeType::Complex => {
            let obj = value.as_object().ok_or_else(kind_error)?;
            validate_complex(attr, obj, path)?;
        }
    }
    Ok(())
}

fn validate_complex(attr: &AttributeDefinition, obj: &Map<String, Value>, path: &str) -> ValidationResult<()> {
    for (key, sub_value) in obj {
        let Some(sub) = attr.sub_attribute(key) else {
            return Err(ValidationError::UnknownAttribute {
                attribute: format!("{}.{}", path, key),
                schema_id: attr.name.clone(),
            });
        };
        validate_value(sub, sub_value, &format!("{}.{}", path, sub.name))?;
    }
    for sub in attr.sub_attributes.iter().filter(|sub| sub.required) {
        let present = get_ci(obj, &sub.name).is_some_and(|v| !v.is_null());
        if !present {
            return Err(ValidationError::MissingSubAttribute {
                attribute: path.to_string(),
                sub_attribute: sub.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_canonical(attr: &AttributeDefinition, text: &str, path: &str) -> ValidationResult<()> {
    if attr.canonical_values.is_empty()
        || attr
            .canonical_values
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(text))
    {
        return Ok(());
    }
    Err(ValidationError::InvalidCanonicalValue {
        attribute: path.to_string(),
        value: text.to_string(),
        allowed: attr.canonical_values.clone(),
    })
}
