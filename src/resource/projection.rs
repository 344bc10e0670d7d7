//! Attribute projection for response bodies (RFC 7644 §3.4.2.5).
//!
//! `attributes` narrows a representation to the listed attributes and
//! `excludedAttributes` removes attributes from the default set. Either way
//! `schemas`, `id` and every `returned: always` attribute stay, while
//! `writeOnly` and `returned: never` attributes are never emitted.

use super::Resource;
use crate::error::{ScimError, ScimResult};
use crate::filter::{AttrPath, parse_attr_path};
use crate::schema::{AttributeDefinition, ResourceTypeDefinition, Returned};
use serde_json::{Map, Value};

/// Parsed `attributes` / `excludedAttributes` lists.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    attributes: Vec<Requested>,
    excluded: Vec<Requested>,
}

#[derive(Debug, Clone)]
struct Requested {
    raw: String,
    path: AttrPath,
}

impl Requested {
    fn parse(raw: &str) -> ScimResult<Self> {
        let path = parse_attr_path(raw.trim())
            .map_err(|e| ScimError::invalid_path(raw, e.to_string()))?;
        Ok(Self {
            raw: raw.trim().to_string(),
            path,
        })
    }

    /// Whether this entry names `attr` in the schema `schema_id`.
    fn names(&self, schema_id: &str, attr: &AttributeDefinition) -> bool {
        self.path
            .schema
            .as_deref()
            .is_none_or(|schema| schema.eq_ignore_ascii_case(schema_id))
            && self.path.attr.eq_ignore_ascii_case(&attr.name)
    }

    fn names_schema(&self, schema_id: &str) -> bool {
        self.raw.eq_ignore_ascii_case(schema_id)
    }
}

impl Projection {
    /// Build from the two request lists. At most one of them should be non-empty;
    /// when both are, `attributes` wins.
    pub fn new<S: AsRef<str>>(attributes: &[S], excluded: &[S]) -> ScimResult<Self> {
        Ok(Self {
            attributes: attributes
                .iter()
                .map(|raw| Requested::parse(raw.as_ref()))
                .collect::<ScimResult<_>>()?,
            excluded: excluded
                .iter()
                .map(|raw| Requested::parse(raw.as_ref()))
                .collect::<ScimResult<_>>()?,
        })
    }

    /// The default representation.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        self.attributes.is_empty() && self.excluded.is_empty()
    }

    /// The projected wire representation of `resource`.
    pub fn apply(&self, definition: &ResourceTypeDefinition, resource: &Resource) -> Value {
        let Value::Object(full) = resource.to_json() else {
            return Value::Null;
        };

        let mut projected = Map::new();
        for (key, value) in full {
            if key == "schemas" || key == "id" {
                projected.insert(key, value);
                continue;
            }

            if let Some(extension) = definition.extension(&key) {
                if let Some(block) = self.project_extension(
                    &extension.schema_id,
                    &extension.attributes,
                    value,
                ) {
                    projected.insert(key, block);
                }
                continue;
            }

            let Some(attr) = definition.attribute(&key) else {
                continue;
            };
            if let Some(value) = self.project_attribute(&definition.schema_id, attr, value) {
                projected.insert(key, value);
            }
        }
        Value::Object(projected)
    }

    fn project_extension(
        &self,
        schema_id: &str,
        attributes: &[AttributeDefinition],
        block: Value,
    ) -> Option<Value> {
        if self.excluded.iter().any(|r| r.names_schema(schema_id)) {
            return None;
        }
        let whole = self.attributes.iter().any(|r| r.names_schema(schema_id));

        let Value::Object(block) = block else {
            return None;
        };
        let mut kept = Map::new();
        for (key, value) in block {
            let Some(attr) = attributes.iter().find(|a| a.name.eq_ignore_ascii_case(&key)) else {
                continue;
            };
            let projected = if whole {
                attr.is_returnable()
                    .then(|| retain_sub_attributes(attr, value, |sub| sub.returned != Returned::Request))
                    .flatten()
            } else {
                self.project_attribute(schema_id, attr, value)
            };
            if let Some(value) = projected {
                kept.insert(key, value);
            }
        }
        (!kept.is_empty()).then_some(Value::Object(kept))
    }

    fn project_attribute(&self, schema_id: &str, attr: &AttributeDefinition, value: Value) -> Option<Value> {
        if !attr.is_returnable() {
            return None;
        }
        if attr.returned == Returned::Always {
            return retain_sub_attributes(attr, value, |_| true);
        }

        if !self.attributes.is_empty() {
            let listed: Vec<&AttrPath> = self
                .attributes
                .iter()
                .filter(|r| r.names(schema_id, attr))
                .map(|r| &r.path)
                .collect();
            if listed.is_empty() {
                return None;
            }
            if listed.iter().any(|path| path.sub_attr.is_none()) {
                return retain_sub_attributes(attr, value, |sub| sub.returned != Returned::Request);
            }
            return retain_sub_attributes(attr, value, |sub| {
                sub.returned == Returned::Always
                    || listed.iter().any(|path| {
                        path.sub_attr
                            .as_deref()
                            .is_some_and(|name| name.eq_ignore_ascii_case(&sub.name))
                    })
            });
        }

        if attr.returned == Returned::Request {
            return None;
        }
        let excluded: Vec<&AttrPath> = self
            .excluded
            .iter()
            .filter(|r| r.names(schema_id, attr))
            .map(|r| &r.path)
            .collect();
        if excluded.iter().any(|path| path.sub_attr.is_none()) {
            return None;
        }
        retain_sub_attributes(attr, value, |sub| {
            sub.returned == Returned::Always
                || (sub.returned != Returned::Request
                    && !excluded.iter().any(|path| {
                        path.sub_attr
                            .as_deref()
                            .is_some_and(|name| name.eq_ignore_ascii_case(&sub.name))
                    }))
        })
    }
}

/// Keep the sub-attributes of a complex value (or of each entry of a
/// multi-valued one) that are returnable and accepted by `keep`.
///
/// Returns `None` when nothing is left.
fn retain_sub_attributes<F>(attr: &AttributeDefinition, value: Value, keep: F) -> Option<Value>
where
    F: Fn(&AttributeDefinition) -> bool,
{
    if !attr.is_complex() {
        return Some(value);
    }

    let filter_entry = |entry: Value| -> Option<Value> {
        let Value::Object(obj) = entry else {
            return Some(entry);
        };
        let kept: Map<String, Value> = obj
            .into_iter()
            .filter(|(key, _)| {
                attr.sub_attribute(key)
                    .is_none_or(|sub| sub.is_returnable() && keep(sub))
            })
            .collect();
        (!kept.is_empty()).then_some(Value::Object(kept))
    };

    match value {
        Value::Array(entries) => {
            let kept: Vec<Value> = entries.into_iter().filter_map(filter_entry).collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        other => filter_entry(other),
    }
}
