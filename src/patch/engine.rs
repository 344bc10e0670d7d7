//! Application of PATCH operations under mutability and multiplicity rules.

use super::path::{PatchTarget, resolve_path};
use super::{PatchOpKind, PatchOperation};
use crate::error::{ScimError, ScimResult, ValidationError};
use crate::filter::{AttrPath, matches_entry};
use crate::outcome::Outcome;
use crate::resource::Resource;
use crate::resource::attributes::{get_ci, get_ci_mut, insert_ci, key_ci, remove_ci, same_entry};
use crate::resource::value_kind;
use crate::schema::{AttributeDefinition, Mutability, ResourceTypeDefinition};
use chrono::Utc;
use log::{debug, trace};
use serde_json::{Map, Value};

/// Applies ordered PATCH operations to a copy of a resource.
pub struct PatchEngine;

impl PatchEngine {
    /// Apply `operations` in order as a single unit.
    ///
    /// On success the patched copy has been re-validated, its `lastModified`
    /// refreshed and its version recomputed; `id` and `created` are carried
    /// over untouched. On failure the error names the first rejected
    /// operation and `resource` is unchanged.
    pub fn apply(
        definition: &ResourceTypeDefinition,
        resource: &Resource,
        operations: &[PatchOperation],
    ) -> Outcome<Resource> {
        apply_all(definition, resource, operations).into()
    }
}

fn apply_all(
    definition: &ResourceTypeDefinition,
    resource: &Resource,
    operations: &[PatchOperation],
) -> ScimResult<Resource> {
    let Value::Object(mut doc) = resource.to_json() else {
        return Err(ScimError::internal("Resource did not serialize to an object"));
    };

    for (index, operation) in operations.iter().enumerate() {
        trace!("PATCH operation {}: {:?}", index, operation);
        apply_operation(definition, &mut doc, operation).inspect_err(|e| {
            debug!(
                "PATCH operation {} ({} {}) rejected: {}",
                index,
                operation.op,
                operation.path.as_deref().unwrap_or("<none>"),
                e
            );
        })?;
    }

    let mut patched = Resource::from_json(resource.resource_type.clone(), Value::Object(doc))?;
    patched.id = resource.id.clone();
    patched.meta = resource.meta.clone();
    patched.normalize_schemas(definition);
    definition.validate(&patched)?;
    patched.stamp_modified(Utc::now());
    Ok(patched)
}

fn apply_operation(
    definition: &ResourceTypeDefinition,
    doc: &mut Map<String, Value>,
    operation: &PatchOperation,
) -> ScimResult<()> {
    operation.validate()?;
    let op = operation.op;

    let Some(path_text) = operation.path.as_deref() else {
        let value = operation.value.as_ref().unwrap_or(&Value::Null);
        return merge_document(definition, doc, op, value);
    };

    match resolve_path(definition, path_text)? {
        PatchTarget::Extension(schema_id) => {
            apply_to_extension(definition, doc, &schema_id, op, operation.value.as_ref(), path_text)
        }
        PatchTarget::Attribute(path) => {
            let resolved = definition
                .resolve(path.schema.as_deref(), &path.attr, path.sub_attr.as_deref())
                .ok_or_else(|| ScimError::invalid_path(path_text, "Unknown attribute"))?;
            let container = container_mut(doc, resolved.extension, op != PatchOpKind::Remove);
            let Some(container) = container else {
                // Removing from an extension block that is not there
                return Ok(());
            };
            apply_to_attribute(
                container,
                resolved.attribute,
                &path,
                resolved.sub_attribute,
                op,
                operation.value.as_ref(),
                path_text,
            )
        }
    }
}

/// Path-less `add`/`replace`: every key of the value object is a target.
fn merge_document(
    definition: &ResourceTypeDefinition,
    doc: &mut Map<String, Value>,
    op: PatchOpKind,
    value: &Value,
) -> ScimResult<()> {
    let Value::Object(entries) = value else {
        return Err(ValidationError::invalid_type("value", "complex", value_kind(value)).into());
    };

    for (key, item) in entries {
        if key.eq_ignore_ascii_case("schemas") {
            continue;
        }
        if let Some(extension) = definition.extension(key) {
            let schema_id = extension.schema_id.clone();
            apply_to_extension(definition, doc, &schema_id, op, Some(item), key)?;
            continue;
        }
        let attr = definition
            .attribute(key)
            .ok_or_else(|| ScimError::invalid_path(key, "Unknown attribute"))?;
        apply_to_attribute(doc, attr, &AttrPath::simple(key), None, op, Some(item), key)?;
    }
    Ok(())
}

fn apply_to_extension(
    definition: &ResourceTypeDefinition,
    doc: &mut Map<String, Value>,
    schema_id: &str,
    op: PatchOpKind,
    value: Option<&Value>,
    path_text: &str,
) -> ScimResult<()> {
    let Some(extension) = definition.extension(schema_id) else {
        return Err(ScimError::invalid_path(path_text, "Unknown extension schema"));
    };

    if op == PatchOpKind::Remove {
        let Some(block) = container_mut(doc, Some(schema_id), false) else {
            return Ok(());
        };
        for attr in &extension.attributes {
            if let Some(current) = get_ci(block, &attr.name) {
                check_mutability(attr, Some(current), None, path_text)?;
            }
        }
        if let Some(key) = key_ci(doc, schema_id).cloned() {
            doc.remove(&key);
        }
        return Ok(());
    }

    let value = value.unwrap_or(&Value::Null);
    let Value::Object(entries) = value else {
        return Err(ValidationError::invalid_type(path_text, "complex", value_kind(value)).into());
    };
    let Some(block) = container_mut(doc, Some(schema_id), true) else {
        return Err(ScimError::internal("Extension block could not be created"));
    };
    for (key, item) in entries {
        let attr = extension
            .attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| ScimError::invalid_path(format!("{}:{}", schema_id, key), "Unknown attribute"))?;
        apply_to_attribute(block, attr, &AttrPath::simple(key), None, op, Some(item), key)?;
    }
    Ok(())
}

/// The map holding the core attributes or one extension block.
fn container_mut<'d>(
    doc: &'d mut Map<String, Value>,
    extension: Option<&str>,
    create: bool,
) -> Option<&'d mut Map<String, Value>> {
    let Some(schema_id) = extension else {
        return Some(doc);
    };
    if key_ci(doc, schema_id).is_none() {
        if !create {
            return None;
        }
        doc.insert(schema_id.to_string(), Value::Object(Map::new()));
    }
    get_ci_mut(doc, schema_id).and_then(Value::as_object_mut)
}

fn apply_to_attribute(
    container: &mut Map<String, Value>,
    attr: &AttributeDefinition,
    path: &AttrPath,
    sub: Option<&AttributeDefinition>,
    op: PatchOpKind,
    value: Option<&Value>,
    path_text: &str,
) -> ScimResult<()> {
    let before = get_ci(container, &attr.name).cloned();
    let mut current = before.clone().unwrap_or(Value::Null);
    let value = value.unwrap_or(&Value::Null);

    let touched = match (&path.value_filter, sub) {
        (None, None) => modify_whole(attr, op, value, &mut current, path_text)?,
        (None, Some(sub)) => modify_sub_attribute(attr, sub, op, value, &mut current, path_text)?,
        (Some(filter), sub) => {
            modify_filtered(attr, path, filter, sub, op, value, &mut current, path_text)?
        }
    };
    if attr.multi_valued && op != PatchOpKind::Remove {
        enforce_single_primary(&mut current, &touched);
    }

    let after = match current {
        Value::Null => None,
        Value::Array(ref items) if items.is_empty() => None,
        other => Some(other),
    };

    check_mutability(attr, before.as_ref(), after.as_ref(), path_text)?;
    match sub {
        Some(sub) => check_mutability(sub, before.as_ref(), after.as_ref(), path_text)?,
        None => check_sub_mutability(attr, before.as_ref(), after.as_ref(), path_text)?,
    }

    match after {
        Some(value) => insert_ci(container, &attr.name, value),
        None => {
            remove_ci(container, &attr.name);
        }
    }
    Ok(())
}

/// Reject changes to readOnly values, and to immutable values that are already set.
/// Identical values are always accepted.
fn check_mutability(
    attr: &AttributeDefinition,
    before: Option<&Value>,
    after: Option<&Value>,
    path_text: &str,
) -> ScimResult<()> {
    if before == after {
        return Ok(());
    }
    match attr.mutability {
        Mutability::ReadOnly => Err(ScimError::mutability(path_text, attr.mutability)),
        Mutability::Immutable if before.is_some() => {
            Err(ScimError::mutability(path_text, attr.mutability))
        }
        _ => Ok(()),
    }
}

/// A complex value written as a whole must respect the mutability of its
/// sub-attributes. Each written entry is compared with the stored one it
/// replaces: the single value, or the multi-valued entry holding the same
/// `value`. Unchanged entries and omitted sub-attributes are not checked.
fn check_sub_mutability(
    attr: &AttributeDefinition,
    before: Option<&Value>,
    after: Option<&Value>,
    path_text: &str,
) -> ScimResult<()> {
    let guarded: Vec<&AttributeDefinition> = attr
        .sub_attributes
        .iter()
        .filter(|sub| matches!(sub.mutability, Mutability::ReadOnly | Mutability::Immutable))
        .collect();
    let Some(after) = after else {
        return Ok(());
    };
    if guarded.is_empty() || before == Some(after) {
        return Ok(());
    }

    let stored = entries(before);
    for entry in entries(Some(after)) {
        if stored.contains(&entry) {
            continue;
        }
        let previous = if attr.multi_valued {
            stored.iter().copied().find(|old| same_entry(old, entry))
        } else {
            stored.first().copied()
        };
        for sub in &guarded {
            let Some(written) = get_ci(entry, &sub.name) else {
                continue;
            };
            let old = previous.and_then(|p| get_ci(p, &sub.name));
            check_mutability(sub, old, Some(written), &format!("{}.{}", path_text, sub.name))?;
        }
    }
    Ok(())
}

fn entries(value: Option<&Value>) -> Vec<&Map<String, Value>> {
    match value {
        Some(Value::Object(obj)) => vec![obj],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// Operation on the attribute as a whole. Returns the indices of entries it
/// added or replaced.
fn modify_whole(
    attr: &AttributeDefinition,
    op: PatchOpKind,
    value: &Value,
    current: &mut Value,
    path_text: &str,
) -> ScimResult<Vec<usize>> {
    if op == PatchOpKind::Remove {
        *current = Value::Null;
        return Ok(Vec::new());
    }

    if attr.multi_valued {
        let incoming = match value {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            single => vec![single.clone()],
        };
        if op == PatchOpKind::Replace {
            let touched = (0..incoming.len()).collect();
            *current = Value::Array(incoming);
            return Ok(touched);
        }

        let entries = ensure_array(current);
        let mut touched = Vec::new();
        for item in incoming {
            if !entries.contains(&item) {
                entries.push(item);
                touched.push(entries.len() - 1);
            }
        }
        return Ok(touched);
    }

    if attr.is_complex() {
        let Value::Object(incoming) = value else {
            return Err(ValidationError::invalid_type(path_text, "complex", value_kind(value)).into());
        };
        let target = ensure_object(current);
        for (key, item) in incoming {
            insert_ci(target, key, item.clone());
        }
        return Ok(Vec::new());
    }

    *current = value.clone();
    Ok(Vec::new())
}

/// `attr.sub` without a value filter: the complex value, or every entry of a
/// multi-valued one.
fn modify_sub_attribute(
    attr: &AttributeDefinition,
    sub: &AttributeDefinition,
    op: PatchOpKind,
    value: &Value,
    current: &mut Value,
    path_text: &str,
) -> ScimResult<Vec<usize>> {
    if !attr.multi_valued {
        if op == PatchOpKind::Remove {
            if let Value::Object(obj) = current {
                remove_ci(obj, &sub.name);
                if obj.is_empty() {
                    *current = Value::Null;
                }
            }
        } else {
            insert_ci(ensure_object(current), &sub.name, value.clone());
        }
        return Ok(Vec::new());
    }

    let entries = ensure_array(current);
    if entries.is_empty() {
        return match op {
            PatchOpKind::Remove => Ok(Vec::new()),
            _ => Err(ScimError::no_target(path_text)),
        };
    }
    for entry in entries.iter_mut() {
        let obj = ensure_object(entry);
        if op == PatchOpKind::Remove {
            remove_ci(obj, &sub.name);
        } else {
            insert_ci(obj, &sub.name, value.clone());
        }
    }
    Ok((0..entries.len()).collect())
}

/// `attr[filter]` or `attr[filter].sub` on a multi-valued complex attribute.
#[allow(clippy::too_many_arguments)]
fn modify_filtered(
    attr: &AttributeDefinition,
    path: &AttrPath,
    filter: &crate::filter::Filter,
    sub: Option<&AttributeDefinition>,
    op: PatchOpKind,
    value: &Value,
    current: &mut Value,
    path_text: &str,
) -> ScimResult<Vec<usize>> {
    let entries = ensure_array(current);
    let matched: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| {
            entry
                .as_object()
                .is_some_and(|obj| matches_entry(filter, obj, attr))
        })
        .map(|(index, _)| index)
        .collect();

    if matched.is_empty() {
        if op != PatchOpKind::Add {
            return Err(ScimError::no_target(path_text));
        }
        // Seed a new entry from the filter's equality criteria.
        let mut entry = Map::new();
        for (name, literal) in path.equality_criteria() {
            let key = attr
                .sub_attribute(name)
                .map(|sub| sub.name.clone())
                .unwrap_or_else(|| name.to_string());
            entry.insert(key, literal.to_json());
        }
        match sub {
            Some(sub) => {
                entry.insert(sub.name.clone(), value.clone());
            }
            None => merge_into(&mut entry, value, path_text)?,
        }
        entries.push(Value::Object(entry));
        return Ok(vec![entries.len() - 1]);
    }

    match (op, sub) {
        (PatchOpKind::Remove, None) => {
            let mut index = 0;
            entries.retain(|_| {
                let keep = !matched.contains(&index);
                index += 1;
                keep
            });
            Ok(Vec::new())
        }
        (PatchOpKind::Remove, Some(sub)) => {
            for &index in &matched {
                if let Some(obj) = entries[index].as_object_mut() {
                    remove_ci(obj, &sub.name);
                }
            }
            Ok(Vec::new())
        }
        (_, Some(sub)) => {
            for &index in &matched {
                insert_ci(ensure_object(&mut entries[index]), &sub.name, value.clone());
            }
            Ok(matched)
        }
        (PatchOpKind::Replace, None) => {
            let Value::Object(replacement) = value else {
                return Err(ValidationError::invalid_type(path_text, "complex", value_kind(value)).into());
            };
            for &index in &matched {
                entries[index] = Value::Object(replacement.clone());
            }
            Ok(matched)
        }
        (_, None) => {
            for &index in &matched {
                merge_into(ensure_object(&mut entries[index]), value, path_text)?;
            }
            Ok(matched)
        }
    }
}

fn merge_into(target: &mut Map<String, Value>, value: &Value, path_text: &str) -> ScimResult<()> {
    let Value::Object(incoming) = value else {
        return Err(ValidationError::invalid_type(path_text, "complex", value_kind(value)).into());
    };
    for (key, item) in incoming {
        insert_ci(target, key, item.clone());
    }
    Ok(())
}

/// When a touched entry is primary, demote every other entry.
fn enforce_single_primary(current: &mut Value, touched: &[usize]) {
    let Value::Array(entries) = current else {
        return;
    };
    let is_primary = |entry: &Value| {
        entry
            .as_object()
            .and_then(|obj| get_ci(obj, "primary"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    let Some(&winner) = touched
        .iter()
        .rev()
        .find(|&&index| entries.get(index).is_some_and(is_primary))
    else {
        return;
    };
    for (index, entry) in entries.iter_mut().enumerate() {
        if index != winner && is_primary(&*entry) {
            if let Some(obj) = entry.as_object_mut() {
                insert_ci(obj, "primary", Value::Bool(false));
            }
        }
    }
}

fn ensure_array(value: &mut Value) -> &mut Vec<Value> {
    if !value.is_array() {
        *value = match std::mem::take(value) {
            Value::Null => Value::Array(Vec::new()),
            single => Value::Array(vec![single]),
        };
    }
    match value {
        Value::Array(items) => items,
        _ => unreachable!("value was just made an array"),
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(obj) => obj,
        _ => unreachable!("value was just made an object"),
    }
}
