//! Mutability rules for whole-resource writes (create and replace).
//!
//! PATCH enforces mutability per operation inside the patch engine. Create
//! and replace carry a full representation instead, so the rules apply per
//! attribute here:
//!
//! * `readOnly` values sent by the client are dropped on create and replaced
//!   by the stored ones on replace. Inside complex values the same holds per
//!   sub-attribute, pairing multi-valued entries by their `value`.
//! * `immutable` values may be set while unset; once stored, a replace must
//!   send the same value or leave it out.

use crate::error::{ScimError, ScimResult};
use crate::resource::Resource;
use crate::resource::attributes::{get_ci, get_ci_mut, insert_ci, remove_ci, same_entry};
use crate::schema::{AttributeDefinition, Mutability, ResourceTypeDefinition};
use serde_json::{Map, Value};

/// Drop client-supplied `readOnly` attributes from a new resource.
pub fn strip_read_only(definition: &ResourceTypeDefinition, resource: &mut Resource) {
    resource.id = None;
    resource.meta = None;

    let strip = |attributes: &[AttributeDefinition], block: &mut Map<String, Value>| {
        for attr in attributes {
            if attr.mutability == Mutability::ReadOnly {
                remove_ci(block, &attr.name);
            } else {
                restore_read_only_subs(block, attr, None);
            }
        }
    };
    strip(definition.attributes.as_slice(), &mut resource.attributes);
    for extension in &definition.extensions {
        if let Some((_, block)) = resource
            .extensions
            .iter_mut()
            .find(|(uri, _)| uri.eq_ignore_ascii_case(&extension.schema_id))
        {
            strip(extension.attributes.as_slice(), block);
        }
    }
}

/// Merge `stored` server-owned values into `incoming` for a full replace.
///
/// Returns `Mutability` when `incoming` changes an immutable value that is
/// already set.
pub fn carry_over(
    definition: &ResourceTypeDefinition,
    stored: &Resource,
    mut incoming: Resource,
) -> ScimResult<Resource> {
    incoming.id = stored.id.clone();
    incoming.meta = stored.meta.clone();

    for_each_block(definition, &mut incoming, |extension, attributes, block| {
        for attr in attributes {
            apply_rule(block, attr, stored.value_of(extension, &attr.name))?;
        }
        Ok(())
    })?;
    Ok(incoming)
}

fn apply_rule(
    block: &mut Map<String, Value>,
    attr: &AttributeDefinition,
    previous: Option<&Value>,
) -> ScimResult<()> {
    if attr.mutability != Mutability::ReadOnly {
        restore_read_only_subs(block, attr, previous);
    }
    match attr.mutability {
        Mutability::ReadOnly => {
            match previous {
                Some(value) => insert_ci(block, &attr.name, value.clone()),
                None => {
                    remove_ci(block, &attr.name);
                }
            }
            Ok(())
        }
        Mutability::Immutable => match (previous, get_ci(block, &attr.name)) {
            (Some(old), Some(new)) if old != new => {
                Err(ScimError::mutability(attr.name.clone(), attr.mutability))
            }
            (Some(old), None) => {
                insert_ci(block, &attr.name, old.clone());
                Ok(())
            }
            _ => Ok(()),
        },
        Mutability::ReadWrite | Mutability::WriteOnly => Ok(()),
    }
}

/// Reset the readOnly sub-attributes of `attr`'s value in `block` to what
/// `previous` held, removing those it did not hold.
fn restore_read_only_subs(block: &mut Map<String, Value>, attr: &AttributeDefinition, previous: Option<&Value>) {
    let subs: Vec<&AttributeDefinition> = attr
        .sub_attributes
        .iter()
        .filter(|sub| sub.mutability == Mutability::ReadOnly)
        .collect();
    if subs.is_empty() {
        return;
    }
    let restore = |entry: &mut Map<String, Value>, stored: Option<&Map<String, Value>>| {
        for sub in &subs {
            match stored.and_then(|s| get_ci(s, &sub.name)) {
                Some(value) => insert_ci(entry, &sub.name, value.clone()),
                None => {
                    remove_ci(entry, &sub.name);
                }
            }
        }
    };

    match get_ci_mut(block, &attr.name) {
        Some(Value::Object(entry)) => restore(entry, previous.and_then(Value::as_object)),
        Some(Value::Array(items)) => {
            let stored: Vec<&Map<String, Value>> = match previous {
                Some(Value::Array(old)) => old.iter().filter_map(Value::as_object).collect(),
                _ => Vec::new(),
            };
            for entry in items.iter_mut().filter_map(Value::as_object_mut) {
                let paired = stored.iter().copied().find(|old| same_entry(old, &*entry));
                restore(entry, paired);
            }
        }
        _ => {}
    }
}

/// Visit the core attributes and each extension block with their definitions.
///
/// Extension blocks are created empty when missing so rules can restore
/// values into them; empty blocks are dropped again afterwards.
fn for_each_block<F>(
    definition: &ResourceTypeDefinition,
    resource: &mut Resource,
    mut visit: F,
) -> ScimResult<()>
where
    F: FnMut(Option<&str>, &[AttributeDefinition], &mut Map<String, Value>) -> ScimResult<()>,
{
    visit(None, definition.attributes.as_slice(), &mut resource.attributes)?;

    for extension in &definition.extensions {
        let key = resource
            .extensions
            .keys()
            .find(|uri| uri.eq_ignore_ascii_case(&extension.schema_id))
            .cloned()
            .unwrap_or_else(|| extension.schema_id.clone());
        let mut block = resource.extensions.remove(&key).unwrap_or_default();
        let result = visit(
            Some(extension.schema_id.as_str()),
            extension.attributes.as_slice(),
            &mut block,
        );
        if !block.is_empty() {
            resource.extensions.insert(key, block);
        }
        result?;
    }
    Ok(())
}
