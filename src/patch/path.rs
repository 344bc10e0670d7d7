//! Resolution of PATCH `path` values against a resource type.

use crate::error::{ScimError, ScimResult};
use crate::filter::{AttrPath, parse_attr_path};
use crate::schema::ResourceTypeDefinition;

/// What a PATCH path addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchTarget {
    /// An attribute, sub-attribute or filtered multi-valued entry
    Attribute(AttrPath),
    /// A whole extension block, addressed by its schema URI
    Extension(String),
}

/// Parse `path` and check that it names something the definition knows.
///
/// A path qualified with the core schema URI is reduced to the bare attribute.
pub fn resolve_path(definition: &ResourceTypeDefinition, path: &str) -> ScimResult<PatchTarget> {
    let trimmed = path.trim();
    if let Some(extension) = definition.extension(trimmed) {
        return Ok(PatchTarget::Extension(extension.schema_id.clone()));
    }

    let mut parsed =
        parse_attr_path(trimmed).map_err(|e| ScimError::invalid_path(path, e.to_string()))?;
    if parsed
        .schema
        .as_deref()
        .is_some_and(|schema| schema.eq_ignore_ascii_case(&definition.schema_id))
    {
        parsed.schema = None;
    }

    let resolved = definition
        .resolve(
            parsed.schema.as_deref(),
            &parsed.attr,
            parsed.sub_attr.as_deref(),
        )
        .ok_or_else(|| {
            ScimError::invalid_path(path, format!("Unknown attribute for {}", definition.name))
        })?;

    if parsed.value_filter.is_some()
        && !(resolved.attribute.multi_valued && resolved.attribute.is_complex())
    {
        return Err(ScimError::invalid_path(
            path,
            "Value filters apply only to multi-valued complex attributes",
        ));
    }

    Ok(PatchTarget::Attribute(parsed))
}
