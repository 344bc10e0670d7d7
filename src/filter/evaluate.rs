//! Schema-aware filter evaluation.
//!
//! Paths are resolved against the resource's [`ResourceTypeDefinition`], so
//! literals are compared according to the attribute's declared kind and
//! `caseExact` flag rather than the JSON type the client happened to send.
//! A path that does not resolve evaluates to `false`; it never errors.

use super::{AttrPath, CompareOp, Filter, FilterLimits, FilterParseError, FilterValue};
use crate::resource::Resource;
use crate::resource::attributes::{get_ci, is_present, remove_ci};
use crate::schema::{AttributeDefinition, AttributeType, ResourceTypeDefinition};
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// A filter parsed once and evaluated many times.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    source: String,
    expression: Filter,
}

impl CompiledFilter {
    pub fn compile(source: &str) -> Result<Self, FilterParseError> {
        Self::compile_with(source, FilterLimits::default())
    }

    pub fn compile_with(source: &str, limits: FilterLimits) -> Result<Self, FilterParseError> {
        let expression = super::parse_filter_with(source, limits)?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Filter {
        &self.expression
    }

    pub fn matches(&self, resource: &Resource, definition: &ResourceTypeDefinition) -> bool {
        evaluate(&self.expression, resource, definition)
    }

    /// Bind the filter to a definition, yielding a reusable predicate.
    pub fn predicate<'a>(
        &'a self,
        definition: &'a ResourceTypeDefinition,
    ) -> impl Fn(&Resource) -> bool + 'a {
        move |resource| self.matches(resource, definition)
    }
}

/// Evaluate `filter` against a resource of the given type.
pub fn evaluate(filter: &Filter, resource: &Resource, definition: &ResourceTypeDefinition) -> bool {
    evaluate_in(filter, Scope::Resource(resource, definition))
}

/// Evaluate a value filter (`emails[type eq "work"]`) against one entry of a
/// multi-valued complex attribute.
pub fn matches_entry(filter: &Filter, entry: &Map<String, Value>, parent: &AttributeDefinition) -> bool {
    evaluate_in(filter, Scope::Entry(entry, parent))
}

#[derive(Clone, Copy)]
enum Scope<'a> {
    Resource(&'a Resource, &'a ResourceTypeDefinition),
    /// One complex value; paths name its sub-attributes
    Entry(&'a Map<String, Value>, &'a AttributeDefinition),
}

fn evaluate_in(filter: &Filter, scope: Scope<'_>) -> bool {
    match filter {
        Filter::And(left, right) => evaluate_in(left, scope) && evaluate_in(right, scope),
        Filter::Or(left, right) => evaluate_in(left, scope) || evaluate_in(right, scope),
        Filter::Not(inner) => !evaluate_in(inner, scope),
        Filter::Present { attr } => select(scope, attr)
            .is_some_and(|(_, values)| values.iter().any(|value| is_present(value))),
        Filter::Compare { attr, op, value } => match select(scope, attr) {
            Some((leaf, values)) => compare_all(leaf, *op, &values, value),
            None => false,
        },
    }
}

fn compare_all(
    leaf: &AttributeDefinition,
    op: CompareOp,
    values: &[Cow<'_, Value>],
    literal: &FilterValue,
) -> bool {
    // A bare complex attribute compares through its "value" sub-attribute.
    if leaf.is_complex() {
        let Some(value_attr) = leaf.sub_attribute("value") else {
            return false;
        };
        let inner: Vec<Cow<'_, Value>> = values
            .iter()
            .filter_map(|entry| entry.as_object().and_then(|obj| get_ci(obj, "value")))
            .map(Cow::Borrowed)
            .collect();
        return compare_all(value_attr, op, &inner, literal);
    }

    match (op, literal) {
        (CompareOp::Eq, FilterValue::Null) => !values.iter().any(|value| is_present(value)),
        (CompareOp::Ne, FilterValue::Null) => values.iter().any(|value| is_present(value)),
        (_, FilterValue::Null) => false,
        (CompareOp::Ne, _) => !values
            .iter()
            .any(|value| compare_one(leaf, CompareOp::Eq, value, literal)),
        _ => values
            .iter()
            .any(|value| compare_one(leaf, op, value, literal)),
    }
}

/// Resolve a path within a scope: the leaf definition plus every value it selects.
fn select<'a>(
    scope: Scope<'a>,
    path: &AttrPath,
) -> Option<(&'a AttributeDefinition, Vec<Cow<'a, Value>>)> {
    match scope {
        Scope::Resource(resource, definition) => attribute_values(resource, definition, path),
        Scope::Entry(entry, parent) => {
            if path.sub_attr.is_some() || path.value_filter.is_some() {
                return None;
            }
            let leaf = parent.sub_attribute(&path.attr)?;
            let values = get_ci(entry, &leaf.name)
                .map(|value| flatten(Cow::Borrowed(value)))
                .unwrap_or_default();
            Some((leaf, values))
        }
    }
}

/// Every value a path selects on a resource, with arrays flattened, value
/// filters applied and sub-attributes projected.
///
/// Returns `None` when the path does not resolve against the definition.
pub(crate) fn attribute_values<'a>(
    resource: &'a Resource,
    definition: &'a ResourceTypeDefinition,
    path: &AttrPath,
) -> Option<(&'a AttributeDefinition, Vec<Cow<'a, Value>>)> {
    let resolved = definition.resolve(
        path.schema.as_deref(),
        &path.attr,
        path.sub_attr.as_deref(),
    )?;
    let attribute = resolved.attribute;

    let Some(raw) = raw_value(resource, resolved.extension, &attribute.name) else {
        return Some((resolved.leaf(), Vec::new()));
    };
    let mut values = flatten(raw);

    if let Some(filter) = &path.value_filter {
        if !attribute.is_complex() {
            return None;
        }
        values.retain(|entry| {
            entry
                .as_object()
                .is_some_and(|obj| matches_entry(filter, obj, attribute))
        });
    }

    if let Some(sub) = resolved.sub_attribute {
        values = values
            .into_iter()
            .filter_map(|entry| child(entry, &sub.name))
            .flat_map(flatten)
            .collect();
    }

    Some((resolved.leaf(), values))
}

/// The stored value of a top-level attribute, including envelope fields.
fn raw_value<'a>(resource: &'a Resource, extension: Option<&str>, name: &str) -> Option<Cow<'a, Value>> {
    if extension.is_none() {
        if name.eq_ignore_ascii_case("id") {
            return resource.id.clone().map(|id| Cow::Owned(Value::String(id)));
        }
        if name.eq_ignore_ascii_case("externalId") {
            return resource
                .external_id
                .clone()
                .map(|id| Cow::Owned(Value::String(id)));
        }
        if name.eq_ignore_ascii_case("meta") {
            return resource
                .meta
                .as_ref()
                .and_then(|meta| serde_json::to_value(meta).ok())
                .map(Cow::Owned);
        }
    }
    resource.value_of(extension, name).map(Cow::Borrowed)
}

fn flatten(value: Cow<'_, Value>) -> Vec<Cow<'_, Value>> {
    match value {
        Cow::Borrowed(Value::Array(items)) => items.iter().map(Cow::Borrowed).collect(),
        Cow::Owned(Value::Array(items)) => items.into_iter().map(Cow::Owned).collect(),
        other => vec![other],
    }
}

fn child<'a>(entry: Cow<'a, Value>, name: &str) -> Option<Cow<'a, Value>> {
    match entry {
        Cow::Borrowed(value) => value
            .as_object()
            .and_then(|obj| get_ci(obj, name))
            .map(Cow::Borrowed),
        Cow::Owned(Value::Object(mut obj)) => remove_ci(&mut obj, name).map(Cow::Owned),
        Cow::Owned(_) => None,
    }
}

/// Compare one stored (non-array) value with a literal, coercing the literal
/// to the attribute's kind.
fn compare_one(leaf: &AttributeDefinition, op: CompareOp, stored: &Value, literal: &FilterValue) -> bool {
    match leaf.data_type {
        AttributeType::Boolean => {
            let (Some(stored), Some(literal)) = (as_bool(stored), literal_bool(literal)) else {
                return false;
            };
            match op {
                CompareOp::Eq => stored == literal,
                CompareOp::Ne => stored != literal,
                _ => false,
            }
        }
        AttributeType::Integer | AttributeType::Decimal => {
            let (Some(stored), Some(literal)) = (as_number(stored), literal_number(literal)) else {
                return false;
            };
            stored
                .partial_cmp(&literal)
                .is_some_and(|ordering| ordered(op, ordering))
        }
        AttributeType::DateTime => {
            let (Some(stored), Some(literal)) = (stored.as_str(), literal_text(literal)) else {
                return false;
            };
            match (parse_datetime(stored), parse_datetime(&literal)) {
                (Some(a), Some(b)) => ordered(op, a.cmp(&b)),
                _ => compare_text(op, stored, &literal, leaf.case_exact),
            }
        }
        _ => {
            let (Some(stored), Some(literal)) = (as_text(stored), literal_text(literal)) else {
                return false;
            };
            compare_text(op, &stored, &literal, leaf.case_exact)
        }
    }
}

fn compare_text(op: CompareOp, stored: &str, literal: &str, case_exact: bool) -> bool {
    let (stored, literal) = if case_exact {
        (Cow::Borrowed(stored), Cow::Borrowed(literal))
    } else {
        (Cow::Owned(stored.to_lowercase()), Cow::Owned(literal.to_lowercase()))
    };
    match op {
        CompareOp::Co => stored.contains(literal.as_ref()),
        CompareOp::Sw => stored.starts_with(literal.as_ref()),
        CompareOp::Ew => stored.ends_with(literal.as_ref()),
        _ => ordered(op, stored.cmp(&literal)),
    }
}

fn ordered(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Co | CompareOp::Sw | CompareOp::Ew => false,
    }
}

/// Total order over stored values of one attribute, used for sorting.
pub(crate) fn compare_stored(leaf: &AttributeDefinition, a: &Value, b: &Value) -> Ordering {
    match leaf.data_type {
        AttributeType::Integer | AttributeType::Decimal => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        AttributeType::Boolean => as_bool(a).cmp(&as_bool(b)),
        AttributeType::DateTime => {
            let parsed = (
                a.as_str().and_then(parse_datetime),
                b.as_str().and_then(parse_datetime),
            );
            match parsed {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => text_order(leaf, a, b),
            }
        }
        _ => text_order(leaf, a, b),
    }
}

fn text_order(leaf: &AttributeDefinition, a: &Value, b: &Value) -> Ordering {
    match (as_text(a), as_text(b)) {
        (Some(x), Some(y)) if leaf.case_exact => x.cmp(&y),
        (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        _ => Ordering::Equal,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn literal_bool(literal: &FilterValue) -> Option<bool> {
    match literal {
        FilterValue::Bool(b) => Some(*b),
        FilterValue::String(s) => s.to_ascii_lowercase().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn literal_number(literal: &FilterValue) -> Option<f64> {
    match literal {
        FilterValue::Number(n) => Some(*n),
        FilterValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn literal_text(literal: &FilterValue) -> Option<String> {
    match literal {
        FilterValue::String(s) => Some(s.clone()),
        FilterValue::Bool(b) => Some(b.to_string()),
        FilterValue::Number(n) => Some(n.to_string()),
        FilterValue::Null => None,
    }
}

fn parse_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok()
}
