use super::{Page, SortSpec};
use crate::filter::{CompiledFilter, attribute_values, compare_stored};
use crate::resource::attributes::get_ci;
use crate::resource::{Resource, SortOrder};
use crate::schema::{AttributeDefinition, ResourceTypeDefinition};
use log::debug;
use serde_json::Value;
use std::cmp::Ordering;

/// Filter, sort and paginate a collection of one resource type.
pub struct QueryPipeline;

impl QueryPipeline {
    /// Run the three stages in order.
    ///
    /// * `start_index` is 1-based; anything at or below 1 starts at the beginning.
    /// * `count` at or below 0 means no limit.
    /// * Without a sort spec, collection order is preserved. Resources missing
    ///   the sort attribute go last in either direction.
    ///
    /// A `start_index` past the end yields an empty page.
    pub fn execute(
        definition: &ResourceTypeDefinition,
        collection: Vec<Resource>,
        filter: Option<&CompiledFilter>,
        sort: Option<&SortSpec>,
        start_index: i64,
        count: i64,
    ) -> Page<Resource> {
        let scanned = collection.len();
        let mut matched: Vec<Resource> = match filter {
            Some(filter) => {
                let predicate = filter.predicate(definition);
                collection.into_iter().filter(|r| predicate(r)).collect()
            }
            None => collection,
        };
        debug!(
            "Query on {}: {} of {} resources matched{}",
            definition.name,
            matched.len(),
            scanned,
            filter
                .map(|f| format!(" filter '{}'", f.source()))
                .unwrap_or_default()
        );

        if let Some(sort) = sort {
            matched = sort_resources(definition, matched, sort);
        }

        let total_results = matched.len();
        let start = start_index.max(1);
        let skip = usize::try_from(start - 1).unwrap_or(usize::MAX);
        let take = usize::try_from(count)
            .ok()
            .filter(|&count| count > 0)
            .unwrap_or(usize::MAX);

        Page {
            resources: matched.into_iter().skip(skip).take(take).collect(),
            total_results,
            start_index: usize::try_from(start).unwrap_or(usize::MAX),
        }
    }
}

fn sort_resources(
    definition: &ResourceTypeDefinition,
    resources: Vec<Resource>,
    sort: &SortSpec,
) -> Vec<Resource> {
    let mut keyed: Vec<(Option<(&AttributeDefinition, Value)>, Resource)> = resources
        .into_iter()
        .map(|resource| (sort_key(definition, &resource, sort), resource))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some((leaf, x)), Some((_, y))) => {
            let ordering = compare_stored(leaf, x, y);
            match sort.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, resource)| resource).collect()
}

/// The value a resource sorts by: the primary entry of a multi-valued
/// attribute (else the first), reduced to its `value` sub-attribute when complex.
fn sort_key<'d>(
    definition: &'d ResourceTypeDefinition,
    resource: &Resource,
    sort: &SortSpec,
) -> Option<(&'d AttributeDefinition, Value)> {
    let leaf = definition
        .resolve(sort.path.schema.as_deref(), &sort.path.attr, sort.path.sub_attr.as_deref())?
        .leaf();
    let (_, values) = attribute_values(resource, definition, &sort.path)?;

    let chosen = values
        .iter()
        .find(|value| {
            value
                .as_object()
                .and_then(|obj| get_ci(obj, "primary"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .or_else(|| values.first())?;

    if !leaf.is_complex() {
        return (!chosen.is_null()).then(|| (leaf, chosen.clone().into_owned()));
    }
    let value = chosen.as_object().and_then(|obj| get_ci(obj, "value"))?.clone();
    Some((leaf.sub_attribute("value").unwrap_or(leaf), value))
}
