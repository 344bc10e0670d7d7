//! List queries: filter, then sort, then paginate.
//!
//! [`QueryPipeline::execute`] is the single place that decides the order in
//! which the three stages run. Repositories hand it their whole collection in
//! store order; the pipeline never reorders what the sort did not.

mod pipeline;

pub use pipeline::QueryPipeline;

use crate::error::{ScimError, ScimResult};
use crate::filter::{AttrPath, parse_attr_path};
use crate::resource::SortOrder;
use serde::Serialize;
use serde_json::Value;

/// Schema URI of a list response body.
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// Schema URI of a `POST .search` request body.
pub const SEARCH_REQUEST_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:SearchRequest";

/// `sortBy` / `sortOrder` after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub path: AttrPath,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(path: AttrPath, order: SortOrder) -> Self {
        Self { path, order }
    }

    /// Parse a `sortBy` attribute path. Value filters are not allowed here.
    pub fn parse(sort_by: &str, order: Option<SortOrder>) -> ScimResult<Self> {
        let path = parse_attr_path(sort_by.trim())
            .map_err(|e| ScimError::invalid_path(sort_by, e.to_string()))?;
        if path.value_filter.is_some() {
            return Err(ScimError::invalid_path(
                sort_by,
                "sortBy does not accept value filters",
            ));
        }
        Ok(Self::new(path, order.unwrap_or_default()))
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub resources: Vec<T>,
    /// Matches before pagination
    pub total_results: usize,
    /// 1-based index of the first element of `resources`
    pub start_index: usize,
}

impl<T> Page<T> {
    pub fn items_per_page(&self) -> usize {
        self.resources.len()
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            resources: self.resources.into_iter().map(f).collect(),
            total_results: self.total_results,
            start_index: self.start_index,
        }
    }
}

/// The `ListResponse` envelope (RFC 7644 §3.4.2).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub schemas: Vec<String>,
    pub total_results: usize,
    pub start_index: usize,
    pub items_per_page: usize,
    #[serde(rename = "Resources")]
    pub resources: Vec<Value>,
}

impl From<Page<Value>> for ListResponse {
    fn from(page: Page<Value>) -> Self {
        Self {
            schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
            total_results: page.total_results,
            start_index: page.start_index,
            items_per_page: page.items_per_page(),
            resources: page.resources,
        }
    }
}
