//! Schema discovery: the `/Schemas` and `/ResourceTypes` documents.

use super::core::ScimServer;
use crate::error::{ScimError, ScimResult};
use crate::query::{ListResponse, Page};
use crate::storage::ResourceRepository;
use serde_json::Value;

/// Schema URI of a `/Schemas` entry.
pub const SCHEMA_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

/// Schema URI of a `/ResourceTypes` entry.
pub const RESOURCE_TYPE_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";

impl<R: ResourceRepository> ScimServer<R> {
    /// Every registered schema document, resource types and extensions alike.
    pub fn schema_documents(&self) -> ScimResult<Vec<Value>> {
        self.registry()
            .schemas()
            .into_iter()
            .map(|schema| -> ScimResult<Value> {
                Ok(with_schema(serde_json::to_value(&schema)?, SCHEMA_SCHEMA))
            })
            .collect()
    }

    /// One schema document by its URI, ignoring case.
    pub fn schema_document(&self, schema_id: &str) -> ScimResult<Value> {
        self.schema_documents()?
            .into_iter()
            .find(|doc| {
                doc["id"]
                    .as_str()
                    .is_some_and(|id| id.eq_ignore_ascii_case(schema_id))
            })
            .ok_or_else(|| ScimError::resource_not_found("Schema", schema_id))
    }

    /// Every served resource type.
    pub fn resource_type_documents(&self) -> Vec<Value> {
        self.registry()
            .resource_types()
            .filter_map(|def| def.to_resource_type_json())
            .map(|document| with_schema(document, RESOURCE_TYPE_SCHEMA))
            .collect()
    }

    /// One resource type by name or endpoint.
    pub fn resource_type_document(&self, name: &str) -> ScimResult<Value> {
        self.registry()
            .resource_type(name)
            .and_then(|def| def.to_resource_type_json())
            .map(|document| with_schema(document, RESOURCE_TYPE_SCHEMA))
            .ok_or_else(|| ScimError::resource_not_found("ResourceType", name))
    }
}

fn with_schema(mut document: Value, schema_uri: &str) -> Value {
    if let Value::Object(map) = &mut document {
        map.insert("schemas".to_string(), Value::from(vec![schema_uri]));
    }
    document
}

/// Wrap a complete discovery listing in a list response.
pub(super) fn listing(documents: Vec<Value>) -> ListResponse {
    let total_results = documents.len();
    ListResponse::from(Page {
        resources: documents,
        total_results,
        start_index: 1,
    })
}
