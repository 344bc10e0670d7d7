//! Repository contract between the engine and a resource store.
//!
//! The engine owns every SCIM rule; a repository only keeps resources and
//! enforces two things the engine cannot do from outside:
//!
//! - **Copy on read**: every returned [`Resource`] is an independent value.
//!   Mutating it never changes what the store holds.
//! - **Atomic uniqueness**: `create` and `update` take the caller's
//!   [`UniqueGuard`]s and check them under the same lock (or transaction)
//!   that performs the write, so two concurrent creates with the same
//!   `userName` cannot both succeed.
//! - **Atomic preconditions**: `update` and `delete` take the client's
//!   expected version and compare it with the stored one under that same
//!   lock, so two writers holding one `If-Match` version cannot both win.
//!
//! # Example Usage
//!
//! ```rust
//! use scim_engine::storage::{InMemoryRepository, ResourceRepository};
//! use scim_engine::Resource;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = InMemoryRepository::new();
//! let user = Resource::from_json("User", json!({"userName": "bjensen"}))?;
//!
//! let stored = repository.create(user, &[]).await?;
//! let id = stored.id().unwrap_or_default().to_string();
//!
//! let mut copy = repository.get("User", &id).await?.unwrap();
//! copy.set("userName", json!("changed"));
//! let again = repository.get("User", &id).await?.unwrap();
//! assert_eq!(again.get_str("userName"), Some("bjensen"));
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::StorageError;
pub use in_memory::{InMemoryRepository, InMemoryRepositoryStats};

use crate::error::ScimError;
use crate::filter::CompiledFilter;
use crate::query::{Page, QueryPipeline, SortSpec};
use crate::resource::{RawVersion, Resource};
use crate::schema::{AttributeDefinition, ResourceTypeDefinition, Uniqueness};
use serde_json::Value;
use std::future::Future;
use unicode_normalization::UnicodeNormalization;

/// Storage for resources of every registered type.
///
/// Resources are keyed by `(resource_type, id)`. Implementations must be safe
/// to share across tasks; all reads return owned copies.
pub trait ResourceRepository: Send + Sync {
    /// The error type returned by repository operations.
    ///
    /// Converts into [`ScimError`] so conflicts and missing resources keep
    /// their protocol meaning.
    type Error: std::error::Error + Into<ScimError> + Send + Sync + 'static;

    /// Store a new resource, assigning an id and a creation `meta` when absent.
    ///
    /// Fails without writing if any guard conflicts with a stored resource.
    fn create(
        &self,
        resource: Resource,
        guards: &[UniqueGuard],
    ) -> impl Future<Output = Result<Resource, Self::Error>> + Send;

    /// A copy of the stored resource, or `None`.
    fn get(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send;

    /// Replace a stored resource. Fails if it does not exist, if `expected`
    /// no longer matches the stored version, or if any guard conflicts with
    /// a resource other than itself.
    fn update(
        &self,
        resource: Resource,
        guards: &[UniqueGuard],
        expected: Option<&RawVersion>,
    ) -> impl Future<Output = Result<Resource, Self::Error>> + Send;

    /// `true` if something was removed. Fails without removing when
    /// `expected` no longer matches the stored version.
    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        expected: Option<&RawVersion>,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn exists(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Whether no stored resource (other than `exclude_id`) holds the guarded value.
    ///
    /// Advisory only; `create` and `update` repeat the check atomically.
    fn is_unique_value_available(
        &self,
        resource_type: &str,
        guard: &UniqueGuard,
        exclude_id: Option<&str>,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Copies of every resource of one type, in store order.
    fn list(
        &self,
        resource_type: &str,
    ) -> impl Future<Output = Result<Vec<Resource>, Self::Error>> + Send;

    /// Filter, sort and paginate the collection of `definition`'s type.
    fn query(
        &self,
        definition: &ResourceTypeDefinition,
        filter: Option<&CompiledFilter>,
        sort: Option<&SortSpec>,
        start_index: i64,
        count: i64,
    ) -> impl Future<Output = Result<Page<Resource>, Self::Error>> + Send {
        async move {
            let collection = self.list(&definition.name).await?;
            Ok(QueryPipeline::execute(
                definition,
                collection,
                filter,
                sort,
                start_index,
                count,
            ))
        }
    }
}

/// One uniqueness-scoped value a write must not duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueGuard {
    /// Extension schema URI when the attribute lives in an extension block
    pub extension: Option<String>,
    pub attribute: String,
    /// The value as the client sent it, for error messages
    pub value: String,
    /// Normalized form compared against stored values
    pub normalized: String,
    pub case_exact: bool,
    /// `Global` guards look across every resource type
    pub scope: Uniqueness,
}

impl UniqueGuard {
    pub fn new(
        extension: Option<&str>,
        attribute: &AttributeDefinition,
        value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        Self {
            extension: extension.map(str::to_string),
            attribute: attribute.name.clone(),
            normalized: normalize_unique_value(&value, attribute.case_exact),
            value,
            case_exact: attribute.case_exact,
            scope: attribute.uniqueness,
        }
    }

    /// Guards for every uniqueness-scoped string value on `resource`.
    ///
    /// `id` is left out; the repository owns id allocation.
    pub fn for_resource(definition: &ResourceTypeDefinition, resource: &Resource) -> Vec<Self> {
        let core = definition
            .unique_attributes()
            .map(|attr| (None, attr));
        let extensions = definition.extensions.iter().flat_map(|ext| {
            ext.attributes
                .iter()
                .filter(|attr| attr.uniqueness != Uniqueness::None)
                .map(move |attr| (Some(ext.schema_id.as_str()), attr))
        });

        core.chain(extensions)
            .flat_map(|(extension, attr)| {
                string_values(resource.value_of(extension, &attr.name))
                    .into_iter()
                    .map(move |value| Self::new(extension, attr, value))
            })
            .collect()
    }

    /// Whether `resource` already holds this guard's value.
    pub fn conflicts_with(&self, resource: &Resource) -> bool {
        string_values(resource.value_of(self.extension.as_deref(), &self.attribute))
            .iter()
            .any(|stored| normalize_unique_value(stored, self.case_exact) == self.normalized)
    }

    /// Whether this guard applies to stored resources of `resource_type`
    /// when writing one of `writing_type`.
    pub fn covers(&self, writing_type: &str, resource_type: &str) -> bool {
        self.scope == Uniqueness::Global || writing_type == resource_type
    }
}

/// NFKC-normalize, then case-fold unless the attribute is case exact.
///
/// ```rust
/// use scim_engine::storage::normalize_unique_value;
///
/// assert_eq!(normalize_unique_value("ＢJensen", false), "bjensen");
/// assert_eq!(normalize_unique_value("BJensen", true), "BJensen");
/// ```
pub fn normalize_unique_value(value: &str, case_exact: bool) -> String {
    let normalized: String = value.nfkc().collect();
    if case_exact {
        normalized
    } else {
        normalized.to_lowercase()
    }
}

fn string_values(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}
