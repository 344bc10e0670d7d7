//! Standard resource provider: the SCIM workflows over a pluggable repository.
//!
//! Each operation is a chain of [`Outcome`] steps. Definition lookup,
//! precondition checks, mutability rules, validation, version stamping and
//! uniqueness guards run here; the repository only stores copies.
//!
//! # Example Usage
//!
//! ```rust
//! use scim_engine::providers::StandardResourceProvider;
//! use scim_engine::schema::TypeDefinitionRegistry;
//! use scim_engine::storage::InMemoryRepository;
//! use scim_engine::RequestContext;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(TypeDefinitionRegistry::builtin()?);
//! let provider = StandardResourceProvider::new(InMemoryRepository::new(), registry);
//! let context = RequestContext::with_generated_id();
//!
//! let user = provider
//!     .create(
//!         "User",
//!         json!({
//!             "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!             "userName": "bjensen"
//!         }),
//!         &context,
//!     )
//!     .await
//!     .into_result()?;
//! assert!(user.id().is_some());
//! # Ok(())
//! # }
//! ```

use super::ProviderSettings;
use super::helpers::{carry_over, check_precondition, group_references, strip_read_only};
use crate::error::{ScimError, ScimResult};
use crate::filter::CompiledFilter;
use crate::outcome::Outcome;
use crate::patch::{PatchEngine, PatchRequest};
use crate::query::{Page, SortSpec};
use crate::resource::attributes::remove_ci;
use crate::resource::{ListQuery, RawVersion, RequestContext, Resource};
use crate::schema::{ResourceTypeDefinition, TypeDefinitionRegistry};
use crate::storage::{ResourceRepository, UniqueGuard};
use chrono::Utc;
use log::{debug, info, trace, warn};
use serde_json::Value;
use std::sync::Arc;

const GROUP: &str = "Group";
const GROUPS_ATTRIBUTE: &str = "groups";

/// Standard resource provider with a pluggable repository.
#[derive(Debug, Clone)]
pub struct StandardResourceProvider<R: ResourceRepository> {
    repository: R,
    registry: Arc<TypeDefinitionRegistry>,
    settings: ProviderSettings,
}

impl<R: ResourceRepository> StandardResourceProvider<R> {
    /// Create a provider with default settings.
    pub fn new(repository: R, registry: Arc<TypeDefinitionRegistry>) -> Self {
        Self::with_settings(repository, registry, ProviderSettings::default())
    }

    pub fn with_settings(
        repository: R,
        registry: Arc<TypeDefinitionRegistry>,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            repository,
            registry,
            settings,
        }
    }

    pub fn registry(&self) -> &TypeDefinitionRegistry {
        &self.registry
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Create a resource from a client representation.
    ///
    /// Client-supplied `id`, `meta` and other `readOnly` values are discarded.
    pub async fn create(
        &self,
        resource_type: &str,
        data: Value,
        context: &RequestContext,
    ) -> Outcome<Resource> {
        info!(
            "Creating {} resource (request: '{}')",
            resource_type, context.request_id
        );
        trace!("Create data: {}", data);

        self.definition(resource_type)
            .bind_async(|definition| async move {
                Outcome::from(prepare_new(definition, data))
                    .bind_async(|resource| async move {
                        let guards = UniqueGuard::for_resource(definition, &resource);
                        from_storage(self.repository.create(resource, &guards).await)
                    })
                    .await
                    .bind_async(|stored| self.present(definition, stored))
                    .await
            })
            .await
            .tap(|created| {
                info!(
                    "Created {} '{}' (request: '{}')",
                    resource_type,
                    created.id().unwrap_or_default(),
                    context.request_id
                )
            })
            .tap_err(|e| {
                debug!(
                    "Create of {} failed (request: '{}'): {}",
                    resource_type, context.request_id, e
                )
            })
    }

    /// Read one resource.
    pub async fn get(&self, resource_type: &str, id: &str, context: &RequestContext) -> Outcome<Resource> {
        debug!(
            "Getting {} '{}' (request: '{}')",
            resource_type, id, context.request_id
        );

        self.definition(resource_type)
            .bind_async(|definition| async move {
                self.load(definition, id)
                    .await
                    .bind_async(|stored| self.present(definition, stored))
                    .await
            })
            .await
            .tap_err(|e| debug!("Get of {} '{}' failed: {}", resource_type, id, e))
    }

    /// Replace a resource with a full representation (PUT).
    ///
    /// `readOnly` values are kept from the stored resource, an `immutable`
    /// value may only be set while unset, and `created` never moves.
    pub async fn replace(
        &self,
        resource_type: &str,
        id: &str,
        data: Value,
        expected_version: Option<&RawVersion>,
        context: &RequestContext,
    ) -> Outcome<Resource> {
        info!(
            "Replacing {} '{}' (request: '{}')",
            resource_type, id, context.request_id
        );
        trace!("Replace data: {}", data);

        self.definition(resource_type)
            .bind_async(|definition| async move {
                self.load(definition, id)
                    .await
                    .bind(|stored| {
                        Outcome::from(prepare_replacement(
                            definition,
                            &stored,
                            data,
                            expected_version,
                        ))
                    })
                    .bind_async(|resource| self.store(definition, resource, expected_version))
                    .await
                    .bind_async(|stored| self.present(definition, stored))
                    .await
            })
            .await
            .tap(|_| {
                info!(
                    "Replaced {} '{}' (request: '{}')",
                    resource_type, id, context.request_id
                )
            })
            .tap_err(|e| debug!("Replace of {} '{}' failed: {}", resource_type, id, e))
    }

    /// Apply a PATCH request as a single unit.
    pub async fn patch(
        &self,
        resource_type: &str,
        id: &str,
        request: &PatchRequest,
        expected_version: Option<&RawVersion>,
        context: &RequestContext,
    ) -> Outcome<Resource> {
        info!(
            "Patching {} '{}' with {} operation(s) (request: '{}')",
            resource_type,
            id,
            request.operations.len(),
            context.request_id
        );

        Outcome::from(request.validate())
            .bind(|()| self.definition(resource_type))
            .bind_async(|definition| async move {
                self.load(definition, id)
                    .await
                    .bind(|stored| {
                        Outcome::from(check_precondition(&stored, expected_version))
                            .bind(|()| PatchEngine::apply(definition, &stored, &request.operations))
                    })
                    .bind_async(|patched| self.store(definition, patched, expected_version))
                    .await
                    .bind_async(|stored| self.present(definition, stored))
                    .await
            })
            .await
            .tap(|patched| {
                info!(
                    "Patched {} '{}' to version {} (request: '{}')",
                    resource_type,
                    id,
                    patched
                        .version()
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    context.request_id
                )
            })
            .tap_err(|e| debug!("Patch of {} '{}' failed: {}", resource_type, id, e))
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        id: &str,
        expected_version: Option<&RawVersion>,
        context: &RequestContext,
    ) -> Outcome<()> {
        info!(
            "Deleting {} '{}' (request: '{}')",
            resource_type, id, context.request_id
        );

        self.definition(resource_type)
            .bind_async(|definition| async move {
                self.load(definition, id)
                    .await
                    .bind(|stored| Outcome::from(check_precondition(&stored, expected_version)))
                    .bind_async(|()| async move {
                        let removed = self.repository.delete(&definition.name, id, expected_version).await;
                        match from_storage(removed) {
                            Outcome::Success(true) => Outcome::success(()),
                            Outcome::Success(false) => {
                                Outcome::failure(ScimError::resource_not_found(&definition.name, id))
                            }
                            Outcome::Failure(e) => Outcome::Failure(e),
                        }
                    })
                    .await
            })
            .await
            .tap(|()| {
                info!(
                    "Deleted {} '{}' (request: '{}')",
                    resource_type, id, context.request_id
                )
            })
            .tap_err(|e| debug!("Delete of {} '{}' failed: {}", resource_type, id, e))
    }

    /// Filter, sort and paginate a collection.
    ///
    /// A missing `count` uses the configured default page size; larger
    /// counts are clamped to the maximum; zero or negative means no limit.
    pub async fn search(
        &self,
        resource_type: &str,
        query: &ListQuery,
        context: &RequestContext,
    ) -> Outcome<Page<Resource>> {
        debug!(
            "Searching {} with filter {:?} (request: '{}')",
            resource_type, query.filter, context.request_id
        );

        self.definition(resource_type)
            .bind(|definition| {
                Outcome::from(self.compile_query(query)).map(|(filter, sort)| (definition, filter, sort))
            })
            .bind_async(|(definition, filter, sort)| async move {
                let start_index = query.start_index.unwrap_or(1);
                let count = self.effective_count(query.count);
                let page = match from_storage(
                    self.repository
                        .query(definition, filter.as_ref(), sort.as_ref(), start_index, count)
                        .await,
                ) {
                    Outcome::Success(page) => page,
                    Outcome::Failure(e) => return Outcome::Failure(e),
                };
                self.membership(definition).await.map(|groups| {
                    page.map(|resource| self.decorate(definition, resource, groups.as_deref()))
                })
            })
            .await
            .tap(|page| {
                debug!(
                    "Search of {} matched {} resource(s), returning {} (request: '{}')",
                    resource_type,
                    page.total_results,
                    page.items_per_page(),
                    context.request_id
                )
            })
    }

    fn definition(&self, resource_type: &str) -> Outcome<&ResourceTypeDefinition> {
        self.registry
            .resource_type(resource_type)
            .map(Outcome::success)
            .unwrap_or_else(|| {
                Outcome::failure(ScimError::UnsupportedResourceType(resource_type.to_string()))
            })
    }

    fn compile_query(&self, query: &ListQuery) -> ScimResult<(Option<CompiledFilter>, Option<SortSpec>)> {
        let filter = query
            .filter
            .as_deref()
            .map(|source| CompiledFilter::compile_with(source, self.settings.filter_limits))
            .transpose()?;
        let sort = query
            .sort_by
            .as_deref()
            .map(|sort_by| SortSpec::parse(sort_by, query.sort_order))
            .transpose()?;
        Ok((filter, sort))
    }

    fn effective_count(&self, requested: Option<i64>) -> i64 {
        let max = i64::try_from(self.settings.max_page_size).unwrap_or(i64::MAX);
        match requested {
            None => i64::try_from(self.settings.default_page_size).unwrap_or(max),
            Some(count) if count <= 0 => count,
            Some(count) => count.min(max),
        }
    }

    async fn load(&self, definition: &ResourceTypeDefinition, id: &str) -> Outcome<Resource> {
        match from_storage(self.repository.get(&definition.name, id).await) {
            Outcome::Success(Some(resource)) => {
                trace!("Loaded {} '{}'", definition.name, id);
                Outcome::success(resource)
            }
            Outcome::Success(None) => {
                Outcome::failure(ScimError::resource_not_found(&definition.name, id))
            }
            Outcome::Failure(e) => Outcome::Failure(e),
        }
    }

    /// Write back a loaded resource. `expected` is compared again by the
    /// repository, atomically with the write.
    async fn store(
        &self,
        definition: &ResourceTypeDefinition,
        resource: Resource,
        expected: Option<&RawVersion>,
    ) -> Outcome<Resource> {
        let guards = UniqueGuard::for_resource(definition, &resource);
        from_storage(self.repository.update(resource, &guards, expected).await)
    }

    /// The response form of a stored resource.
    async fn present(&self, definition: &ResourceTypeDefinition, resource: Resource) -> Outcome<Resource> {
        self.membership(definition)
            .await
            .map(|groups| self.decorate(definition, resource, groups.as_deref()))
    }

    /// Every Group when `definition` carries a `groups` back-reference.
    async fn membership(&self, definition: &ResourceTypeDefinition) -> Outcome<Option<Vec<Resource>>> {
        if definition.attribute(GROUPS_ATTRIBUTE).is_none() || self.registry.resource_type(GROUP).is_none() {
            return Outcome::success(None);
        }
        from_storage(self.repository.list(GROUP).await).map(Some)
    }

    fn decorate(
        &self,
        definition: &ResourceTypeDefinition,
        mut resource: Resource,
        groups: Option<&[Resource]>,
    ) -> Resource {
        if let Some(endpoint) = &definition.endpoint {
            self.settings.location.stamp(&mut resource, endpoint);
        }

        if let (Some(groups), Some(id)) = (groups, resource.id.clone()) {
            let group_endpoint = self
                .registry
                .resource_type(GROUP)
                .and_then(|def| def.endpoint.clone())
                .unwrap_or_else(|| "/Groups".to_string());
            let references = group_references(&id, groups, &self.settings.location, &group_endpoint);
            if references.is_empty() {
                remove_ci(&mut resource.attributes, GROUPS_ATTRIBUTE);
            } else {
                resource.set(GROUPS_ATTRIBUTE, Value::Array(references));
            }
        }
        resource
    }
}

fn from_storage<T, E: Into<ScimError>>(result: Result<T, E>) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::success(value),
        Err(e) => {
            let error: ScimError = e.into();
            if matches!(error, ScimError::Internal { .. }) {
                warn!("Repository failure: {}", error);
            }
            Outcome::Failure(error)
        }
    }
}

fn prepare_new(definition: &ResourceTypeDefinition, data: Value) -> ScimResult<Resource> {
    let mut resource = Resource::from_json(definition.name.clone(), data)?;
    strip_read_only(definition, &mut resource);
    resource.normalize_schemas(definition);
    definition.validate(&resource)?;
    resource.stamp_modified(Utc::now());
    Ok(resource)
}

fn prepare_replacement(
    definition: &ResourceTypeDefinition,
    stored: &Resource,
    data: Value,
    expected_version: Option<&RawVersion>,
) -> ScimResult<Resource> {
    check_precondition(stored, expected_version)?;
    let incoming = Resource::from_json(definition.name.clone(), data)?;
    let mut resource = carry_over(definition, stored, incoming)?;
    resource.normalize_schemas(definition);
    definition.validate(&resource)?;
    resource.stamp_modified(Utc::now());
    Ok(resource)
}
