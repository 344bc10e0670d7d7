//! In-memory repository for SCIM resources.
//!
//! Thread-safe through a single async `RwLock`: reads share it and every
//! write, including its uniqueness and version checks, holds it exclusively.
//! That makes compare-and-write atomic without any per-attribute index.
//!
//! # Performance Characteristics
//!
//! * get/delete/exists: O(1) average case
//! * create/update: O(n) over the guarded collection for uniqueness
//! * list: O(n log n), ordered by insertion

use crate::resource::{RawVersion, Resource, VersionCalculator};
use crate::resource::Meta;
use crate::storage::{ResourceRepository, StorageError, UniqueGuard};
use chrono::Utc;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Stored {
    sequence: u64,
    resource: Resource,
}

#[derive(Debug, Default)]
struct Collections {
    next_sequence: u64,
    // resource_type -> id -> stored
    by_type: HashMap<String, HashMap<String, Stored>>,
}

impl Collections {
    /// The first guard some stored resource (other than `exclude_id`) already satisfies.
    fn find_conflict<'g>(
        &self,
        writing_type: &str,
        guards: &'g [UniqueGuard],
        exclude_id: Option<&str>,
    ) -> Option<&'g UniqueGuard> {
        guards.iter().find(|guard| {
            self.by_type
                .iter()
                .filter(|(resource_type, _)| guard.covers(writing_type, resource_type))
                .flat_map(|(_, stored)| stored.iter())
                .filter(|(id, _)| exclude_id != Some(id.as_str()))
                .any(|(_, stored)| guard.conflicts_with(&stored.resource))
        })
    }
}

/// Thread-safe in-memory repository.
///
/// Cloning shares the underlying store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    data: Arc<RwLock<Collections>>,
}

/// Counts for debugging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryRepositoryStats {
    pub resource_type_count: usize,
    pub total_resources: usize,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> InMemoryRepositoryStats {
        let data = self.data.read().await;
        InMemoryRepositoryStats {
            resource_type_count: data.by_type.values().filter(|c| !c.is_empty()).count(),
            total_resources: data.by_type.values().map(HashMap::len).sum(),
        }
    }

    /// Remove everything (useful for testing).
    pub async fn clear(&self) {
        let mut data = self.data.write().await;
        data.by_type.clear();
    }
}

fn unique_violation(resource_type: &str, guard: &UniqueGuard) -> StorageError {
    StorageError::UniqueViolation {
        resource_type: resource_type.to_string(),
        attribute: guard.attribute.clone(),
        value: guard.value.clone(),
    }
}

impl ResourceRepository for InMemoryRepository {
    type Error = StorageError;

    async fn create(&self, mut resource: Resource, guards: &[UniqueGuard]) -> Result<Resource, Self::Error> {
        let resource_type = resource.resource_type.clone();
        let id = resource
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        resource.id = Some(id.clone());
        if resource.meta.is_none() {
            let now = Utc::now();
            let version = VersionCalculator::compute(&resource);
            resource.meta = Some(Meta::new_for_creation(&resource_type, now).with_version(&version));
        }

        let mut data = self.data.write().await;
        if let Some(guard) = data.find_conflict(&resource_type, guards, None) {
            debug!("Create of {} rejected: {} '{}' taken", resource_type, guard.attribute, guard.value);
            return Err(unique_violation(&resource_type, guard));
        }
        if data
            .by_type
            .get(&resource_type)
            .is_some_and(|c| c.contains_key(&id))
        {
            return Err(StorageError::ResourceAlreadyExists { resource_type, id });
        }

        let sequence = data.next_sequence;
        data.next_sequence += 1;
        trace!("Storing {}/{} at sequence {}", resource_type, id, sequence);
        data.by_type.entry(resource_type).or_default().insert(
            id,
            Stored {
                sequence,
                resource: resource.clone(),
            },
        );
        Ok(resource)
    }

    async fn get(&self, resource_type: &str, id: &str) -> Result<Option<Resource>, Self::Error> {
        let data = self.data.read().await;
        Ok(data
            .by_type
            .get(resource_type)
            .and_then(|c| c.get(id))
            .map(|stored| stored.resource.clone()))
    }

    async fn update(
        &self,
        resource: Resource,
        guards: &[UniqueGuard],
        expected: Option<&RawVersion>,
    ) -> Result<Resource, Self::Error> {
        let resource_type = resource.resource_type.clone();
        let Some(id) = resource.id.clone() else {
            return Err(StorageError::invalid_data("Cannot update a resource without an id"));
        };

        let mut data = self.data.write().await;
        if let Some(guard) = data.find_conflict(&resource_type, guards, Some(&id)) {
            debug!("Update of {}/{} rejected: {} '{}' taken", resource_type, id, guard.attribute, guard.value);
            return Err(unique_violation(&resource_type, guard));
        }
        let Some(stored) = data
            .by_type
            .get_mut(&resource_type)
            .and_then(|c| c.get_mut(&id))
        else {
            return Err(StorageError::not_found(resource_type, id));
        };
        if let Err(conflict) = VersionCalculator::check(&stored.resource, expected) {
            debug!("Update of {}/{} rejected: {}", resource_type, id, conflict);
            return Err(StorageError::VersionMismatch(conflict));
        }
        stored.resource = resource.clone();
        Ok(resource)
    }

    async fn delete(
        &self,
        resource_type: &str,
        id: &str,
        expected: Option<&RawVersion>,
    ) -> Result<bool, Self::Error> {
        let mut data = self.data.write().await;
        let Some(collection) = data.by_type.get_mut(resource_type) else {
            return Ok(false);
        };
        if let Some(stored) = collection.get(id) {
            if let Err(conflict) = VersionCalculator::check(&stored.resource, expected) {
                debug!("Delete of {}/{} rejected: {}", resource_type, id, conflict);
                return Err(StorageError::VersionMismatch(conflict));
            }
        }
        Ok(collection.remove(id).is_some())
    }

    async fn exists(&self, resource_type: &str, id: &str) -> Result<bool, Self::Error> {
        let data = self.data.read().await;
        Ok(data
            .by_type
            .get(resource_type)
            .is_some_and(|c| c.contains_key(id)))
    }

    async fn is_unique_value_available(
        &self,
        resource_type: &str,
        guard: &UniqueGuard,
        exclude_id: Option<&str>,
    ) -> Result<bool, Self::Error> {
        let data = self.data.read().await;
        Ok(data
            .find_conflict(resource_type, std::slice::from_ref(guard), exclude_id)
            .is_none())
    }

    async fn list(&self, resource_type: &str) -> Result<Vec<Resource>, Self::Error> {
        let data = self.data.read().await;
        let mut stored: Vec<&Stored> = data
            .by_type
            .get(resource_type)
            .map(|c| c.values().collect())
            .unwrap_or_default();
        stored.sort_by_key(|s| s.sequence);
        Ok(stored.into_iter().map(|s| s.resource.clone()).collect())
    }
}
