//! `If-Match` handling for PUT, PATCH and DELETE.

use crate::common::builders::{UserBuilder, patch_body};
use crate::common::{body, context, init_logging, post, server};
use scim_engine::patch::{PatchOperation, PatchRequest};
use scim_engine::resource::RawVersion;
use scim_engine::storage::{InMemoryRepository, ResourceRepository, StorageError, UniqueGuard};
use scim_engine::{
    Method, Resource, ScimError, ScimRequest, StandardResourceProvider,
    TypeDefinitionRegistry,
};
use serde_json::json;
use std::sync::Arc;

/// Yields after every read, so concurrent writers interleave between
/// loading a resource and writing it back.
#[derive(Debug, Clone, Default)]
struct InterleavingRepository(InMemoryRepository);

impl ResourceRepository for InterleavingRepository {
    type Error = StorageError;

    async fn create(&self, resource: Resource, guards: &[UniqueGuard]) -> Result<Resource, StorageError> {
        self.0.create(resource, guards).await
    }

    async fn get(&self, resource_type: &str, id: &str) -> Result<Option<Resource>, StorageError> {
        let found = self.0.get(resource_type, id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn update(
        &self,
        resource: Resource,
        guards: &[UniqueGuard],
        expected: Option<&RawVersion>,
    ) -> Result<Resource, StorageError> {
        self.0.update(resource, guards, expected).await
    }

    async fn delete(
        &self,
        resource_type: &str,
        id: &str,
        expected: Option<&RawVersion>,
    ) -> Result<bool, StorageError> {
        self.0.delete(resource_type, id, expected).await
    }

    async fn exists(&self, resource_type: &str, id: &str) -> Result<bool, StorageError> {
        self.0.exists(resource_type, id).await
    }

    async fn is_unique_value_available(
        &self,
        resource_type: &str,
        guard: &UniqueGuard,
        exclude_id: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.0.is_unique_value_available(resource_type, guard, exclude_id).await
    }

    async fn list(&self, resource_type: &str) -> Result<Vec<Resource>, StorageError> {
        self.0.list(resource_type).await
    }
}

fn interleaving_provider() -> StandardResourceProvider<InterleavingRepository> {
    init_logging();
    let registry = Arc::new(TypeDefinitionRegistry::builtin().unwrap());
    StandardResourceProvider::new(InterleavingRepository::default(), registry)
}

fn replace_one(attribute: &str, value: &str) -> PatchRequest {
    PatchRequest::new(vec![PatchOperation::replace(attribute, json!(value))])
}

fn is_precondition_failure(error: Option<&ScimError>) -> bool {
    matches!(error, Some(ScimError::PreconditionFailed(_)))
}

fn rename(name: &str) -> serde_json::Value {
    patch_body(&[("replace", Some("userName"), Some(json!(name)))])
}

#[tokio::test]
async fn test_accepted_if_match_forms() {
    let server = server();
    let (id, created) = post(&server, "/Users", UserBuilder::new("bjensen").build()).await;
    let path = format!("/Users/{}", id);
    let weak = created.etag.clone().unwrap();
    let raw = body(&created)["meta"]["version"]
        .as_str()
        .unwrap()
        .trim_start_matches("W/")
        .trim_matches('"')
        .to_string();
    assert_eq!(weak, format!("W/\"{}\"", raw));

    let strong = server
        .handle(
            ScimRequest::new(Method::Patch, &path)
                .with_if_match(format!("\"{}\"", raw))
                .with_body(rename("bjensen1")),
        )
        .await;
    assert_eq!(strong.status, 200);
    let current = strong.etag.clone().unwrap();

    let wildcard = server
        .handle(
            ScimRequest::new(Method::Patch, &path)
                .with_if_match("*")
                .with_body(rename("bjensen2")),
        )
        .await;
    assert_eq!(wildcard.status, 200);
    assert_ne!(wildcard.etag.as_ref(), Some(&current));
}

#[tokio::test]
async fn test_stale_version_is_rejected_without_writing() {
    let server = server();
    let (id, created) = post(&server, "/Users", UserBuilder::new("bjensen").build()).await;
    let path = format!("/Users/{}", id);
    let original = created.etag.clone().unwrap();

    let moved = server
        .handle(ScimRequest::new(Method::Patch, &path).with_body(rename("moved")))
        .await;
    assert_eq!(moved.status, 200);

    let stale_put = server
        .handle(
            ScimRequest::new(Method::Put, &path)
                .with_if_match(&original)
                .with_body(UserBuilder::new("overwritten").build()),
        )
        .await;
    assert_eq!(stale_put.status, 412);
    assert_eq!(body(&stale_put)["scimType"], "invalidVers");

    let stale_delete = server
        .handle(ScimRequest::new(Method::Delete, &path).with_if_match(&original))
        .await;
    assert_eq!(stale_delete.status, 412);

    let current = server.handle(ScimRequest::new(Method::Get, &path)).await;
    assert_eq!(body(&current)["userName"], "moved");

    let fresh_delete = server
        .handle(ScimRequest::new(Method::Delete, &path).with_if_match(current.etag.clone().unwrap()))
        .await;
    assert_eq!(fresh_delete.status, 204);
}

#[tokio::test]
async fn test_if_match_may_list_several_tags() {
    let server = server();
    let (id, created) = post(&server, "/Users", UserBuilder::new("bjensen").build()).await;
    let path = format!("/Users/{}", id);
    let original = created.etag.clone().unwrap();

    let listed = server
        .handle(
            ScimRequest::new(Method::Patch, &path)
                .with_if_match(format!(r#"W/"stale", {}"#, original))
                .with_body(rename("bjensen1")),
        )
        .await;
    assert_eq!(listed.status, 200);
    let current = listed.etag.clone().unwrap();

    let none_current = server
        .handle(
            ScimRequest::new(Method::Delete, &path)
                .with_if_match(format!(r#"{}, W/"stale""#, original)),
        )
        .await;
    assert_eq!(none_current.status, 412);

    let deleted = server
        .handle(ScimRequest::new(Method::Delete, &path).with_if_match(format!("{}, {}", original, current)))
        .await;
    assert_eq!(deleted.status, 204);
}

#[tokio::test]
async fn test_malformed_if_match_is_a_syntax_error() {
    let server = server();
    let (id, _) = post(&server, "/Users", UserBuilder::new("bjensen").build()).await;

    let response = server
        .handle(
            ScimRequest::new(Method::Delete, format!("/Users/{}", id)).with_if_match("   "),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(body(&response)["scimType"], "invalidSyntax");
}

#[tokio::test]
async fn test_concurrent_patches_with_one_version_admit_one() {
    let provider = interleaving_provider();
    let ctx = context();
    let created = provider
        .create("User", UserBuilder::new("bjensen").build(), &ctx)
        .await
        .into_result()
        .unwrap();
    let id = created.id().unwrap();
    let version = created.version().unwrap();

    let title = replace_one("title", "Tour Guide");
    let nick_name = replace_one("nickName", "Babs");
    let (first, second) = futures::join!(
        provider.patch("User", id, &title, Some(&version), &ctx),
        provider.patch("User", id, &nick_name, Some(&version), &ctx),
    );

    assert_eq!(
        [first.is_success(), second.is_success()].iter().filter(|ok| **ok).count(),
        1
    );
    assert!(is_precondition_failure(first.error()) || is_precondition_failure(second.error()));

    let current = provider.get("User", id, &ctx).await.into_result().unwrap();
    let applied = [current.get("title").is_some(), current.get("nickName").is_some()];
    assert_eq!(applied, [first.is_success(), second.is_success()]);
}

#[tokio::test]
async fn test_concurrent_delete_and_patch_with_one_version_admit_one() {
    let provider = interleaving_provider();
    let ctx = context();
    let created = provider
        .create("User", UserBuilder::new("bjensen").build(), &ctx)
        .await
        .into_result()
        .unwrap();
    let id = created.id().unwrap();
    let version = created.version().unwrap();

    let title = replace_one("title", "Tour Guide");
    let (patched, deleted) = futures::join!(
        provider.patch("User", id, &title, Some(&version), &ctx),
        provider.delete("User", id, Some(&version), &ctx),
    );

    assert_ne!(patched.is_success(), deleted.is_success());
    let failure = patched.error().or(deleted.error());
    assert!(matches!(
        failure.and_then(ScimError::status),
        Some(412) | Some(404)
    ));
}
