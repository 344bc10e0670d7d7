//! The `schemas` list, unknown attributes and extension blocks.

use crate::common::builders::{ENTERPRISE_SCHEMA, GROUP_SCHEMA, GroupBuilder, USER_SCHEMA, UserBuilder};
use crate::common::{context, create, provider};
use scim_engine::{ScimError, ValidationError};
use serde_json::json;

async fn create_error(body: serde_json::Value) -> ScimError {
    provider()
        .create("User", body, &context())
        .await
        .into_result()
        .expect_err("create should be rejected")
}

#[tokio::test]
async fn test_missing_schemas() {
    let err = create_error(UserBuilder::new("bjensen").without_schemas().build()).await;
    assert!(matches!(err, ScimError::Validation(ValidationError::MissingSchemas)));
}

#[tokio::test]
async fn test_base_schema_is_required() {
    let err = create_error(
        UserBuilder::new("bjensen")
            .with_enterprise(json!({"department": "Tour Operations"}))
            .with_schemas(&[ENTERPRISE_SCHEMA])
            .build(),
    )
    .await;
    assert!(matches!(
        err,
        ScimError::Validation(ValidationError::MissingBaseSchema { .. })
    ));
}

#[tokio::test]
async fn test_foreign_schema_uri_is_rejected() {
    let err = create_error(
        UserBuilder::new("bjensen")
            .with_schemas(&[USER_SCHEMA, GROUP_SCHEMA])
            .build(),
    )
    .await;
    assert!(matches!(
        err,
        ScimError::Validation(ValidationError::UnknownSchemaUri { .. })
    ));
}

#[tokio::test]
async fn test_unknown_attribute_is_rejected() {
    let err = create_error(
        UserBuilder::new("bjensen")
            .with("favoriteColor", json!("blue"))
            .build(),
    )
    .await;
    assert!(matches!(
        err,
        ScimError::Validation(ValidationError::UnknownAttribute { .. })
    ));

    let err = create_error(
        UserBuilder::new("bjensen")
            .with("name", json!({"givenName": "Barbara", "nickname": "Babs"}))
            .build(),
    )
    .await;
    assert!(matches!(
        err,
        ScimError::Validation(ValidationError::UnknownAttribute { .. })
    ));
}

#[tokio::test]
async fn test_unregistered_extension_block_is_rejected() {
    let err = create_error(
        UserBuilder::new("bjensen")
            .with("urn:example:schemas:Custom", json!({"shoeSize": 42}))
            .build(),
    )
    .await;
    assert!(matches!(
        err,
        ScimError::Validation(ValidationError::UnknownSchemaUri { .. })
    ));
}

#[tokio::test]
async fn test_extension_block_is_validated() {
    let err = create_error(
        UserBuilder::new("bjensen")
            .with_enterprise(json!({"employeeNumber": 701984}))
            .build(),
    )
    .await;
    assert!(matches!(
        err,
        ScimError::Validation(ValidationError::InvalidDataType { .. })
    ));
}

#[tokio::test]
async fn test_extension_uri_is_added_to_schemas() {
    let provider = provider();
    let mut body = UserBuilder::new("bjensen").build();
    body[ENTERPRISE_SCHEMA] = json!({"department": "Tour Operations"});

    let created = create(&provider, "User", body).await;
    assert_eq!(created.schemas, [USER_SCHEMA, ENTERPRISE_SCHEMA]);
}

#[tokio::test]
async fn test_client_supplied_server_values_are_ignored() {
    let provider = provider();
    let created = create(
        &provider,
        "User",
        UserBuilder::new("bjensen")
            .with_id("chosen-by-client")
            .with("meta", json!({"resourceType": "Group", "created": "2001-01-01T00:00:00Z"}))
            .with("groups", json!([{"value": "g-1"}]))
            .build(),
    )
    .await;

    assert_ne!(created.id.as_deref(), Some("chosen-by-client"));
    let meta = created.meta.unwrap();
    assert_eq!(meta.resource_type, "User");
    assert_eq!(meta.created, meta.last_modified);
    assert!(created.attributes.get("groups").is_none());
}

#[tokio::test]
async fn test_client_supplied_read_only_sub_attributes_are_ignored() {
    let provider = provider();
    let created = create(
        &provider,
        "User",
        UserBuilder::new("bjensen")
            .with_enterprise(json!({"manager": {"value": "boss", "displayName": "Forged"}}))
            .build(),
    )
    .await;
    assert_eq!(
        created.value_of(Some(ENTERPRISE_SCHEMA), "manager"),
        Some(&json!({"value": "boss"}))
    );

    let mut group = GroupBuilder::new("Admins").build();
    group["members"] = json!([{"value": "user-1", "display": "Forged"}]);
    let created = create(&provider, "Group", group.clone()).await;
    assert_eq!(created.get("members"), Some(&json!([{"value": "user-1"}])));

    group["members"] = json!([{"value": "user-1", "display": "Forged again"}, {"value": "user-2", "display": "Forged"}]);
    let replaced = provider
        .replace("Group", created.id().unwrap(), group, None, &context())
        .await
        .into_result()
        .unwrap();
    assert_eq!(
        replaced.get("members"),
        Some(&json!([{"value": "user-1"}, {"value": "user-2"}]))
    );
}
