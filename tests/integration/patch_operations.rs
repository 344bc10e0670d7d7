//! PATCH semantics through the provider.

use crate::common::builders::{ENTERPRISE_SCHEMA, GroupBuilder, UserBuilder};
use crate::common::{TestProvider, context, create, provider};
use scim_engine::patch::{PatchOpKind, PatchOperation, PatchRequest};
use scim_engine::{Resource, ScimError, ScimResult};
use serde_json::json;

async fn patch(
    provider: &TestProvider,
    resource_type: &str,
    id: &str,
    operations: Vec<PatchOperation>,
) -> ScimResult<Resource> {
    provider
        .patch(resource_type, id, &PatchRequest::new(operations), None, &context())
        .await
        .into_result()
}

#[tokio::test]
async fn test_failed_batch_changes_nothing() {
    let provider = provider();
    let user = create(&provider, "User", UserBuilder::new_full("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let err = patch(
        &provider,
        "User",
        &id,
        vec![
            PatchOperation::replace("displayName", json!("Applied First")),
            PatchOperation::remove("emails[type eq \"fax\"]"),
        ],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScimError::NoTarget { .. }));

    let stored = provider.get("User", &id, &context()).await.into_result().unwrap();
    assert_eq!(stored.get_str("displayName"), Some("Babs Jensen"));
    assert_eq!(stored.version(), user.version());
}

#[tokio::test]
async fn test_id_cannot_change_but_identical_value_is_tolerated() {
    let provider = provider();
    let user = create(&provider, "User", UserBuilder::new("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let err = patch(&provider, "User", &id, vec![PatchOperation::replace("id", json!("other"))])
        .await
        .unwrap_err();
    assert!(matches!(err, ScimError::Mutability { .. }));

    let same = patch(&provider, "User", &id, vec![PatchOperation::replace("id", json!(id))])
        .await
        .unwrap();
    assert_eq!(same.id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn test_immutable_member_value_may_be_added_but_not_changed() {
    let provider = provider();
    let group = create(&provider, "Group", GroupBuilder::new("Admins").build()).await;
    let id = group.id.clone().unwrap();

    let added = patch(
        &provider,
        "Group",
        &id,
        vec![PatchOperation::add("members", json!([{"value": "user-1"}]))],
    )
    .await
    .unwrap();
    assert_eq!(added.get("members").unwrap()[0]["value"], "user-1");

    let err = patch(
        &provider,
        "Group",
        &id,
        vec![PatchOperation::replace(
            "members[value eq \"user-1\"].value",
            json!("user-2"),
        )],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScimError::Mutability { .. }));
}

#[tokio::test]
async fn test_read_only_member_display_cannot_be_written_through_members() {
    let provider = provider();
    let group = create(&provider, "Group", GroupBuilder::new("Admins").with_member("user-1").build()).await;
    let id = group.id.clone().unwrap();

    let filtered = patch(
        &provider,
        "Group",
        &id,
        vec![PatchOperation::add("members[value eq \"user-1\"].display", json!("Fake"))],
    )
    .await;
    assert!(matches!(filtered, Err(ScimError::Mutability { .. })));

    for operation in [
        PatchOperation::add("members", json!([{"value": "user-1", "display": "Fake"}])),
        PatchOperation::add("members", json!([{"value": "user-2", "display": "Fake"}])),
        PatchOperation::replace("members", json!([{"value": "user-1", "display": "Fake"}])),
        PatchOperation::merge(
            PatchOpKind::Add,
            json!({"members": [{"value": "user-3", "display": "Fake"}]}),
        ),
    ] {
        let err = patch(&provider, "Group", &id, vec![operation.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, ScimError::Mutability { .. }), "{:?}: {:?}", operation, err);
    }

    let stored = provider.get("Group", &id, &context()).await.into_result().unwrap();
    assert_eq!(stored.get("members"), Some(&json!([{"value": "user-1", "type": "User"}])));
    assert_eq!(stored.version(), group.version());

    let added = patch(
        &provider,
        "Group",
        &id,
        vec![PatchOperation::add("members", json!([{"value": "user-2", "type": "User"}]))],
    )
    .await
    .unwrap();
    assert_eq!(added.get("members").unwrap().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_read_only_manager_display_name_cannot_be_patched() {
    let provider = provider();
    let user = create(&provider, "User", UserBuilder::new("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let err = patch(
        &provider,
        "User",
        &id,
        vec![PatchOperation::add(
            &format!("{}:manager", ENTERPRISE_SCHEMA),
            json!({"value": "boss", "displayName": "Forged"}),
        )],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScimError::Mutability { .. }));
}

#[tokio::test]
async fn test_sub_attribute_filter_and_extension_paths() {
    let provider = provider();
    let user = create(&provider, "User", UserBuilder::new_full("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let patched = patch(
        &provider,
        "User",
        &id,
        vec![
            PatchOperation::replace("name.givenName", json!("Babs")),
            PatchOperation::replace("emails[type eq \"home\"].value", json!("babs@example.org")),
            PatchOperation::add(
                &format!("{}:employeeNumber", ENTERPRISE_SCHEMA),
                json!("701984"),
            ),
        ],
    )
    .await
    .unwrap();

    assert_eq!(patched.get("name").unwrap()["givenName"], "Babs");
    assert_eq!(patched.get("name").unwrap()["familyName"], "Jensen");
    let emails = patched.get("emails").unwrap().as_array().unwrap();
    assert!(emails.iter().any(|e| e["value"] == "babs@example.org"));
    assert_eq!(
        patched.extension(ENTERPRISE_SCHEMA).unwrap()["employeeNumber"],
        "701984"
    );
    assert!(patched.schemas.iter().any(|s| s == ENTERPRISE_SCHEMA));
}

#[tokio::test]
async fn test_pathless_replace_merges_attributes() {
    let provider = provider();
    let user = create(&provider, "User", UserBuilder::new_full("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let patched = patch(
        &provider,
        "User",
        &id,
        vec![PatchOperation::merge(
            PatchOpKind::Replace,
            json!({"displayName": "Barbara", "active": false}),
        )],
    )
    .await
    .unwrap();

    assert_eq!(patched.get_str("displayName"), Some("Barbara"));
    assert_eq!(patched.get("active"), Some(&json!(false)));
    assert_eq!(patched.get_str("userName"), Some("bjensen"));
}

#[tokio::test]
async fn test_remove_required_attribute_is_rejected() {
    let provider = provider();
    let user = create(&provider, "User", UserBuilder::new("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let err = patch(&provider, "User", &id, vec![PatchOperation::remove("userName")])
        .await
        .unwrap_err();
    assert!(matches!(err, ScimError::Validation(_)));
}

#[tokio::test]
async fn test_patch_cannot_take_a_unique_value() {
    let provider = provider();
    create(&provider, "User", UserBuilder::new("taken").build()).await;
    let user = create(&provider, "User", UserBuilder::new("bjensen").build()).await;
    let id = user.id.clone().unwrap();

    let err = patch(&provider, "User", &id, vec![PatchOperation::replace("userName", json!("TAKEN"))])
        .await
        .unwrap_err();
    assert!(matches!(err, ScimError::Conflict { .. }));
}

#[tokio::test]
async fn test_malformed_request_bodies() {
    assert!(PatchRequest::from_json(json!({"Operations": []})).is_err());

    let missing_value = PatchRequest::from_json(json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
        "Operations": [{"op": "add", "path": "displayName"}]
    }));
    assert!(matches!(missing_value, Err(ScimError::InvalidSyntax { .. })));

    let unknown_op = PatchRequest::from_json(json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
        "Operations": [{"op": "move", "path": "displayName", "value": "x"}]
    }));
    assert!(unknown_op.is_err());
}
