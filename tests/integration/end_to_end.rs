//! Request flows through `ScimServer::handle`.

use crate::common::builders::{ENTERPRISE_SCHEMA, GroupBuilder, UserBuilder, patch_body};
use crate::common::{body, post, server};
use scim_engine::{Method, ScimRequest};
use serde_json::json;

#[tokio::test]
async fn test_user_lifecycle() {
    let server = server();
    let (id, created) = post(&server, "/Users", UserBuilder::new("daniel").build()).await;
    let path = format!("/Users/{}", id);
    let created_at = body(&created)["meta"]["created"].clone();

    let patched = server
        .handle(ScimRequest::new(Method::Patch, &path).with_body(patch_body(&[(
            "replace",
            Some("userName"),
            Some(json!("daniel2")),
        )])))
        .await;
    assert_eq!(patched.status, 200);
    assert_eq!(body(&patched)["userName"], "daniel2");
    assert_ne!(patched.etag, created.etag);
    assert_eq!(body(&patched)["meta"]["created"], created_at);

    let found = server
        .handle(ScimRequest::new(Method::Get, "/Users").with_query("filter", r#"userName eq "daniel2""#))
        .await;
    assert_eq!(body(&found)["totalResults"], 1);
    assert_eq!(body(&found)["Resources"][0]["id"], id.as_str());

    let replaced = server
        .handle(ScimRequest::new(Method::Put, &path).with_body(
            UserBuilder::new("daniel3")
                .with_id("client-chosen")
                .with_display_name("Daniel")
                .build(),
        ))
        .await;
    assert_eq!(replaced.status, 200);
    assert_eq!(body(&replaced)["id"], id.as_str());
    assert_eq!(body(&replaced)["meta"]["created"], created_at);
    assert_eq!(body(&replaced)["displayName"], "Daniel");

    let deleted = server
        .handle(ScimRequest::new(Method::Delete, &path).with_request_id("req-delete-1"))
        .await;
    assert_eq!(deleted.status, 204);

    let gone = server.handle(ScimRequest::new(Method::Get, &path)).await;
    assert_eq!(gone.status, 404);
    assert_eq!(body(&gone)["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:Error");
}

#[tokio::test]
async fn test_group_membership_is_reflected_on_users() {
    let server = server();
    let (user_id, _) = post(&server, "/Users", UserBuilder::new("bjensen").build()).await;
    let (group_id, _) = post(
        &server,
        "/Groups",
        GroupBuilder::new("Tour Guides").with_member(&user_id).build(),
    )
    .await;

    let user = server
        .handle(ScimRequest::new(Method::Get, format!("/Users/{}", user_id)))
        .await;
    let groups = body(&user)["groups"].as_array().cloned().unwrap_or_default();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["value"], group_id.as_str());
    assert_eq!(groups[0]["display"], "Tour Guides");
    assert_eq!(
        groups[0]["$ref"],
        format!("https://example.com/v2/Groups/{}", group_id).as_str()
    );

    let emptied = server
        .handle(
            ScimRequest::new(Method::Patch, format!("/Groups/{}", group_id))
                .with_body(patch_body(&[("remove", Some("members"), None)])),
        )
        .await;
    assert_eq!(emptied.status, 200);

    let user = server
        .handle(ScimRequest::new(Method::Get, format!("/Users/{}", user_id)))
        .await;
    assert!(body(&user).get("groups").is_none());
}

#[tokio::test]
async fn test_error_responses_carry_scim_types() {
    let server = server();
    post(&server, "/Users", UserBuilder::new("bjensen").build()).await;

    let duplicate = server
        .handle(ScimRequest::new(Method::Post, "/Users").with_body(UserBuilder::new("bjensen").build()))
        .await;
    assert_eq!(duplicate.status, 409);
    assert_eq!(body(&duplicate)["scimType"], "uniqueness");

    let invalid = server
        .handle(ScimRequest::new(Method::Post, "/Users").with_body(UserBuilder::new("x").without_username().build()))
        .await;
    assert_eq!(invalid.status, 400);
    assert_eq!(body(&invalid)["scimType"], "invalidValue");

    let bad_path = server
        .handle(ScimRequest::new(Method::Get, "/Users").with_query("sortBy", "emails["))
        .await;
    assert_eq!(bad_path.status, 400);

    let bad_patch = server
        .handle(
            ScimRequest::new(Method::Patch, "/Users/missing")
                .with_body(patch_body(&[("replace", Some("userName"), Some(json!("x")))])),
        )
        .await;
    assert_eq!(bad_patch.status, 404);
}

#[tokio::test]
async fn test_enterprise_extension_round_trip() {
    let server = server();
    let (id, created) = post(
        &server,
        "/Users",
        UserBuilder::new("bjensen")
            .with_enterprise(json!({"employeeNumber": "701984", "department": "Tour Operations"}))
            .build(),
    )
    .await;
    assert_eq!(body(&created)[ENTERPRISE_SCHEMA]["department"], "Tour Operations");

    let excluded = server
        .handle(
            ScimRequest::new(Method::Get, format!("/Users/{}", id))
                .with_query("excludedAttributes", ENTERPRISE_SCHEMA),
        )
        .await;
    assert!(body(&excluded).get(ENTERPRISE_SCHEMA).is_none());
    assert_eq!(body(&excluded)["userName"], "bjensen");

    let filtered = server
        .handle(ScimRequest::new(Method::Get, "/Users").with_query(
            "filter",
            format!(r#"{}:department sw "tour""#, ENTERPRISE_SCHEMA),
        ))
        .await;
    assert_eq!(body(&filtered)["totalResults"], 1);
}
