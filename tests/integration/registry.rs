//! Custom resource type definitions and discovery documents.

use crate::common::{body, init_logging};
use scim_engine::error::BuildError;
use scim_engine::schema::{SchemaJsonBuilder, shapes};
use scim_engine::storage::InMemoryRepository;
use scim_engine::{Method, ScimRequest, ScimServer};
use serde_json::json;

const DEVICE_SCHEMA: &str = r#"{
    "id": "urn:example:params:scim:schemas:Device",
    "name": "Device",
    "description": "Managed hardware",
    "attributes": [
        {"name": "serialNumber", "type": "string", "required": true, "caseExact": true,
         "mutability": "immutable", "uniqueness": "server"},
        {"name": "model", "type": "string"},
        {"name": "retired", "type": "boolean"}
    ]
}"#;

const SLIM_USER_SCHEMA: &str = r#"{
    "id": "urn:ietf:params:scim:schemas:core:2.0:User",
    "name": "User",
    "description": "User without the optional attributes",
    "attributes": [
        {"name": "userName", "type": "string", "required": true, "uniqueness": "server"},
        {"name": "active", "type": "boolean"}
    ]
}"#;

fn device_server() -> ScimServer<InMemoryRepository> {
    init_logging();
    ScimServer::builder(InMemoryRepository::new())
        .with_definition(Box::new(SchemaJsonBuilder::resource(
            "Device",
            DEVICE_SCHEMA,
            "/Devices",
        )))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_custom_type_is_served() {
    let server = device_server();

    let created = server
        .handle(ScimRequest::new(Method::Post, "/Devices").with_body(json!({
            "schemas": ["urn:example:params:scim:schemas:Device"],
            "serialNumber": "SN-1",
            "model": "T-800"
        })))
        .await;
    assert_eq!(created.status, 201);
    assert_eq!(body(&created)["meta"]["resourceType"], "Device");
    let id = body(&created)["id"].as_str().unwrap().to_string();

    let duplicate = server
        .handle(ScimRequest::new(Method::Post, "/Devices").with_body(json!({
            "schemas": ["urn:example:params:scim:schemas:Device"],
            "serialNumber": "SN-1"
        })))
        .await;
    assert_eq!(duplicate.status, 409);

    let listed = server
        .handle(ScimRequest::new(Method::Get, "/Devices").with_query("filter", r#"model sw "t""#))
        .await;
    assert_eq!(body(&listed)["Resources"][0]["id"], id.as_str());

    let described = server
        .handle(ScimRequest::new(Method::Get, "/ResourceTypes/Device"))
        .await;
    assert_eq!(body(&described)["endpoint"], "/Devices");
    assert_eq!(body(&described)["schema"], "urn:example:params:scim:schemas:Device");
}

#[tokio::test]
async fn test_custom_definition_replaces_builtin() {
    init_logging();
    let server = ScimServer::builder(InMemoryRepository::new())
        .with_definition(Box::new(
            SchemaJsonBuilder::resource(shapes::USER, SLIM_USER_SCHEMA, "/Users")
                .with_extension(shapes::ENTERPRISE_USER, false),
        ))
        .build()
        .unwrap();

    let user = server.registry().resource_type("User").unwrap();
    assert!(user.attribute("emails").is_none());
    assert!(user.attribute("active").is_some());

    let rejected = server
        .handle(ScimRequest::new(Method::Post, "/Users").with_body(json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bjensen",
            "emails": [{"value": "bjensen@example.com"}]
        })))
        .await;
    assert_eq!(rejected.status, 400);
}

#[test]
fn test_unresolvable_extension_fails_the_build() {
    let result = ScimServer::builder(InMemoryRepository::new())
        .with_definition(Box::new(
            SchemaJsonBuilder::resource("Device", DEVICE_SCHEMA, "/Devices")
                .with_extension("Warranty", false),
        ))
        .build();
    assert!(result.is_err());
}

#[test]
fn test_malformed_schema_json_fails_the_build() {
    let result = ScimServer::builder(InMemoryRepository::new())
        .with_definition(Box::new(SchemaJsonBuilder::resource(
            "Broken",
            "{ not json",
            "/Broken",
        )))
        .build();
    assert!(matches!(result, Err(BuildError::SchemaLoadError { .. })));
}

#[tokio::test]
async fn test_schema_documents_describe_every_type() {
    let server = device_server();
    let listed = server.handle(ScimRequest::new(Method::Get, "/Schemas")).await;
    assert_eq!(body(&listed)["totalResults"], 4);

    let device = server
        .handle(ScimRequest::new(
            Method::Get,
            "/Schemas/urn:example:params:scim:schemas:Device",
        ))
        .await;
    assert_eq!(device.status, 200);
    assert_eq!(device.body.as_ref().unwrap()["attributes"][0]["name"], "serialNumber");
    assert_eq!(
        device.body.as_ref().unwrap()["schemas"][0],
        "urn:ietf:params:scim:schemas:core:2.0:Schema"
    );

    let types = server.handle(ScimRequest::new(Method::Get, "/ResourceTypes")).await;
    assert_eq!(body(&types)["totalResults"], 3);
}
