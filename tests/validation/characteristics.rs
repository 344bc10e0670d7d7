//! Attribute characteristics: required, multiplicity, value kinds,
//! canonical values and primary flags.

use crate::common::builders::{GroupBuilder, UserBuilder};
use crate::common::{context, create, provider};
use scim_engine::{ScimError, ValidationError};
use serde_json::{Value, json};

async fn user_error(body: Value) -> ValidationError {
    match provider().create("User", body, &context()).await.into_result() {
        Err(ScimError::Validation(error)) => error,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_required_attribute() {
    let error = user_error(UserBuilder::new("bjensen").without_username().build()).await;
    assert!(matches!(error, ValidationError::MissingRequiredAttribute { ref attribute } if attribute == "userName"));

    let error = user_error(UserBuilder::new("bjensen").with("userName", Value::Null).build()).await;
    assert!(matches!(error, ValidationError::MissingRequiredAttribute { .. }));
}

#[tokio::test]
async fn test_required_sub_attribute() {
    let error = user_error(
        UserBuilder::new("bjensen")
            .with("emails", json!([{"type": "work"}]))
            .build(),
    )
    .await;
    assert!(matches!(error, ValidationError::MissingSubAttribute { ref sub_attribute, .. } if sub_attribute == "value"));
}

#[tokio::test]
async fn test_multiplicity() {
    let error = user_error(
        UserBuilder::new("bjensen")
            .with("emails", json!({"value": "bjensen@example.com"}))
            .build(),
    )
    .await;
    assert!(matches!(error, ValidationError::ExpectedMultiValue { .. }));

    let error = user_error(
        UserBuilder::new("bjensen")
            .with("displayName", json!(["Babs", "Barbara"]))
            .build(),
    )
    .await;
    assert!(matches!(error, ValidationError::ExpectedSingleValue { .. }));
}

#[tokio::test]
async fn test_value_kinds() {
    for (attribute, value) in [
        ("active", json!("yes")),
        ("userName", json!(42)),
        ("name", json!("Barbara Jensen")),
        ("profileUrl", json!(true)),
    ] {
        let error = user_error(UserBuilder::new("bjensen").with(attribute, value).build()).await;
        assert!(
            matches!(error, ValidationError::InvalidDataType { .. }),
            "{}: {:?}",
            attribute,
            error
        );
    }

    let error = user_error(
        UserBuilder::new("bjensen")
            .with("x509Certificates", json!([{"value": "not base64!"}]))
            .build(),
    )
    .await;
    assert!(matches!(error, ValidationError::InvalidBinaryData { .. }));
}

#[tokio::test]
async fn test_canonical_values() {
    let error = user_error(
        UserBuilder::new("bjensen")
            .with_email("bjensen@example.com", "vacation", false)
            .build(),
    )
    .await;
    assert!(matches!(error, ValidationError::InvalidCanonicalValue { .. }));

    let provider = provider();
    create(
        &provider,
        "User",
        UserBuilder::new("bjensen")
            .with_email("bjensen@example.com", "work", false)
            .build(),
    )
    .await;
}

#[tokio::test]
async fn test_single_primary_value() {
    let error = user_error(
        UserBuilder::new("bjensen")
            .with_email("a@example.com", "work", true)
            .with_email("b@example.com", "home", true)
            .build(),
    )
    .await;
    assert!(matches!(error, ValidationError::MultiplePrimaryValues { .. }));
}

#[tokio::test]
async fn test_write_only_password_is_accepted_but_never_returned() {
    let provider = provider();
    let created = create(
        &provider,
        "User",
        UserBuilder::new("bjensen").with("password", json!("t1meMa$heen")).build(),
    )
    .await;

    let registry = provider.registry();
    let definition = registry.resource_type("User").unwrap();
    let rendered = scim_engine::resource::Projection::all().apply(definition, &created);
    assert!(rendered.get("password").is_none());
    assert_eq!(rendered["userName"], "bjensen");
}

#[tokio::test]
async fn test_group_member_type_is_canonical() {
    let mut group = GroupBuilder::new("Admins").build();
    group["members"] = json!([{"value": "u-1", "type": "Printer"}]);

    let outcome = provider().create("Group", group, &context()).await;
    assert!(matches!(
        outcome.error(),
        Some(ScimError::Validation(ValidationError::InvalidCanonicalValue { .. }))
    ));
}
