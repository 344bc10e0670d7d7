//! Version fingerprint properties.

use crate::common::builders::UserBuilder;
use crate::common::{context, create, provider};
use proptest::prelude::*;
use scim_engine::Resource;
use scim_engine::resource::{HttpVersion, RawVersion, VersionCalculator};
use serde_json::{Map, Value, json};

fn user(user_name: &str, display_name: &str) -> Resource {
    Resource::from_json(
        "User",
        UserBuilder::new(user_name)
            .with_display_name(display_name)
            .build(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn version_is_deterministic(name in "[a-z]{1,12}", display in "[A-Za-z ]{0,20}") {
        prop_assert_eq!(
            VersionCalculator::compute(&user(&name, &display)),
            VersionCalculator::compute(&user(&name, &display))
        );
    }

    #[test]
    fn version_tracks_content(a in "[a-z]{1,12}", b in "[a-z]{1,12}") {
        prop_assume!(a != b);
        prop_assert_ne!(
            VersionCalculator::compute(&user(&a, "Same")),
            VersionCalculator::compute(&user(&b, "Same"))
        );
    }

    #[test]
    fn attribute_order_does_not_matter(keys in proptest::collection::btree_set("[a-z]{3,8}", 1..6)) {
        let forward: Map<String, Value> = keys.iter().map(|k| (k.clone(), json!(k))).collect();
        let backward: Map<String, Value> = keys.iter().rev().map(|k| (k.clone(), json!(k))).collect();

        let mut first = Resource::new("User");
        first.attributes = forward;
        let mut second = Resource::new("User");
        second.attributes = backward;

        prop_assert_eq!(VersionCalculator::compute(&first), VersionCalculator::compute(&second));
    }
}

#[test]
fn test_attribute_name_casing_does_not_matter() {
    let camel = Resource::from_json("User", json!({"userName": "x", "name": {"givenName": "Babs"}})).unwrap();
    let upper = Resource::from_json("User", json!({"USERNAME": "x", "NAME": {"GIVENNAME": "Babs"}})).unwrap();
    assert_eq!(VersionCalculator::compute(&camel), VersionCalculator::compute(&upper));

    let other_value = Resource::from_json("User", json!({"userName": "X"})).unwrap();
    let same_value = Resource::from_json("User", json!({"USERNAME": "x"})).unwrap();
    assert_ne!(VersionCalculator::compute(&other_value), VersionCalculator::compute(&same_value));
}

#[tokio::test]
async fn test_replace_with_recased_keys_keeps_version() {
    let provider = provider();
    let created = create(
        &provider,
        "User",
        json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bjensen",
            "displayName": "Babs",
            "emails": [{"value": "bjensen@example.com", "type": "work"}]
        }),
    )
    .await;
    let id = created.id().unwrap();

    let replaced = provider
        .replace(
            "User",
            id,
            json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                "USERNAME": "bjensen",
                "displayname": "Babs",
                "Emails": [{"VALUE": "bjensen@example.com", "Type": "work"}]
            }),
            created.version().as_ref(),
            &context(),
        )
        .await
        .into_result()
        .unwrap();

    assert_eq!(replaced.version(), created.version());
    assert!(replaced.attributes.contains_key("userName"));
    assert!(replaced.attributes.contains_key("displayName"));
    assert_eq!(replaced.get("emails").unwrap()[0]["value"], "bjensen@example.com");
}

#[test]
fn test_identity_and_meta_are_not_tracked() {
    let mut a = user("bjensen", "Babs");
    let mut b = a.clone();
    a.id = Some("one".to_string());
    b.id = Some("two".to_string());
    b.stamp_modified(chrono::Utc::now());

    assert_eq!(VersionCalculator::compute(&a), VersionCalculator::compute(&b));
}

#[test]
fn test_http_and_raw_forms_compare_equal() {
    let raw = VersionCalculator::compute(&user("bjensen", "Babs"));
    let http: HttpVersion = raw.clone().into();
    let weak = format!("W/\"{}\"", raw.as_str());

    assert_eq!(http.to_string(), weak);
    let parsed: HttpVersion = weak.parse().unwrap();
    let back: RawVersion = parsed.into();
    assert_eq!(back, raw);
}

#[tokio::test]
async fn test_stored_meta_version_matches_calculator() {
    let provider = provider();
    let created = create(&provider, "User", UserBuilder::new_full("bjensen").build()).await;

    let stored = created.version().unwrap();
    assert_eq!(stored, VersionCalculator::compute(&created));
    assert!(VersionCalculator::matches(&created, &stored));
}
