//! Filter expressions evaluated against a fixed population of users.
//!
//! Each row names a filter and the userNames it must select, in store order.

use crate::common::builders::UserBuilder;
use scim_engine::filter::{CompiledFilter, FilterLimits};
use scim_engine::{Resource, TypeDefinitionRegistry};
use serde_json::json;

fn population() -> Vec<Resource> {
    let bodies = vec![
        UserBuilder::new("bjensen")
            .with("title", json!("Tour Guide"))
            .with_family_name("Jensen")
            .with_email("bjensen@example.com", "work", true)
            .with_active(true)
            .with_enterprise(json!({"employeeNumber": "701984", "manager": {"value": "m-1"}}))
            .build(),
        UserBuilder::new("jsmith")
            .with_family_name("Smith")
            .with_email("jsmith@example.org", "home", false)
            .with_email("john@work.example.com", "work", true)
            .with_active(false)
            .build(),
        UserBuilder::new("ADMIN")
            .with("externalId", json!("Ext-7"))
            .with("title", json!("Administrator"))
            .with_active(true)
            .build(),
        UserBuilder::new("nobody").build(),
    ];
    bodies
        .into_iter()
        .map(|body| Resource::from_json("User", body).unwrap())
        .collect()
}

fn selected(filter: &str) -> Vec<String> {
    let registry = TypeDefinitionRegistry::builtin().unwrap();
    let definition = registry.resource_type("User").unwrap();
    let compiled = CompiledFilter::compile(filter)
        .unwrap_or_else(|e| panic!("filter '{}' should parse: {}", filter, e));
    population()
        .iter()
        .filter(|user| compiled.matches(user, definition))
        .filter_map(|user| user.get_str("userName").map(String::from))
        .collect()
}

#[test]
fn test_filter_table() {
    let table: &[(&str, &[&str])] = &[
        (r#"userName eq "BJENSEN""#, &["bjensen"]),
        (r#"userName ne "bjensen""#, &["jsmith", "ADMIN", "nobody"]),
        (r#"externalId eq "ext-7""#, &[]),
        (r#"externalId eq "Ext-7""#, &["ADMIN"]),
        (r#"name.familyName co "ens""#, &["bjensen"]),
        (r#"userName sw "j""#, &["jsmith"]),
        (r#"userName ew "N""#, &["bjensen", "ADMIN"]),
        ("title pr", &["bjensen", "ADMIN"]),
        ("not (title pr)", &["jsmith", "nobody"]),
        ("active eq true", &["bjensen", "ADMIN"]),
        ("active eq false", &["jsmith"]),
        (r#"emails.type eq "work""#, &["bjensen", "jsmith"]),
        (r#"emails[type eq "work" and value co "example.com"]"#, &["bjensen", "jsmith"]),
        (r#"emails[type eq "home" and primary eq true]"#, &[]),
        (r#"emails co "example.org""#, &["jsmith"]),
        (
            r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:employeeNumber eq "701984""#,
            &["bjensen"],
        ),
        (
            r#"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager.value pr"#,
            &["bjensen"],
        ),
        (r#"title eq null"#, &["jsmith", "nobody"]),
        (
            r#"userName eq "nobody" or title pr and active eq true"#,
            &["bjensen", "ADMIN", "nobody"],
        ),
        (
            r#"(userName eq "nobody" or title pr) and active eq false"#,
            &[],
        ),
        (r#"favoriteColor eq "blue""#, &[]),
        (r#"userName gt "j""#, &["jsmith", "nobody"]),
    ];

    for (filter, expected) in table {
        assert_eq!(&selected(filter), expected, "filter: {}", filter);
    }
}

#[test]
fn test_rejected_filters() {
    for filter in [
        "",
        "userName",
        r#"userName eq"#,
        r#"userName zz "x""#,
        r#"(userName eq "x""#,
        r#"userName eq "x" and"#,
        r#"emails[type eq "work""#,
        r#"userName eq "unterminated"#,
    ] {
        assert!(CompiledFilter::compile(filter).is_err(), "should reject: {:?}", filter);
    }
}

#[test]
fn test_limits_reject_oversized_filters() {
    let limits = FilterLimits {
        max_length: 64,
        max_depth: 3,
    };

    let long = format!(r#"userName eq "{}""#, "x".repeat(80));
    let error = CompiledFilter::compile_with(&long, limits).unwrap_err();
    assert!(error.is_too_large());

    let deep = format!("{}title pr{}", "(".repeat(6), ")".repeat(6));
    let error = CompiledFilter::compile_with(&deep, limits).unwrap_err();
    assert!(error.is_too_large());

    assert!(CompiledFilter::compile_with("(title pr)", limits).is_ok());
}
