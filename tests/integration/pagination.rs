//! Paging boundaries, sort stability and page-size settings.

use crate::common::builders::UserBuilder;
use crate::common::{context, create, init_logging};
use proptest::prelude::*;
use scim_engine::providers::{ProviderSettings, StandardResourceProvider};
use scim_engine::query::{QueryPipeline, SortSpec};
use scim_engine::storage::InMemoryRepository;
use scim_engine::{ListQuery, Resource, SortOrder, TypeDefinitionRegistry};
use serde_json::json;
use std::sync::Arc;

fn users(count: usize) -> Vec<Resource> {
    (0..count)
        .map(|i| {
            let mut user = Resource::from_json("User", UserBuilder::new(&format!("user{:03}", i)).build())
                .unwrap();
            user.id = Some(format!("id-{}", i));
            user
        })
        .collect()
}

fn execute(collection: Vec<Resource>, sort: Option<&SortSpec>, start: i64, count: i64) -> Vec<String> {
    let registry = TypeDefinitionRegistry::builtin().unwrap();
    let definition = registry.resource_type("User").unwrap();
    QueryPipeline::execute(definition, collection, None, sort, start, count)
        .resources
        .into_iter()
        .filter_map(|r| r.get_str("userName").map(String::from))
        .collect()
}

proptest! {
    #[test]
    fn page_is_the_expected_window(total in 0usize..40, start in -3i64..50, count in -2i64..20) {
        let registry = TypeDefinitionRegistry::builtin().unwrap();
        let definition = registry.resource_type("User").unwrap();
        let page = QueryPipeline::execute(definition, users(total), None, None, start, count);

        let first = start.max(1) as usize;
        let available = (total + 1).saturating_sub(first);
        let expected = if count <= 0 { available } else { available.min(count as usize) };

        prop_assert_eq!(page.total_results, total);
        prop_assert_eq!(page.start_index, first);
        prop_assert_eq!(page.items_per_page(), expected);
        if let Some(head) = page.resources.first() {
            prop_assert_eq!(head.id.clone(), Some(format!("id-{}", first - 1)));
        }
    }
}

#[test]
fn test_sort_is_stable_and_missing_values_go_last() {
    let mut collection = Vec::new();
    for (name, title) in [("a", Some("Same")), ("b", None), ("c", Some("Same")), ("d", Some("Alpha"))] {
        let mut body = UserBuilder::new(name).build();
        if let Some(title) = title {
            body["title"] = json!(title);
        }
        collection.push(Resource::from_json("User", body).unwrap());
    }

    let ascending = SortSpec::parse("title", Some(SortOrder::Ascending)).unwrap();
    assert_eq!(execute(collection.clone(), Some(&ascending), 1, 0), ["d", "a", "c", "b"]);

    let descending = SortSpec::parse("title", Some(SortOrder::Descending)).unwrap();
    assert_eq!(execute(collection, Some(&descending), 1, 0), ["a", "c", "d", "b"]);
}

#[test]
fn test_sort_by_multi_valued_uses_primary() {
    let collection = vec![
        Resource::from_json(
            "User",
            UserBuilder::new("first")
                .with_email("zed@example.com", "work", false)
                .with_email("amy@example.com", "home", true)
                .build(),
        )
        .unwrap(),
        Resource::from_json(
            "User",
            UserBuilder::new("second")
                .with_email("bob@example.com", "work", true)
                .build(),
        )
        .unwrap(),
    ];

    let spec = SortSpec::parse("emails", None).unwrap();
    assert_eq!(execute(collection, Some(&spec), 1, 0), ["first", "second"]);
}

#[tokio::test]
async fn test_provider_applies_page_size_settings() {
    init_logging();
    let registry = Arc::new(TypeDefinitionRegistry::builtin().unwrap());
    let settings = ProviderSettings {
        default_page_size: 2,
        max_page_size: 3,
        ..ProviderSettings::default()
    };
    let provider =
        StandardResourceProvider::with_settings(InMemoryRepository::new(), registry, settings);
    for i in 0..5 {
        create(&provider, "User", UserBuilder::new(&format!("user{}", i)).build()).await;
    }

    let search = |query: ListQuery| {
        let provider = provider.clone();
        async move { provider.search("User", &query, &context()).await.into_result().unwrap() }
    };

    let default = search(ListQuery::new()).await;
    assert_eq!((default.total_results, default.items_per_page()), (5, 2));

    let clamped = search(ListQuery::new().with_count(50)).await;
    assert_eq!(clamped.items_per_page(), 3);

    let unlimited = search(ListQuery::new().with_count(0)).await;
    assert_eq!(unlimited.items_per_page(), 5);

    let past_end = search(ListQuery::new().with_start_index(9)).await;
    assert_eq!((past_end.total_results, past_end.items_per_page()), (5, 0));
}
