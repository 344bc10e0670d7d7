//! Common test utilities: server and provider setup plus request helpers.

pub mod builders;

use scim_engine::outcome::Method;
use scim_engine::providers::StandardResourceProvider;
use scim_engine::schema::TypeDefinitionRegistry;
use scim_engine::storage::InMemoryRepository;
use scim_engine::{RequestContext, Resource, ScimRequest, ScimServer, TransportResponse};
use serde_json::Value;
use std::sync::Arc;

pub type TestServer = ScimServer<InMemoryRepository>;
pub type TestProvider = StandardResourceProvider<InMemoryRepository>;

/// Install `env_logger` once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn server() -> TestServer {
    init_logging();
    ScimServer::builder(InMemoryRepository::new())
        .with_base_url("https://example.com")
        .build()
        .expect("built-in registry resolves")
}

pub fn provider() -> TestProvider {
    init_logging();
    let registry = Arc::new(TypeDefinitionRegistry::builtin().expect("built-in registry resolves"));
    StandardResourceProvider::new(InMemoryRepository::new(), registry)
}

pub fn context() -> RequestContext {
    RequestContext::with_generated_id()
}

/// Create through the provider, panicking on failure.
pub async fn create(provider: &TestProvider, resource_type: &str, body: Value) -> Resource {
    provider
        .create(resource_type, body, &context())
        .await
        .into_result()
        .unwrap_or_else(|e| panic!("create {} failed: {}", resource_type, e))
}

/// POST through the server and return `(id, response)`.
pub async fn post(server: &TestServer, endpoint: &str, body: Value) -> (String, TransportResponse) {
    let response = server
        .handle(ScimRequest::new(Method::Post, endpoint).with_body(body))
        .await;
    assert_eq!(response.status, 201, "unexpected response: {:?}", response.body);
    let id = response.body.as_ref().and_then(|b| b["id"].as_str()).map(String::from);
    (id.expect("created resource has an id"), response)
}

/// The response body, panicking when there is none.
pub fn body(response: &TransportResponse) -> &Value {
    response.body.as_ref().expect("response has a body")
}
