//! Core SCIM server structure.

use super::builder::ScimServerBuilder;
use super::config::ScimServerConfig;
use crate::providers::StandardResourceProvider;
use crate::schema::TypeDefinitionRegistry;
use crate::storage::ResourceRepository;

/// SCIM server: a resolved registry, a provider and the request dispatcher.
///
/// Built once at startup through [`ScimServerBuilder`]; afterwards it is
/// immutable and safe to share across request tasks.
///
/// # Type Parameters
///
/// * `R` - The repository type that implements [`ResourceRepository`]
///
/// # Examples
///
/// ```rust
/// use scim_engine::{ScimRequest, ScimServer};
/// use scim_engine::outcome::Method;
/// use scim_engine::storage::InMemoryRepository;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = ScimServer::builder(InMemoryRepository::new()).build()?;
///
/// let response = server
///     .handle(ScimRequest::new(Method::Post, "/Users").with_body(json!({
///         "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
///         "userName": "bjensen"
///     })))
///     .await;
/// assert_eq!(response.status, 201);
/// assert!(response.etag.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScimServer<R: ResourceRepository> {
    pub(super) provider: StandardResourceProvider<R>,
    pub(super) config: ScimServerConfig,
}

impl<R: ResourceRepository> ScimServer<R> {
    /// Start building a server around `repository`.
    pub fn builder(repository: R) -> ScimServerBuilder<R> {
        ScimServerBuilder::new(repository)
    }

    pub(super) fn from_parts(provider: StandardResourceProvider<R>, config: ScimServerConfig) -> Self {
        Self { provider, config }
    }

    /// The provider, for typed access to the workflows without a transport.
    pub fn provider(&self) -> &StandardResourceProvider<R> {
        &self.provider
    }

    pub fn registry(&self) -> &TypeDefinitionRegistry {
        self.provider.registry()
    }

    pub fn config(&self) -> &ScimServerConfig {
        &self.config
    }
}
