//! Builder for configuring SCIM server instances.
//!
//! The builder is where startup happens: the type-definition registry is
//! resolved from the built-in builders plus any custom ones, and every
//! configuration problem surfaces here as a [`BuildError`] instead of at
//! request time.

use super::config::ScimServerConfig;
use super::core::ScimServer;
use crate::error::{BuildError, BuildResult};
use crate::providers::StandardResourceProvider;
use crate::schema::{TypeDefinitionBuilder, TypeDefinitionRegistry, builtin_builders};
use crate::storage::ResourceRepository;
use log::info;
use std::sync::Arc;

/// Builder for configuring and creating SCIM server instances.
///
/// # Examples
///
/// ```rust
/// use scim_engine::ScimServerBuilder;
/// use scim_engine::storage::InMemoryRepository;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let server = ScimServerBuilder::new(InMemoryRepository::new())
///     .with_base_url("https://scim.company.com")
///     .with_page_sizes(50, 500)
///     .build()?;
/// assert_eq!(server.config().default_page_size, 50);
/// # Ok(())
/// # }
/// ```
pub struct ScimServerBuilder<R> {
    repository: Option<R>,
    config: ScimServerConfig,
    definitions: Vec<Box<dyn TypeDefinitionBuilder>>,
}

impl<R: ResourceRepository> Default for ScimServerBuilder<R> {
    fn default() -> Self {
        Self {
            repository: None,
            config: ScimServerConfig::default(),
            definitions: Vec::new(),
        }
    }
}

impl<R: ResourceRepository> ScimServerBuilder<R> {
    /// Start from the default configuration with a repository.
    pub fn new(repository: R) -> Self {
        Self::default().with_repository(repository)
    }

    pub fn with_repository(mut self, repository: R) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_config(mut self, config: ScimServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL, without the SCIM version segment.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the SCIM protocol version used in URLs. Defaults to "v2".
    pub fn with_scim_version(mut self, version: impl Into<String>) -> Self {
        self.config.scim_version = version.into();
        self
    }

    pub fn with_page_sizes(mut self, default_page_size: usize, max_page_size: usize) -> Self {
        self.config.default_page_size = default_page_size;
        self.config.max_page_size = max_page_size;
        self
    }

    /// Register a custom type definition.
    ///
    /// A custom builder targeting the same shape as a built-in one replaces it.
    pub fn with_definition(mut self, builder: Box<dyn TypeDefinitionBuilder>) -> Self {
        self.definitions.push(builder);
        self
    }

    /// Resolve the registry and build the server.
    ///
    /// # Errors
    ///
    /// * [`BuildError::MissingRepository`] without a repository
    /// * [`BuildError::InvalidConfiguration`] for an invalid config
    /// * any registry resolution error, e.g. [`BuildError::UnknownShape`]
    pub fn build(self) -> BuildResult<ScimServer<R>> {
        let repository = self.repository.ok_or(BuildError::MissingRepository)?;
        self.config.validate()?;

        let custom = self.definitions.len();
        let mut candidates = builtin_builders();
        candidates.extend(self.definitions);
        let registry = Arc::new(TypeDefinitionRegistry::resolve(candidates)?);

        info!(
            "SCIM server built with {} resource type(s) ({} custom definition(s)) at {}/{}",
            registry.resource_types().count(),
            custom,
            self.config.base_url,
            self.config.scim_version
        );

        let provider = StandardResourceProvider::with_settings(
            repository,
            registry,
            self.config.provider_settings(),
        );
        Ok(ScimServer::from_parts(provider, self.config))
    }
}
