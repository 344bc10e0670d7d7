//! Server configuration.

use crate::error::{BuildError, BuildResult};
use crate::filter::{FilterLimits, MAX_FILTER_DEPTH, MAX_FILTER_LENGTH};
use crate::providers::{LocationBase, ProviderSettings};

/// Configuration for a [`ScimServer`](super::ScimServer).
///
/// `base_url` and `scim_version` combine into `meta.location` and `$ref`
/// values, e.g. `https://scim.example.com` + `v2` gives
/// `https://scim.example.com/v2/Users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScimServerConfig {
    /// Base URL without the SCIM version segment.
    /// Examples: "https://scim.example.com", "http://localhost:8080"
    pub base_url: String,

    /// SCIM protocol version path segment. Defaults to "v2".
    pub scim_version: String,

    /// Page size used when a list request has no `count`.
    pub default_page_size: usize,

    /// Largest `count` honoured; larger values are clamped.
    pub max_page_size: usize,

    /// Longest filter expression accepted, in bytes.
    pub max_filter_length: usize,

    /// Deepest nesting of groups, `not` and value filters accepted.
    pub max_filter_depth: usize,

    /// Advertised to the transport; the engine itself does not enforce it.
    pub require_https: bool,
}

impl Default for ScimServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            scim_version: "v2".to_string(),
            default_page_size: 100,
            max_page_size: 1000,
            max_filter_length: MAX_FILTER_LENGTH,
            max_filter_depth: MAX_FILTER_DEPTH,
            require_https: false,
        }
    }
}

impl ScimServerConfig {
    /// Check the configuration before a server is built from it.
    pub fn validate(&self) -> BuildResult<()> {
        if self.base_url.is_empty() {
            return Err(invalid("Base URL cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(invalid("Base URL must start with http:// or https://"));
        }
        if self.require_https && !self.base_url.starts_with("https://") {
            return Err(invalid("Base URL must use https:// when require_https is set"));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(invalid("Page sizes must be positive"));
        }
        if self.default_page_size > self.max_page_size {
            return Err(invalid("Default page size cannot exceed the maximum page size"));
        }
        if self.max_filter_length == 0 || self.max_filter_depth == 0 {
            return Err(invalid("Filter limits must be positive"));
        }
        Ok(())
    }

    pub fn filter_limits(&self) -> FilterLimits {
        FilterLimits {
            max_length: self.max_filter_length,
            max_depth: self.max_filter_depth,
        }
    }

    pub fn location_base(&self) -> LocationBase {
        LocationBase::new(self.base_url.clone(), self.scim_version.clone())
    }

    /// The per-request settings handed to the provider.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            location: self.location_base(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            filter_limits: self.filter_limits(),
        }
    }
}

fn invalid(message: &str) -> BuildError {
    BuildError::InvalidConfiguration {
        message: message.to_string(),
    }
}
