//! Resource providers: the request workflows on top of a repository.
//!
//! * [`StandardResourceProvider`] - create, get, replace, patch, delete and
//!   search over any [`ResourceRepository`](crate::storage::ResourceRepository)
//! * [`helpers`] - precondition, mutability and response metadata steps the
//!   workflows are built from

pub mod helpers;
pub mod standard;

pub use helpers::LocationBase;
pub use standard::StandardResourceProvider;

use crate::filter::FilterLimits;

/// Tunables a provider applies to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base for `meta.location` and `$ref` values
    pub location: LocationBase,
    /// Page size when a query has no `count`
    pub default_page_size: usize,
    /// Upper bound for `count`
    pub max_page_size: usize,
    pub filter_limits: FilterLimits,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            location: LocationBase::new("https://localhost", "v2"),
            default_page_size: 100,
            max_page_size: 1000,
            filter_limits: FilterLimits::default(),
        }
    }
}

impl ProviderSettings {
    pub fn with_location(
        mut self,
        base_url: impl Into<String>,
        scim_version: impl Into<String>,
    ) -> Self {
        self.location = LocationBase::new(base_url, scim_version);
        self
    }
}
