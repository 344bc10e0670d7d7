//! SCIM 2.0 protocol engine for Rust.
//!
//! Implements the protocol rules that sit between a transport and a store:
//! resource type definitions, the filter language, PATCH semantics,
//! content-derived versions and list queries. The engine never installs a
//! logger, never opens a socket and never owns storage; those are
//! collaborators.
//!
//! # Core Components
//!
//! - [`schema::TypeDefinitionRegistry`] - resource type definitions resolved once at startup
//! - [`filter::CompiledFilter`] - parsed filter expressions evaluated against resources
//! - [`patch::PatchEngine`] - atomic application of PATCH operations
//! - [`resource::VersionCalculator`] - content fingerprints used as ETags
//! - [`Outcome`] - success-or-error composition for request workflows
//! - [`query::QueryPipeline`] - filter, sort and paginate
//! - [`storage::ResourceRepository`] - the storage contract, with an in-memory implementation
//! - [`ScimServer`] - request dispatch over all of the above
//!
//! # Quick Start
//!
//! ```rust
//! use scim_engine::{ScimRequest, ScimServer};
//! use scim_engine::outcome::Method;
//! use scim_engine::storage::InMemoryRepository;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = ScimServer::builder(InMemoryRepository::new())
//!     .with_base_url("https://scim.example.com")
//!     .build()?;
//!
//! let created = server
//!     .handle(ScimRequest::new(Method::Post, "/Users").with_body(json!({
//!         "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!         "userName": "bjensen"
//!     })))
//!     .await;
//! assert_eq!(created.status, 201);
//!
//! let listed = server
//!     .handle(ScimRequest::new(Method::Get, "/Users").with_query("filter", "userName sw \"b\""))
//!     .await;
//! assert_eq!(listed.body.unwrap()["totalResults"], 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod outcome;
pub mod patch;
pub mod providers;
pub mod query;
pub mod resource;
pub mod schema;
pub mod scim_server;
pub mod storage;

// Re-export commonly used types for convenience
pub use error::{BuildError, BuildResult, ScimError, ScimResult, ValidationError};
pub use outcome::{Method, Outcome, TransportResponse};
pub use providers::StandardResourceProvider;
pub use resource::{ListQuery, Meta, RequestContext, Resource, SortOrder};
pub use schema::{ResourceTypeDefinition, TypeDefinitionRegistry};
pub use scim_server::{ScimRequest, ScimServer, ScimServerBuilder, ScimServerConfig};
