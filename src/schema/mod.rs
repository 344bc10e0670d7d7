//! Schema definitions, the type-definition registry and validation.
//!
//! This module implements the RFC 7643 schema model and turns it into
//! enforceable metadata for every resource type the engine serves.
//!
//! # Key Types
//!
//! - [`AttributeDefinition`] - Individual attribute specifications and constraints
//! - [`ResourceTypeDefinition`] - Ordered attribute metadata for one target shape
//! - [`TypeDefinitionBuilder`] - Produces the definition for a declared shape
//! - [`TypeDefinitionRegistry`] - Resolved, immutable set of definitions
//!
//! # Examples
//!
//! ```rust
//! use scim_engine::schema::TypeDefinitionRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = TypeDefinitionRegistry::builtin()?;
//! let users = registry.definition("User").unwrap();
//! assert_eq!(users.endpoint.as_deref(), Some("/Users"));
//! assert!(registry.definition("User.emails").is_some());
//! # Ok(())
//! # }
//! ```

pub mod definition;
pub mod embedded;
pub mod registry;
pub mod types;
pub mod validation;


pub use definition::{
    DefinitionOrigin, ResolvedAttribute, ResourceTypeDefinition, SchemaExtension,
    SchemaJsonBuilder, ShapeId, TypeDefinitionBuilder, builtin_builders, shapes,
};
pub use registry::{DefinitionContext, TypeDefinitionRegistry};
pub use types::{AttributeDefinition, AttributeType, Mutability, Returned, Schema, Uniqueness};
