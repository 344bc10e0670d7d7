//! Type-definition registry built once at startup.
//!
//! [`TypeDefinitionRegistry::resolve`] takes the candidate builders, keys each
//! by its declared target shape, settles collisions (custom beats built-in,
//! otherwise the first registration wins) and then instantiates every shape
//! exactly once. Instantiation is reentrant: a builder may require other shapes
//! or register nested complex shapes while it is being built.
//!
//! The resulting registry is immutable and shared by reference for the life of
//! the server.

use super::definition::{
    DefinitionOrigin, ResourceTypeDefinition, ShapeId, TypeDefinitionBuilder, builtin_builders,
};
use super::types::Schema;
use crate::error::{BuildError, BuildResult, ScimError, ScimResult};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Registry of resolved resource type definitions, keyed by target shape.
#[derive(Debug, Clone)]
pub struct TypeDefinitionRegistry {
    definitions: HashMap<ShapeId, ResourceTypeDefinition>,
    /// Instantiation order, used for stable discovery listings
    order: Vec<ShapeId>,
}

impl TypeDefinitionRegistry {
    /// Registry containing only the built-in User, Group and enterprise definitions.
    pub fn builtin() -> BuildResult<Self> {
        Self::resolve(builtin_builders())
    }

    /// Resolve a set of candidate builders into a registry.
    ///
    /// # Errors
    ///
    /// * [`BuildError::UnresolvedTargetShape`] when a builder declares no target
    /// * [`BuildError::UnknownShape`] when a builder requires a shape nobody builds
    /// * [`BuildError::SchemaLoadError`] when a schema document is malformed
    pub fn resolve(candidates: Vec<Box<dyn TypeDefinitionBuilder>>) -> BuildResult<Self> {
        let mut table: HashMap<ShapeId, Box<dyn TypeDefinitionBuilder>> = HashMap::new();
        let mut order: Vec<ShapeId> = Vec::new();

        for candidate in candidates {
            let shape = candidate
                .target()
                .filter(|shape| !shape.is_empty())
                .ok_or_else(|| BuildError::UnresolvedTargetShape {
                    builder: candidate.name().to_string(),
                })?;

            match table.get(&shape) {
                None => {
                    order.push(shape.clone());
                    table.insert(shape, candidate);
                }
                Some(incumbent)
                    if incumbent.origin() == DefinitionOrigin::BuiltIn
                        && candidate.origin() == DefinitionOrigin::Custom =>
                {
                    info!(
                        "Custom definition '{}' overrides built-in definition for shape '{}'",
                        candidate.name(),
                        shape
                    );
                    table.insert(shape, candidate);
                }
                Some(incumbent) => {
                    warn!(
                        "Ignoring definition '{}' for shape '{}': '{}' is already registered",
                        candidate.name(),
                        shape,
                        incumbent.name()
                    );
                }
            }
        }

        let mut ctx = DefinitionContext::new(&table);
        for shape in &order {
            ctx.require(shape)?;
        }

        let registry = ctx.finish();
        debug!(
            "Type definition registry resolved with {} shapes",
            registry.definitions.len()
        );
        Ok(registry)
    }

    /// Definition registered for a target shape.
    pub fn definition(&self, shape: &str) -> Option<&ResourceTypeDefinition> {
        self.definitions.get(shape)
    }

    /// Definition for a shape, or a not-found error for request-time lookups.
    pub fn get_definition(&self, shape: &str) -> ScimResult<&ResourceTypeDefinition> {
        self.definition(shape)
            .ok_or_else(|| ScimError::UnsupportedResourceType(shape.to_string()))
    }

    /// Top-level definition whose schema URI matches, ignoring case.
    pub fn definition_by_schema(&self, schema_id: &str) -> Option<&ResourceTypeDefinition> {
        self.top_level()
            .find(|def| def.schema_id.eq_ignore_ascii_case(schema_id))
    }

    /// Resource type by its name (`User`) or endpoint (`/Users`, `Users`).
    pub fn resource_type(&self, name_or_endpoint: &str) -> Option<&ResourceTypeDefinition> {
        let trimmed = name_or_endpoint.trim_start_matches('/');
        self.resource_types().find(|def| {
            def.name.eq_ignore_ascii_case(trimmed)
                || def
                    .endpoint
                    .as_deref()
                    .is_some_and(|ep| ep.trim_start_matches('/').eq_ignore_ascii_case(trimmed))
        })
    }

    /// Definitions that are served from an endpoint.
    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceTypeDefinition> {
        self.top_level().filter(|def| def.is_resource_type())
    }

    /// Schema documents for every top-level definition, in registration order.
    pub fn schemas(&self) -> Vec<Schema> {
        self.top_level().map(ResourceTypeDefinition::to_schema).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn top_level(&self) -> impl Iterator<Item = &ResourceTypeDefinition> {
        self.order
            .iter()
            .filter(|shape| !shape.is_nested())
            .filter_map(|shape| self.definitions.get(shape))
    }
}

/// Mutable state threaded through builders while the registry is instantiated.
pub struct DefinitionContext<'a> {
    candidates: &'a HashMap<ShapeId, Box<dyn TypeDefinitionBuilder>>,
    definitions: HashMap<ShapeId, ResourceTypeDefinition>,
    order: Vec<ShapeId>,
    in_progress: HashSet<ShapeId>,
}

impl<'a> DefinitionContext<'a> {
    fn new(candidates: &'a HashMap<ShapeId, Box<dyn TypeDefinitionBuilder>>) -> Self {
        Self {
            candidates,
            definitions: HashMap::new(),
            order: Vec::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Whether a shape is already instantiated or currently being built.
    pub fn contains(&self, shape: &ShapeId) -> bool {
        self.definitions.contains_key(shape) || self.in_progress.contains(shape)
    }

    /// An already instantiated definition.
    pub fn definition(&self, shape: &ShapeId) -> Option<&ResourceTypeDefinition> {
        self.definitions.get(shape)
    }

    /// Instantiate the registered builder for `shape` unless already done.
    pub fn require(&mut self, shape: &ShapeId) -> BuildResult<()> {
        if self.contains(shape) {
            return Ok(());
        }
        let candidates = self.candidates;
        let builder = candidates
            .get(shape)
            .ok_or_else(|| BuildError::UnknownShape {
                shape: shape.to_string(),
            })?;
        self.instantiate(shape, |ctx| builder.build(ctx))
    }

    /// Register a nested shape, building it with `build` unless a candidate
    /// builder targets that shape explicitly or it already exists.
    pub fn register_nested<F>(&mut self, shape: &ShapeId, build: F) -> BuildResult<()>
    where
        F: FnOnce(&mut DefinitionContext<'a>) -> BuildResult<ResourceTypeDefinition>,
    {
        if self.contains(shape) {
            debug!("Shape '{}' already registered, skipping", shape);
            return Ok(());
        }
        if self.candidates.contains_key(shape) {
            return self.require(shape);
        }
        self.instantiate(shape, build)
    }

    fn instantiate<F>(&mut self, shape: &ShapeId, build: F) -> BuildResult<()>
    where
        F: FnOnce(&mut DefinitionContext<'a>) -> BuildResult<ResourceTypeDefinition>,
    {
        self.in_progress.insert(shape.clone());
        // Reserve the slot so parents list before the shapes they pull in.
        let slot = self.order.len();
        self.order.push(shape.clone());
        let built = build(self);
        self.in_progress.remove(shape);

        let mut definition = match built {
            Ok(definition) => definition,
            Err(e) => {
                self.order.remove(slot);
                return Err(e);
            }
        };
        definition.shape = shape.clone();
        debug!(
            "Instantiated definition for shape '{}' ({} attributes)",
            shape,
            definition.attributes.len()
        );
        self.definitions.insert(shape.clone(), definition);
        Ok(())
    }

    fn finish(self) -> TypeDefinitionRegistry {
        TypeDefinitionRegistry {
            definitions: self.definitions,
            order: self.order,
        }
    }
}
