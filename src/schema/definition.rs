//! Resource type definitions and the builders that produce them.
//!
//! A [`ResourceTypeDefinition`] binds a target shape (`User`, `Group`,
//! `User.emails`, ...) to its ordered attribute metadata. Definitions are
//! produced by [`TypeDefinitionBuilder`]s, each of which declares its target
//! shape explicitly; the registry resolves collisions and instantiates every
//! shape exactly once.

use super::embedded;
use super::registry::DefinitionContext;
use super::types::{AttributeDefinition, Schema};
use crate::error::{BuildError, BuildResult};
use serde_json::{Value, json};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Name of a native resource shape, e.g. `User` or the nested `User.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shape of a complex attribute nested under this one.
    pub fn nested(&self, attribute: &str) -> ShapeId {
        ShapeId(format!("{}.{}", self.0, attribute))
    }

    pub fn is_nested(&self) -> bool {
        self.0.contains('.')
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ShapeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShapeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ShapeId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Where a builder comes from. Custom definitions override built-in ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionOrigin {
    BuiltIn,
    Custom,
}

/// An extension schema attached to a resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaExtension {
    pub schema_id: String,
    pub shape: ShapeId,
    pub required: bool,
    /// Attributes of the extension schema, copied in at build time
    pub attributes: Vec<AttributeDefinition>,
}

/// Immutable description of one resource kind or nested complex type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTypeDefinition {
    pub shape: ShapeId,
    pub name: String,
    /// Schema URI; nested shapes carry their parent's URI
    pub schema_id: String,
    pub description: String,
    /// Endpoint such as `/Users`; `None` for extensions and nested shapes
    pub endpoint: Option<String>,
    pub attributes: Vec<AttributeDefinition>,
    pub extensions: Vec<SchemaExtension>,
}

/// An attribute path resolved against a definition.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAttribute<'a> {
    /// Extension schema URI, when the attribute lives in an extension block
    pub extension: Option<&'a str>,
    pub attribute: &'a AttributeDefinition,
    pub sub_attribute: Option<&'a AttributeDefinition>,
}

impl<'a> ResolvedAttribute<'a> {
    /// The innermost attribute the path names.
    pub fn leaf(&self) -> &'a AttributeDefinition {
        self.sub_attribute.unwrap_or(self.attribute)
    }
}

impl ResourceTypeDefinition {
    /// Look up a core attribute by name, ignoring case.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Look up an extension by schema URI, ignoring case.
    pub fn extension(&self, schema_id: &str) -> Option<&SchemaExtension> {
        self.extensions
            .iter()
            .find(|ext| ext.schema_id.eq_ignore_ascii_case(schema_id))
    }

    pub fn is_resource_type(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Every schema URI a resource of this type may carry.
    pub fn schema_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.schema_id.as_str())
            .chain(self.extensions.iter().map(|ext| ext.schema_id.as_str()))
    }

    /// Resolve `[schema:]attr[.sub]` against this definition.
    ///
    /// `schema` may name the core schema or one of the extensions. Returns
    /// `None` for any unknown segment.
    pub fn resolve(
        &self,
        schema: Option<&str>,
        attr: &str,
        sub_attr: Option<&str>,
    ) -> Option<ResolvedAttribute<'_>> {
        let (extension, attributes) = match schema {
            None => (None, self.attributes.as_slice()),
            Some(uri) if uri.eq_ignore_ascii_case(&self.schema_id) => {
                (None, self.attributes.as_slice())
            }
            Some(uri) => {
                let ext = self.extension(uri)?;
                (Some(ext.schema_id.as_str()), ext.attributes.as_slice())
            }
        };

        let attribute = attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(attr))?;
        let sub_attribute = match sub_attr {
            Some(sub) => Some(attribute.sub_attribute(sub)?),
            None => None,
        };

        Some(ResolvedAttribute {
            extension,
            attribute,
            sub_attribute,
        })
    }

    /// Attributes that carry a uniqueness constraint, other than `id`.
    pub fn unique_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter().filter(|attr| {
            attr.uniqueness != super::Uniqueness::None && !attr.name.eq_ignore_ascii_case("id")
        })
    }

    /// The schema document served from `/Schemas`.
    pub fn to_schema(&self) -> Schema {
        Schema {
            id: self.schema_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            attributes: self.attributes.clone(),
        }
    }

    /// The resource type document served from `/ResourceTypes`.
    pub fn to_resource_type_json(&self) -> Option<Value> {
        let endpoint = self.endpoint.as_ref()?;
        let extensions: Vec<Value> = self
            .extensions
            .iter()
            .map(|ext| json!({"schema": ext.schema_id, "required": ext.required}))
            .collect();
        Some(json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ResourceType"],
            "id": self.name,
            "name": self.name,
            "description": self.description,
            "endpoint": endpoint,
            "schema": self.schema_id,
            "schemaExtensions": extensions,
        }))
    }
}

/// Produces the definition for one target shape.
///
/// Builders declare their target shape directly. A builder whose
/// [`target`](Self::target) is `None` or empty is a configuration error
/// reported by the registry at startup.
pub trait TypeDefinitionBuilder: Send + Sync {
    /// Human-readable builder name for diagnostics.
    fn name(&self) -> &str;

    /// The shape this builder defines.
    fn target(&self) -> Option<ShapeId>;

    fn origin(&self) -> DefinitionOrigin {
        DefinitionOrigin::Custom
    }

    /// Instantiate the definition. May register nested shapes through `ctx`.
    fn build(&self, ctx: &mut DefinitionContext<'_>) -> BuildResult<ResourceTypeDefinition>;
}

/// Builder backed by a schema JSON document.
#[derive(Debug, Clone)]
pub struct SchemaJsonBuilder {
    shape: ShapeId,
    schema_json: Cow<'static, str>,
    endpoint: Option<String>,
    extensions: Vec<(ShapeId, bool)>,
    origin: DefinitionOrigin,
}

impl SchemaJsonBuilder {
    /// A resource type served at `endpoint`.
    pub fn resource(
        shape: impl Into<ShapeId>,
        schema_json: impl Into<Cow<'static, str>>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            shape: shape.into(),
            schema_json: schema_json.into(),
            endpoint: Some(endpoint.into()),
            extensions: Vec::new(),
            origin: DefinitionOrigin::Custom,
        }
    }

    /// An extension schema, attached to resource types via [`with_extension`](Self::with_extension).
    pub fn extension(shape: impl Into<ShapeId>, schema_json: impl Into<Cow<'static, str>>) -> Self {
        Self {
            shape: shape.into(),
            schema_json: schema_json.into(),
            endpoint: None,
            extensions: Vec::new(),
            origin: DefinitionOrigin::Custom,
        }
    }

    pub fn with_extension(mut self, shape: impl Into<ShapeId>, required: bool) -> Self {
        self.extensions.push((shape.into(), required));
        self
    }

    pub(crate) fn built_in(mut self) -> Self {
        self.origin = DefinitionOrigin::BuiltIn;
        self
    }

    fn parse_schema(&self) -> BuildResult<Schema> {
        serde_json::from_str(&self.schema_json).map_err(|e| BuildError::SchemaLoadError {
            schema_id: self.shape.to_string(),
            message: e.to_string(),
        })
    }
}

impl TypeDefinitionBuilder for SchemaJsonBuilder {
    fn name(&self) -> &str {
        self.shape.as_str()
    }

    fn target(&self) -> Option<ShapeId> {
        (!self.shape.is_empty()).then(|| self.shape.clone())
    }

    fn origin(&self) -> DefinitionOrigin {
        self.origin
    }

    fn build(&self, ctx: &mut DefinitionContext<'_>) -> BuildResult<ResourceTypeDefinition> {
        let schema = self.parse_schema()?;
        let attributes = register_complex_attributes(ctx, &self.shape, &schema.id, schema.attributes)?;

        let mut extensions = Vec::with_capacity(self.extensions.len());
        for (shape, required) in &self.extensions {
            ctx.require(shape)?;
            let ext = ctx
                .definition(shape)
                .ok_or_else(|| BuildError::UnknownShape {
                    shape: shape.to_string(),
                })?;
            extensions.push(SchemaExtension {
                schema_id: ext.schema_id.clone(),
                shape: shape.clone(),
                required: *required,
                attributes: ext.attributes.clone(),
            });
        }

        Ok(ResourceTypeDefinition {
            shape: self.shape.clone(),
            name: schema.name,
            schema_id: schema.id,
            description: schema.description,
            endpoint: self.endpoint.clone(),
            attributes,
            extensions,
        })
    }
}

/// Register a nested shape for every complex attribute and adopt the
/// sub-attributes of whichever definition ends up registered for it.
fn register_complex_attributes(
    ctx: &mut DefinitionContext<'_>,
    parent: &ShapeId,
    schema_id: &str,
    attributes: Vec<AttributeDefinition>,
) -> BuildResult<Vec<AttributeDefinition>> {
    let mut resolved = Vec::with_capacity(attributes.len());
    for mut attr in attributes {
        if attr.is_complex() {
            let shape = parent.nested(&attr.name);
            let defaults = attr.sub_attributes.clone();
            let name = attr.name.clone();
            ctx.register_nested(&shape, |ctx| {
                let sub_attributes = register_complex_attributes(ctx, &shape, schema_id, defaults)?;
                Ok(ResourceTypeDefinition {
                    shape: shape.clone(),
                    name,
                    schema_id: schema_id.to_string(),
                    description: String::new(),
                    endpoint: None,
                    attributes: sub_attributes,
                    extensions: Vec::new(),
                })
            })?;
            if let Some(nested) = ctx.definition(&shape) {
                attr.sub_attributes = nested.attributes.clone();
            }
        }
        resolved.push(attr);
    }
    Ok(resolved)
}

/// Shape names of the built-in definitions.
pub mod shapes {
    pub const USER: &str = "User";
    pub const GROUP: &str = "Group";
    pub const ENTERPRISE_USER: &str = "EnterpriseUser";
}

/// The engine's own definitions: User (with the enterprise extension) and Group.
pub fn builtin_builders() -> Vec<Box<dyn TypeDefinitionBuilder>> {
    vec![
        Box::new(
            SchemaJsonBuilder::resource(shapes::USER, embedded::core_user_schema(), "/Users")
                .with_extension(shapes::ENTERPRISE_USER, false)
                .built_in(),
        ),
        Box::new(
            SchemaJsonBuilder::resource(shapes::GROUP, embedded::core_group_schema(), "/Groups")
                .built_in(),
        ),
        Box::new(
            SchemaJsonBuilder::extension(
                shapes::ENTERPRISE_USER,
                embedded::enterprise_user_schema(),
            )
            .built_in(),
        ),
    ]
}
