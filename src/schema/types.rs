//! Core schema type definitions for SCIM resources.
//!
//! This module contains the attribute metadata that the registry turns into
//! enforceable constraints: value kind, multiplicity, mutability, uniqueness,
//! canonical values and nested sub-attributes, as specified in RFC 7643.
//!
//! Every characteristic has a serde default so schema JSON only needs to spell
//! out what differs from a plain, optional, read-write string attribute.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SCIM schema definition.
///
/// Represents a complete schema with its metadata and attribute definitions,
/// as served from the `/Schemas` discovery endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URI)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// List of attribute definitions
    pub attributes: Vec<AttributeDefinition>,
}

/// Definition of a SCIM attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    /// Value kind of the attribute
    #[serde(rename = "type", default)]
    pub data_type: AttributeType,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default)]
    pub required: bool,
    /// Whether string comparison is case-sensitive
    #[serde(default)]
    pub case_exact: bool,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub uniqueness: Uniqueness,
    #[serde(default)]
    pub returned: Returned,
    /// Allowed values, compared case-insensitively
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub canonical_values: Vec<String>,
    /// Sub-attributes for complex types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<AttributeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            uniqueness: Uniqueness::None,
            returned: Returned::Default,
            canonical_values: Vec::new(),
            sub_attributes: Vec::new(),
            description: None,
        }
    }
}

impl AttributeDefinition {
    /// Shorthand for a single-valued attribute of the given kind.
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Default::default()
        }
    }

    pub fn is_complex(&self) -> bool {
        self.data_type == AttributeType::Complex
    }

    /// Look up a sub-attribute by name, ignoring case.
    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.sub_attributes
            .iter()
            .find(|sub| sub.name.eq_ignore_ascii_case(name))
    }

    /// Whether this attribute may appear in a response body at all.
    pub fn is_returnable(&self) -> bool {
        self.mutability != Mutability::WriteOnly && self.returned != Returned::Never
    }

    /// Whether string values of this attribute match `candidate`, honoring `caseExact`.
    pub fn string_equals(&self, stored: &str, candidate: &str) -> bool {
        if self.case_exact {
            stored == candidate
        } else {
            stored.to_lowercase() == candidate.to_lowercase()
        }
    }
}

/// SCIM attribute data types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    #[default]
    String,
    Boolean,
    Decimal,
    Integer,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    /// URI reference
    Reference,
    /// Complex attribute with sub-attributes
    Complex,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Decimal => "decimal",
            AttributeType::Integer => "integer",
            AttributeType::DateTime => "dateTime",
            AttributeType::Binary => "binary",
            AttributeType::Reference => "reference",
            AttributeType::Complex => "complex",
        };
        f.write_str(name)
    }
}

/// Attribute mutability characteristics.
///
/// Defines whether and how an attribute can be modified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Managed by the server
    ReadOnly,
    #[default]
    ReadWrite,
    /// Set once, never modified
    Immutable,
    /// May be set but is never returned (passwords)
    WriteOnly,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutability::ReadOnly => "readOnly",
            Mutability::ReadWrite => "readWrite",
            Mutability::Immutable => "immutable",
            Mutability::WriteOnly => "writeOnly",
        };
        f.write_str(name)
    }
}

/// Attribute uniqueness constraints.
///
/// `PerType` is the RFC's `server` scope: unique among resources of one type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    #[default]
    None,
    #[serde(rename = "server", alias = "perType")]
    PerType,
    Global,
}

/// When an attribute is included in responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    /// Always returned, regardless of projection
    Always,
    /// Never returned
    Never,
    #[default]
    Default,
    /// Only when explicitly requested
    Request,
}
