//! SCIM filter language: expression tree, parser and evaluator.
//!
//! A filter string is parsed once into a [`Filter`] tree and can then be
//! evaluated against any number of resources. Evaluation is schema-aware:
//! literals are coerced to the attribute's declared kind and string
//! comparisons honor the attribute's `caseExact` flag.
//!
//! ```rust
//! use scim_engine::filter::CompiledFilter;
//! use scim_engine::schema::TypeDefinitionRegistry;
//! use scim_engine::Resource;
//! use serde_json::json;
//!
//! let registry = TypeDefinitionRegistry::builtin().unwrap();
//! let users = registry.definition("User").unwrap();
//! let filter = CompiledFilter::compile(r#"userName eq "BJENSEN""#).unwrap();
//!
//! let bjensen = Resource::from_json("User", json!({"userName": "bjensen"})).unwrap();
//! assert!(filter.matches(&bjensen, users));
//! ```

mod evaluate;
mod parser;

pub use evaluate::{CompiledFilter, evaluate, matches_entry};
pub(crate) use evaluate::{attribute_values, compare_stored};
pub use parser::{
    FilterLimits, MAX_FILTER_DEPTH, MAX_FILTER_LENGTH, parse_attr_path, parse_filter,
    parse_filter_with,
};

use std::fmt;

/// A parsed SCIM filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Attribute comparison (`userName eq "john"`)
    Compare {
        attr: AttrPath,
        op: CompareOp,
        value: FilterValue,
    },
    /// Attribute presence (`title pr`)
    Present { attr: AttrPath },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { attr, op, value } => write!(f, "{} {} {}", attr, op, value),
            Filter::Present { attr } => write!(f, "{} pr", attr),
            Filter::And(left, right) => write!(f, "({} and {})", left, right),
            Filter::Or(left, right) => write!(f, "({} or {})", left, right),
            Filter::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

/// An attribute path: optional schema URI, attribute, value filter and sub-attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrPath {
    /// Schema URI prefix (`urn:...:enterprise:2.0:User`), when qualified
    pub schema: Option<String>,
    pub attr: String,
    pub sub_attr: Option<String>,
    /// Entry selector for multi-valued attributes (`emails[type eq "work"]`)
    pub value_filter: Option<Box<Filter>>,
}

impl AttrPath {
    pub fn simple(attr: impl Into<String>) -> Self {
        Self {
            schema: None,
            attr: attr.into(),
            sub_attr: None,
            value_filter: None,
        }
    }

    pub fn nested(attr: impl Into<String>, sub_attr: impl Into<String>) -> Self {
        Self {
            sub_attr: Some(sub_attr.into()),
            ..Self::simple(attr)
        }
    }

    /// Equality criteria (`sub eq "literal"`) in the value filter, joined by `and`.
    ///
    /// Used to seed a new multi-valued entry when a PATCH `add` finds no match.
    pub fn equality_criteria(&self) -> Vec<(&str, &FilterValue)> {
        fn collect<'f>(filter: &'f Filter, out: &mut Vec<(&'f str, &'f FilterValue)>) {
            match filter {
                Filter::Compare {
                    attr,
                    op: CompareOp::Eq,
                    value,
                } if attr.sub_attr.is_none() && attr.value_filter.is_none() => {
                    out.push((attr.attr.as_str(), value));
                }
                Filter::And(left, right) => {
                    collect(left, out);
                    collect(right, out);
                }
                _ => {}
            }
        }
        let mut criteria = Vec::new();
        if let Some(filter) = &self.value_filter {
            collect(filter, &mut criteria);
        }
        criteria
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}:", schema)?;
        }
        f.write_str(&self.attr)?;
        if let Some(filter) = &self.value_filter {
            write!(f, "[{}]", filter)?;
        }
        if let Some(sub) = &self.sub_attr {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// Comparison operators per RFC 7644.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Parse an operator, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "ew" => Some(CompareOp::Ew),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Ew => "ew",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        };
        f.write_str(s)
    }
}

/// Literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Bool(bool),
    Number(f64),
    Null,
}

impl FilterValue {
    /// The literal as JSON, used when seeding PATCH entries.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FilterValue::String(s) => serde_json::Value::String(s.clone()),
            FilterValue::Bool(b) => serde_json::Value::Bool(*b),
            FilterValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FilterValue::Null => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

/// Structural error in a filter or attribute path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct FilterParseError {
    pub message: String,
    /// Byte offset into the input
    pub position: usize,
    limit_exceeded: bool,
}

impl FilterParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            limit_exceeded: false,
        }
    }

    pub(crate) fn limit(message: impl Into<String>, position: usize) -> Self {
        Self {
            limit_exceeded: true,
            ..Self::new(message, position)
        }
    }

    /// Whether the input was rejected for exceeding a length or depth limit.
    pub fn is_too_large(&self) -> bool {
        self.limit_exceeded
    }
}
