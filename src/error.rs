//! Error types for SCIM engine operations.
//!
//! Every business or validation failure is a [`ScimError`] carried on the error
//! side of an [`Outcome`](crate::outcome::Outcome). Each variant knows the HTTP
//! status and RFC 7644 `scimType` it maps to, so the transport collaborator can
//! render an [`ErrorResponse`] without inspecting the variant itself.
//!
//! [`BuildError`] is deliberately separate: it is only produced while the schema
//! registry is being resolved at startup and prevents the server from starting.

use crate::filter::FilterParseError;
use crate::outcome::status;
use crate::resource::version::VersionConflict;
use crate::schema::Mutability;
use serde::{Deserialize, Serialize};

/// Schema URI of the SCIM error envelope.
pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Main error type for SCIM engine operations.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Resource data does not conform to its type definition
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A write touched a readOnly or immutable attribute
    #[error("Attribute '{attribute}' is {mutability} and cannot be modified")]
    Mutability {
        attribute: String,
        mutability: Mutability,
    },

    /// A uniqueness-scoped value is already taken
    #[error("{resource_type} with {attribute} '{value}' already exists")]
    Conflict {
        resource_type: String,
        attribute: String,
        value: String,
    },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// Malformed filter expression
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterParseError),

    /// Malformed PATCH or sort attribute path
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// PATCH path did not select any value
    #[error("No target matched path '{path}'")]
    NoTarget { path: String },

    /// Request body could not be interpreted
    #[error("Invalid syntax: {message}")]
    InvalidSyntax { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `If-Match` version did not match the stored version
    #[error("Precondition failed: {0}")]
    PreconditionFailed(#[from] VersionConflict),

    /// Unsupported resource type
    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    /// Errors raised outside the engine that carry their own status, if any
    #[error("{detail}")]
    Other {
        status: Option<u16>,
        scim_type: Option<ScimType>,
        detail: String,
    },

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Validation errors for schema compliance checking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required attribute is missing
    #[error("Required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    /// Attribute value doesn't match the declared kind
    #[error("Attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidDataType {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// Multi-valued attribute provided as single value
    #[error("Attribute '{attribute}' must be multi-valued (array)")]
    ExpectedMultiValue { attribute: String },

    /// Single-valued attribute provided as array
    #[error("Attribute '{attribute}' must be single-valued (not array)")]
    ExpectedSingleValue { attribute: String },

    /// Invalid value for attribute with canonical values
    #[error("Attribute '{attribute}' has invalid value '{value}', allowed values: {allowed:?}")]
    InvalidCanonicalValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Complex attribute missing a required sub-attribute
    #[error("Complex attribute '{attribute}' missing required sub-attribute '{sub_attribute}'")]
    MissingSubAttribute {
        attribute: String,
        sub_attribute: String,
    },

    /// Unknown attribute in resource
    #[error("Unknown attribute '{attribute}' in schema '{schema_id}'")]
    UnknownAttribute {
        attribute: String,
        schema_id: String,
    },

    /// Multiple primary values in multi-valued attribute
    #[error("Attribute '{attribute}' cannot have multiple primary values")]
    MultiplePrimaryValues { attribute: String },

    /// Missing schemas attribute
    #[error("Missing required 'schemas' attribute")]
    MissingSchemas,

    /// Core schema absent from the schemas list
    #[error("'schemas' must contain the base schema '{schema_id}'")]
    MissingBaseSchema { schema_id: String },

    /// Unknown schema URI
    #[error("Unknown schema URI: {uri}")]
    UnknownSchemaUri { uri: String },

    /// Invalid datetime format
    #[error("Attribute '{attribute}' has invalid datetime format: {value}")]
    InvalidDateTimeFormat { attribute: String, value: String },

    /// Invalid binary data
    #[error("Attribute '{attribute}' has invalid binary data")]
    InvalidBinaryData { attribute: String },

    /// General validation error with custom message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

/// Errors that can occur while resolving the type-definition registry.
///
/// These are configuration errors: they are detected once at startup and
/// prevent the server from being built at all.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Repository was not configured
    #[error("Resource repository is required but not provided")]
    MissingRepository,

    /// A builder does not declare which shape it defines
    #[error("Type definition builder '{builder}' does not declare a target shape")]
    UnresolvedTargetShape { builder: String },

    /// A definition references a shape nobody can build
    #[error("No type definition is registered for shape '{shape}'")]
    UnknownShape { shape: String },

    /// Embedded or custom schema text could not be parsed
    #[error("Failed to load schema '{schema_id}': {message}")]
    SchemaLoadError { schema_id: String, message: String },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Machine-readable error kinds from RFC 7644 §3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimType {
    InvalidFilter,
    TooMany,
    Uniqueness,
    Mutability,
    InvalidSyntax,
    InvalidPath,
    NoTarget,
    InvalidValue,
    InvalidVers,
    Sensitive,
}

impl ScimError {
    /// Create a resource not found error
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a mutability violation for the given attribute path
    pub fn mutability(attribute: impl Into<String>, mutability: Mutability) -> Self {
        Self::Mutability {
            attribute: attribute.into(),
            mutability,
        }
    }

    /// Create a uniqueness conflict
    pub fn conflict(
        resource_type: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            resource_type: resource_type.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a no-target error
    pub fn no_target(path: impl Into<String>) -> Self {
        Self::NoTarget { path: path.into() }
    }

    /// Create an invalid syntax error
    pub fn invalid_syntax(message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            message: message.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The HTTP status this error carries, if it carries one.
    ///
    /// Only [`ScimError::Other`] may lack a status; callers fall back to
    /// `400 Bad Request` in that case.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScimError::Validation(_)
            | ScimError::Mutability { .. }
            | ScimError::InvalidFilter(_)
            | ScimError::InvalidPath { .. }
            | ScimError::NoTarget { .. }
            | ScimError::InvalidSyntax { .. }
            | ScimError::Json(_) => Some(status::BAD_REQUEST),
            ScimError::Conflict { .. } => Some(status::CONFLICT),
            ScimError::ResourceNotFound { .. } | ScimError::UnsupportedResourceType(_) => {
                Some(status::NOT_FOUND)
            }
            ScimError::PreconditionFailed(_) => Some(status::PRECONDITION_FAILED),
            ScimError::Other { status, .. } => *status,
            ScimError::Internal { .. } => Some(status::INTERNAL_SERVER_ERROR),
        }
    }

    /// The RFC 7644 `scimType` for this error.
    pub fn scim_type(&self) -> Option<ScimType> {
        match self {
            ScimError::Validation(ve) => Some(ve.scim_type()),
            ScimError::Mutability { .. } => Some(ScimType::Mutability),
            ScimError::Conflict { .. } => Some(ScimType::Uniqueness),
            ScimError::InvalidFilter(e) if e.is_too_large() => Some(ScimType::TooMany),
            ScimError::InvalidFilter(_) => Some(ScimType::InvalidFilter),
            ScimError::InvalidPath { .. } => Some(ScimType::InvalidPath),
            ScimError::NoTarget { .. } => Some(ScimType::NoTarget),
            ScimError::InvalidSyntax { .. } | ScimError::Json(_) => Some(ScimType::InvalidSyntax),
            ScimError::PreconditionFailed(_) => Some(ScimType::InvalidVers),
            ScimError::Other { scim_type, .. } => *scim_type,
            ScimError::ResourceNotFound { .. }
            | ScimError::UnsupportedResourceType(_)
            | ScimError::Internal { .. } => None,
        }
    }

    /// Build the SCIM error envelope for this error.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(
            self.status().unwrap_or(status::BAD_REQUEST),
            self.scim_type(),
            self.to_string(),
        )
    }
}

impl ValidationError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidDataType {
            attribute: attribute.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a custom validation error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    fn scim_type(&self) -> ScimType {
        match self {
            ValidationError::MissingSchemas
            | ValidationError::MissingBaseSchema { .. }
            | ValidationError::UnknownSchemaUri { .. }
            | ValidationError::UnknownAttribute { .. } => ScimType::InvalidSyntax,
            _ => ScimType::InvalidValue,
        }
    }
}

/// SCIM error envelope per RFC 7644 §3.12.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub schemas: Vec<String>,
    /// HTTP status code rendered as a string, as the RFC requires
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimType>,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(status: u16, scim_type: Option<ScimType>, detail: impl Into<String>) -> Self {
        Self {
            schemas: vec![ERROR_SCHEMA.to_string()],
            status: status.to_string(),
            scim_type,
            detail: detail.into(),
        }
    }

    /// The numeric status, falling back to 400 when the string is not numeric.
    pub fn status_code(&self) -> u16 {
        self.status.parse().unwrap_or(status::BAD_REQUEST)
    }
}

impl From<&ScimError> for ErrorResponse {
    fn from(error: &ScimError) -> Self {
        error.to_response()
    }
}

// Result type aliases for convenience
pub type ScimResult<T> = Result<T, ScimError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
