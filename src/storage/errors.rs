//! Storage-specific error types.
//!
//! These describe what went wrong in the store. Conversion into
//! [`ScimError`] keeps not-found and uniqueness failures distinguishable;
//! everything else surfaces as an internal error.

use crate::error::ScimError;
use crate::resource::VersionConflict;

/// Errors that can occur during repository operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// The requested resource was not found.
    #[error("Resource not found: {resource_type}/{id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// A resource with this id is already stored.
    #[error("Resource already exists: {resource_type}/{id}")]
    ResourceAlreadyExists { resource_type: String, id: String },

    /// A uniqueness-scoped value is held by another resource.
    #[error("{resource_type} with {attribute} '{value}' already exists")]
    UniqueViolation {
        resource_type: String,
        attribute: String,
        value: String,
    },

    /// The stored version moved away from the one the write expected.
    #[error("Version conflict: {0}")]
    VersionMismatch(VersionConflict),

    /// The resource cannot be stored as given.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic internal storage error.
    #[error("Internal storage error: {message}")]
    Internal { message: String },
}

impl StorageError {
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

impl From<StorageError> for ScimError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::ResourceNotFound { resource_type, id } => {
                ScimError::resource_not_found(resource_type, id)
            }
            StorageError::UniqueViolation {
                resource_type,
                attribute,
                value,
            } => ScimError::conflict(resource_type, attribute, value),
            StorageError::ResourceAlreadyExists { resource_type, id } => {
                ScimError::conflict(resource_type, "id", id)
            }
            StorageError::VersionMismatch(conflict) => ScimError::PreconditionFailed(conflict),
            StorageError::InvalidData { message } => ScimError::invalid_syntax(message),
            StorageError::Internal { message } => ScimError::internal(message),
        }
    }
}
