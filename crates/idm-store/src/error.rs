//! Storage error types.

use thiserror::Error;

/// Errors that can occur during identity store operations.
///
/// Lookups never produce [`StorageError::NotFound`] on a miss; `get_*`
/// operations return `Ok(None)` instead. `NotFound` is reserved for
/// operations that need an existing entity to proceed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A referenced entity does not exist.
    #[error("Entity not found: {entity_type} '{key}'")]
    NotFound {
        /// Type of entity (e.g., "User", "Group").
        entity_type: &'static str,
        /// Entity key.
        key: String,
    },

    /// Duplicate entity (unique key already taken).
    #[error("Duplicate {entity_type}: {field} '{value}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Field that caused the conflict.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// An entity that belongs to another store was passed in.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backend connection error.
    #[error("Backend unavailable: {0}")]
    Connection(String),

    /// Backend query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Credential encoding error.
    #[error("Credential error: {0}")]
    Credential(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Creates a not found error for an entity key.
    #[must_use]
    pub fn not_found(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            key: key.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(
        entity_type: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }

    /// Creates a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Checks if this is a schema mismatch error.
    #[must_use]
    pub const fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch(_))
    }

    /// Checks if the backend could not be reached.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_error() {
        let err = StorageError::not_found("Group", "Administrators");

        assert!(err.is_not_found());
        assert!(!err.is_duplicate());
        assert!(err.to_string().contains("Administrators"));
    }

    #[test]
    fn duplicate_error() {
        let err = StorageError::duplicate("User", "key", "asaldhana");

        assert!(err.is_duplicate());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("asaldhana"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io.into();

        assert!(matches!(err, StorageError::Io(_)));
        assert!(!err.is_connection_error());
    }
}
