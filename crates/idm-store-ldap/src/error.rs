//! LDAP-specific error types.
//!
//! ## Security Note
//!
//! Error messages must not leak bind credentials or user secrets.

use idm_store::StorageError;
use thiserror::Error;

/// LDAP result code: no such attribute.
pub const RC_NO_SUCH_ATTRIBUTE: u32 = 16;
/// LDAP result code: undefined attribute type.
pub const RC_UNDEFINED_ATTRIBUTE_TYPE: u32 = 17;
/// LDAP result code: attribute or value exists.
pub const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
/// LDAP result code: invalid attribute syntax.
pub const RC_INVALID_ATTRIBUTE_SYNTAX: u32 = 21;
/// LDAP result code: no such object.
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalid credentials.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: object class violation.
pub const RC_OBJECT_CLASS_VIOLATION: u32 = 65;
/// LDAP result code: entry already exists.
pub const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

/// LDAP store errors.
#[derive(Debug, Error)]
pub enum LdapStoreError {
    /// Invalid configuration.
    #[error("LDAP configuration error: {0}")]
    Configuration(String),

    /// Connection failed.
    #[error("LDAP connection failed: {0}")]
    Connection(String),

    /// Service account bind failed.
    #[error("LDAP bind failed: {0}")]
    Bind(String),

    /// The target entry does not exist.
    #[error("No such entry: {0}")]
    NoSuchObject(String),

    /// An entry with the same DN exists.
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// The attribute (or value) to delete is not present.
    #[error("No such attribute on {0}")]
    NoSuchAttribute(String),

    /// The value to add is already present.
    #[error("Attribute value already present on {0}")]
    ValueExists(String),

    /// The directory schema rejected the change.
    #[error("Schema violation on {dn}: {message}")]
    SchemaViolation {
        /// Target DN.
        dn: String,
        /// Server diagnostic.
        message: String,
    },

    /// Any other non-success result code.
    #[error("LDAP operation on {dn} failed with code {code}: {message}")]
    Operation {
        /// Target DN.
        dn: String,
        /// LDAP result code.
        code: u32,
        /// Server diagnostic.
        message: String,
    },

    /// A custom-attribute document could not be (de)serialized.
    #[error("Custom attribute document error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying ldap3 error.
    #[error("LDAP error: {0}")]
    Ldap3(#[from] ldap3::LdapError),
}

impl LdapStoreError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Maps a non-success result code for an operation on `dn`.
    #[must_use]
    pub fn from_result_code(dn: &str, code: u32, message: impl Into<String>) -> Self {
        let dn = dn.to_string();
        match code {
            RC_NO_SUCH_ATTRIBUTE => Self::NoSuchAttribute(dn),
            RC_ATTRIBUTE_OR_VALUE_EXISTS => Self::ValueExists(dn),
            RC_NO_SUCH_OBJECT => Self::NoSuchObject(dn),
            RC_ENTRY_ALREADY_EXISTS => Self::AlreadyExists(dn),
            RC_UNDEFINED_ATTRIBUTE_TYPE | RC_INVALID_ATTRIBUTE_SYNTAX | RC_OBJECT_CLASS_VIOLATION => {
                Self::SchemaViolation {
                    dn,
                    message: message.into(),
                }
            }
            code => Self::Operation {
                dn,
                code,
                message: message.into(),
            },
        }
    }

    /// Checks if the target entry was missing.
    #[must_use]
    pub const fn is_no_such_object(&self) -> bool {
        matches!(self, Self::NoSuchObject(_))
    }

    /// Checks if the target entry already existed.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Checks if the directory schema rejected the change.
    #[must_use]
    pub const fn is_schema_violation(&self) -> bool {
        matches!(self, Self::SchemaViolation { .. })
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Bind(_) | Self::Ldap3(_))
    }
}

/// Result type for LDAP store operations.
pub type LdapStoreResult<T> = Result<T, LdapStoreError>;

impl From<LdapStoreError> for StorageError {
    fn from(err: LdapStoreError) -> Self {
        match err {
            LdapStoreError::Configuration(msg) => Self::InvalidData(msg),
            LdapStoreError::Connection(msg) | LdapStoreError::Bind(msg) => Self::Connection(msg),
            LdapStoreError::NoSuchObject(dn) => Self::not_found("Entry", dn),
            LdapStoreError::AlreadyExists(dn) => Self::duplicate("Entry", "dn", dn),
            LdapStoreError::SchemaViolation { .. } => Self::SchemaMismatch(err.to_string()),
            LdapStoreError::NoSuchAttribute(_)
            | LdapStoreError::ValueExists(_)
            | LdapStoreError::Operation { .. } => Self::Query(err.to_string()),
            LdapStoreError::Serialization(e) => Self::Serialization(e.to_string()),
            LdapStoreError::Ldap3(e) => Self::Connection(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_map_to_variants() {
        assert!(LdapStoreError::from_result_code("cn=x", 32, "").is_no_such_object());
        assert!(LdapStoreError::from_result_code("cn=x", 68, "").is_already_exists());
        assert!(LdapStoreError::from_result_code("cn=x", 17, "undefined").is_schema_violation());
        assert!(LdapStoreError::from_result_code("cn=x", 65, "").is_schema_violation());
        assert!(matches!(
            LdapStoreError::from_result_code("cn=x", 50, "denied"),
            LdapStoreError::Operation { code: 50, .. }
        ));
    }

    #[test]
    fn storage_error_conversion() {
        let err: StorageError = LdapStoreError::NoSuchObject("uid=a,ou=People".into()).into();
        assert!(err.is_not_found());

        let err: StorageError = LdapStoreError::connection("refused").into();
        assert!(err.is_connection_error());

        let err: StorageError = LdapStoreError::from_result_code("cn=x", 17, "").into();
        assert!(err.is_schema_mismatch());
    }
}
