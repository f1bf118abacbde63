//! Credential encoding strategy.
//!
//! Stores never choose a hash algorithm. Backends that keep passwords as
//! attributes receive a [`PasswordEncoder`] from the caller and persist
//! only the opaque encoded string it returns.

use crate::error::StorageResult;

/// Attribute holding the encoded password.
pub const PASSWORD_ATTRIBUTE: &str = "userPassword";

/// Attribute holding the Base64 DER certificate.
pub const CERTIFICATE_ATTRIBUTE: &str = "userCertificate";

/// Encodes and verifies passwords.
pub trait PasswordEncoder: Send + Sync {
    /// Encodes a raw password for storage.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Credential` if encoding fails.
    fn encode(&self, password: &str) -> StorageResult<String>;

    /// Verifies a raw password against a stored encoding.
    ///
    /// Returns `Ok(false)` on mismatch. Errors are reserved for encodings
    /// that cannot be parsed at all.
    fn verify(&self, password: &str, encoded: &str) -> StorageResult<bool>;
}

/// Verifies `password` against the first stored value, if any.
///
/// ## Errors
///
/// Propagates errors from the encoder.
pub fn verify_stored(
    encoder: &dyn PasswordEncoder,
    stored: Option<&[String]>,
    password: &str,
) -> StorageResult<bool> {
    match stored.and_then(|values| values.first()) {
        Some(encoded) => encoder.verify(password, encoded),
        None => Ok(false),
    }
}
