//! Password encoding using Argon2id.
//!
//! Produces PHC-formatted strings with a random salt per encoding.
//! Verification is constant-time.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use idm_store::{PasswordEncoder, StorageError, StorageResult};
use serde::{Deserialize, Serialize};

/// Argon2id cost configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        // OWASP recommended settings for Argon2id
        Self {
            memory_cost: 19 * 1024, // 19 MiB
            time_cost: 2,
            parallelism: 1,
            hash_length: 32,
        }
    }
}

impl PasswordPolicy {
    /// Creates a new password policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memory cost in KiB.
    #[must_use]
    pub const fn memory_cost(mut self, kib: u32) -> Self {
        self.memory_cost = kib;
        self
    }

    /// Sets the time cost (iterations).
    #[must_use]
    pub const fn time_cost(mut self, iterations: u32) -> Self {
        self.time_cost = iterations;
        self
    }

    /// Sets the parallelism factor.
    #[must_use]
    pub const fn parallelism(mut self, p: u32) -> Self {
        self.parallelism = p;
        self
    }

    /// Builds the Argon2 parameters.
    fn build_params(&self) -> Result<Params, argon2::Error> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(self.hash_length as usize),
        )
    }
}

/// Password encoder using Argon2id.
#[derive(Debug, Clone)]
pub struct Argon2PasswordEncoder {
    policy: PasswordPolicy,
}

impl Argon2PasswordEncoder {
    /// Creates a new encoder with the given policy.
    #[must_use]
    pub const fn new(policy: PasswordPolicy) -> Self {
        Self { policy }
    }

    /// Creates a new encoder with the default policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(PasswordPolicy::default())
    }
}

impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, password: &str) -> StorageResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let params = self
            .policy
            .build_params()
            .map_err(|e| StorageError::Credential(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StorageError::Credential(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, encoded: &str) -> StorageResult<bool> {
        let parsed =
            PasswordHash::new(encoded).map_err(|e| StorageError::Credential(e.to_string()))?;

        // Argon2::default() can verify any Argon2 variant
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(StorageError::Credential(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_encoder() -> Argon2PasswordEncoder {
        Argon2PasswordEncoder::new(PasswordPolicy::new().memory_cost(1024).time_cost(1))
    }

    #[test]
    fn encode_and_verify() {
        let encoder = fast_encoder();
        let encoded = encoder.encode("correct horse battery staple").unwrap();

        assert!(encoded.starts_with("$argon2id$"));
        assert!(encoder.verify("correct horse battery staple", &encoded).unwrap());
        assert!(!encoder.verify("wrong password", &encoded).unwrap());
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let encoder = fast_encoder();

        let first = encoder.encode("password1").unwrap();
        let second = encoder.encode("password1").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn garbage_encoding_is_an_error() {
        let encoder = fast_encoder();
        assert!(encoder.verify("password", "not-a-phc-string").is_err());
    }

    #[test]
    fn encoding_records_policy_params() {
        let encoded = fast_encoder().encode("password").unwrap();
        assert!(encoded.contains("$m=1024,t=1,p=1$"));
    }
}
