//! # idm-auth
//!
//! Password encoding strategies for the identity stores.
//!
//! ## Strategies
//!
//! - [`Argon2PasswordEncoder`] - Argon2id, PHC string output (default)
//! - [`SaltedDigestEncoder`] - salted SHA-2 digest for stores migrated from
//!   digest-based credential databases
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idm_auth::Argon2PasswordEncoder;
//! use idm_store::PasswordEncoder;
//!
//! let encoder: Arc<dyn PasswordEncoder> = Arc::new(Argon2PasswordEncoder::with_defaults());
//! let encoded = encoder.encode("password123")?;
//! assert!(encoder.verify("password123", &encoded)?);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod digest;
pub mod password;

pub use digest::{DigestStrength, SaltedDigestEncoder};
pub use password::{Argon2PasswordEncoder, PasswordPolicy};
