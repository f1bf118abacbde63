//! # idm-store-file
//!
//! File-backed identity store.
//!
//! Users, roles, groups and memberships each live in their own in-memory
//! collection mirrored to a JSON file in the working directory. Every
//! mutation rewrites the whole file of the collection it touched while
//! holding that collection's lock. Queries are linear scans.
//!
//! Only one process may use a working directory at a time.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idm_auth::Argon2PasswordEncoder;
//! use idm_store_file::{FileIdentityStore, FileStoreConfig};
//!
//! let config = FileStoreConfig::new("/var/lib/idm").always_create_files(false);
//! let store = FileIdentityStore::open(&config, Arc::new(Argon2PasswordEncoder::with_defaults()))?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod collection;
pub mod config;
pub mod query;
pub mod store;

pub use collection::PersistedCollection;
pub use config::FileStoreConfig;
pub use store::FileIdentityStore;
