//! # idm-store-ldap
//!
//! LDAP directory identity store.
//!
//! Users, groups and roles map to directory entries under independently
//! configured DN suffixes. Attributes defined by the directory schema are
//! written straight to the entry; any other attribute is kept in a
//! `cn=CustomAttributes` sub-entry holding a JSON document. Memberships are
//! `organizationalRole` entries below the group whose `roleOccupant` values
//! are user DNs.
//!
//! All directory traffic goes through the [`DirectoryClient`] trait;
//! [`Ldap3Client`] implements it over a single `ldap3` connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod connection;
pub mod dn;
pub mod entity;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod overlay;
pub mod schema;
pub mod store;

pub use client::{DirectoryClient, DirectoryEntry, Modification, Scope};
pub use config::{LdapStoreConfig, LdapStoreConfigBuilder, TransportProtocol};
pub use connection::Ldap3Client;
pub use entity::{LdapGroup, LdapRole, LdapUser};
pub use error::{LdapStoreError, LdapStoreResult};
pub use filter::Filter;
pub use schema::SchemaCache;
pub use store::LdapIdentityStore;
