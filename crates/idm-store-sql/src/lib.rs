//! # idm-store-sql
//!
//! SQLx-based relational identity store.
//!
//! Users, groups and roles are rows keyed by a unique name; memberships
//! are a keys-only triple table; attributes live in one table keyed by
//! owner kind, owner key, name and value position. Queries are composed
//! with [`sqlx::QueryBuilder`]: role and group constraints become `EXISTS`
//! joins through the memberships table and attribute filters become
//! `value IN (...)` joins through the attributes table, with the exact
//! value-sequence check applied to the narrowed rows.
//!
//! The bundled migrations target `SQLite`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;
pub mod entities;
pub mod error;
pub mod pool;
pub mod query;
pub mod store;

pub use pool::{PoolConfig, create_pool, run_migrations};
pub use store::SqlIdentityStore;
