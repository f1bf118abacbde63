//! # idm-store
//!
//! Identity store contract for users, groups, roles and memberships.
//!
//! This crate defines the interface that concrete backends (file, SQL,
//! directory) implement, the query specifications they evaluate, and the
//! [`IdentityManager`] facade applications call.
//!
//! ## Contract
//!
//! - [`IdentityStore`] - CRUD, queries, attributes and credentials
//! - [`PasswordEncoder`] - caller-supplied password encoding strategy
//! - [`StorageError`] - error taxonomy shared by every backend
//!
//! ## Example
//!
//! ```ignore
//! use idm_store::{IdentityManager, Range, UserQuery};
//!
//! let manager = IdentityManager::new(store);
//! let user = manager.create_user("asaldhana").await?;
//! let admins = manager
//!     .query_users(&UserQuery::new().role("admin"), Range::all())
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod error;
pub mod manager;
pub mod query;
pub mod store;

pub use credential::{CERTIFICATE_ATTRIBUTE, PASSWORD_ATTRIBUTE, PasswordEncoder};
pub use error::{StorageError, StorageResult};
pub use manager::IdentityManager;
pub use query::{AttributeFilters, GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};
pub use store::IdentityStore;
