//! # idm-model
//!
//! Identity entities for the identity store.
//!
//! Every entity is keyed by a unique string and carries an [`Attributes`]
//! bag of multi-valued string attributes. Memberships bind a role, a user
//! and a group by key.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attributes;
pub mod group;
pub mod membership;
pub mod role;
pub mod user;

pub use attributes::Attributes;
pub use group::Group;
pub use membership::Membership;
pub use role::Role;
pub use user::User;

/// Common accessors shared by users, groups and roles.
pub trait IdentityType {
    /// Returns the unique key of the entity within its store.
    fn key(&self) -> &str;

    /// Returns the entity's attribute bag.
    fn attributes(&self) -> &Attributes;

    /// Returns the entity's attribute bag for mutation.
    fn attributes_mut(&mut self) -> &mut Attributes;
}
