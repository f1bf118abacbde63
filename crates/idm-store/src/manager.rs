//! Identity manager facade.
//!
//! Application-facing entry point that forwards every call to the
//! configured [`IdentityStore`].

use idm_model::{Attributes, Membership};
use tracing::debug;

use crate::error::StorageResult;
use crate::query::{GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};
use crate::store::IdentityStore;

/// Thin delegation layer over an identity store.
#[derive(Debug, Clone)]
pub struct IdentityManager<S> {
    store: S,
}

impl<S: IdentityStore> IdentityManager<S> {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: S) -> Self {
        debug!(store = std::any::type_name::<S>(), "Identity manager created");
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Unwraps the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    // === Users ===

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn create_user(&self, name: &str) -> StorageResult<S::User> {
        self.store.create_user(name).await
    }

    /// Gets a user by key.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get_user(&self, name: &str) -> StorageResult<Option<S::User>> {
        self.store.get_user(name).await
    }

    /// Persists a user's profile fields.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn update_user(&self, user: &S::User) -> StorageResult<()> {
        self.store.update_user(user).await
    }

    /// Removes a user.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_user(&self, user: &S::User) -> StorageResult<()> {
        self.store.remove_user(user).await
    }

    // === Groups ===

    /// Creates a group.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn create_group(
        &self,
        name: &str,
        parent: Option<&S::Group>,
    ) -> StorageResult<S::Group> {
        self.store.create_group(name, parent).await
    }

    /// Gets a group by name.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get_group(&self, name: &str) -> StorageResult<Option<S::Group>> {
        self.store.get_group(name).await
    }

    /// Gets the parent of a group.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get_group_parent(&self, group: &S::Group) -> StorageResult<Option<S::Group>> {
        self.store.get_group_parent(group).await
    }

    /// Removes a group.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_group(&self, group: &S::Group) -> StorageResult<()> {
        self.store.remove_group(group).await
    }

    // === Roles ===

    /// Creates a role.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn create_role(&self, name: &str) -> StorageResult<S::Role> {
        self.store.create_role(name).await
    }

    /// Gets a role by name.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get_role(&self, name: &str) -> StorageResult<Option<S::Role>> {
        self.store.get_role(name).await
    }

    /// Removes a role.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_role(&self, role: &S::Role) -> StorageResult<()> {
        self.store.remove_role(role).await
    }

    // === Memberships ===

    /// Binds a role to a user within a group.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn create_membership(
        &self,
        role: &S::Role,
        user: &S::User,
        group: &S::Group,
    ) -> StorageResult<Membership> {
        self.store.create_membership(role, user, group).await
    }

    /// Gets the membership binding exactly this triple.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get_membership(
        &self,
        role: &S::Role,
        user: &S::User,
        group: &S::Group,
    ) -> StorageResult<Option<Membership>> {
        self.store.get_membership(role, user, group).await
    }

    /// Removes the membership binding exactly this triple.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_membership(
        &self,
        role: &S::Role,
        user: &S::User,
        group: &S::Group,
    ) -> StorageResult<()> {
        self.store.remove_membership(role, user, group).await
    }

    // === Queries ===

    /// Evaluates a user query.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn query_users(&self, query: &UserQuery, range: Range) -> StorageResult<Vec<S::User>> {
        self.store.query_users(query, range).await
    }

    /// Evaluates a group query.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn query_groups(
        &self,
        query: &GroupQuery,
        range: Range,
    ) -> StorageResult<Vec<S::Group>> {
        self.store.query_groups(query, range).await
    }

    /// Evaluates a role query.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn query_roles(&self, query: &RoleQuery, range: Range) -> StorageResult<Vec<S::Role>> {
        self.store.query_roles(query, range).await
    }

    /// Evaluates a membership query.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn query_memberships(
        &self,
        query: &MembershipQuery,
        range: Range,
    ) -> StorageResult<Vec<Membership>> {
        self.store.query_memberships(query, range).await
    }

    // === Attributes ===

    /// Replaces a user attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn set_user_attribute(
        &self,
        user: &mut S::User,
        name: &str,
        values: Vec<String>,
    ) -> StorageResult<()> {
        self.store.set_user_attribute(user, name, values).await
    }

    /// Removes a user attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_user_attribute(&self, user: &mut S::User, name: &str) -> StorageResult<()> {
        self.store.remove_user_attribute(user, name).await
    }

    /// Reads a user attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn user_attribute_values(
        &self,
        user: &S::User,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>> {
        self.store.user_attribute_values(user, name).await
    }

    /// Reads every user attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn user_attributes(&self, user: &S::User) -> StorageResult<Attributes> {
        self.store.user_attributes(user).await
    }

    /// Replaces a group attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn set_group_attribute(
        &self,
        group: &mut S::Group,
        name: &str,
        values: Vec<String>,
    ) -> StorageResult<()> {
        self.store.set_group_attribute(group, name, values).await
    }

    /// Removes a group attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_group_attribute(
        &self,
        group: &mut S::Group,
        name: &str,
    ) -> StorageResult<()> {
        self.store.remove_group_attribute(group, name).await
    }

    /// Reads a group attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn group_attribute_values(
        &self,
        group: &S::Group,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>> {
        self.store.group_attribute_values(group, name).await
    }

    /// Reads every group attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn group_attributes(&self, group: &S::Group) -> StorageResult<Attributes> {
        self.store.group_attributes(group).await
    }

    /// Replaces a role attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn set_role_attribute(
        &self,
        role: &mut S::Role,
        name: &str,
        values: Vec<String>,
    ) -> StorageResult<()> {
        self.store.set_role_attribute(role, name, values).await
    }

    /// Removes a role attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn remove_role_attribute(&self, role: &mut S::Role, name: &str) -> StorageResult<()> {
        self.store.remove_role_attribute(role, name).await
    }

    /// Reads a role attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn role_attribute_values(
        &self,
        role: &S::Role,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>> {
        self.store.role_attribute_values(role, name).await
    }

    /// Reads every role attribute.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn role_attributes(&self, role: &S::Role) -> StorageResult<Attributes> {
        self.store.role_attributes(role).await
    }

    // === Credentials ===

    /// Checks a password.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn validate_password(&self, user: &S::User, password: &str) -> StorageResult<bool> {
        self.store.validate_password(user, password).await
    }

    /// Replaces a password.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn update_password(&self, user: &mut S::User, password: &str) -> StorageResult<()> {
        self.store.update_password(user, password).await
    }

    /// Checks a DER certificate.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn validate_certificate(&self, user: &S::User, der: &[u8]) -> StorageResult<bool> {
        self.store.validate_certificate(user, der).await
    }

    /// Stores a DER certificate.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn update_certificate(&self, user: &mut S::User, der: &[u8]) -> StorageResult<()> {
        self.store.update_certificate(user, der).await
    }
}
