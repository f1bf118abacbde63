//! The identity store contract.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use idm_model::{Attributes, IdentityType, Membership};

use crate::credential::CERTIFICATE_ATTRIBUTE;
use crate::error::StorageResult;
use crate::query::{GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};

/// Uniform CRUD, query, attribute and credential contract over users,
/// groups, roles and memberships.
///
/// Each backend owns its entity representation through the associated
/// types. Entities handed to a store must have been produced by that same
/// store; backends that can detect a foreign entity reject it with
/// `StorageError::SchemaMismatch` before doing any work.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// The store's user representation.
    type User: IdentityType + AsRef<idm_model::User> + Clone + Send + Sync + 'static;
    /// The store's group representation.
    type Group: IdentityType + AsRef<idm_model::Group> + Clone + Send + Sync + 'static;
    /// The store's role representation.
    type Role: IdentityType + AsRef<idm_model::Role> + Clone + Send + Sync + 'static;

    // ========================================================================
    // Users
    // ========================================================================

    /// Creates and persists a new user keyed by `name`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a user with the same key exists.
    async fn create_user(&self, name: &str) -> StorageResult<Self::User>;

    /// Gets a user by key. A miss is `Ok(None)`.
    async fn get_user(&self, name: &str) -> StorageResult<Option<Self::User>>;

    /// Persists the user's profile fields (names, email, enabled flag).
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the user doesn't exist.
    async fn update_user(&self, user: &Self::User) -> StorageResult<()>;

    /// Removes a user and its attributes. Memberships naming the user are
    /// left in place.
    async fn remove_user(&self, user: &Self::User) -> StorageResult<()>;

    // ========================================================================
    // Groups
    // ========================================================================

    /// Creates and persists a new group, optionally under `parent`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the name is taken, or
    /// `StorageError::NotFound` if the parent no longer exists.
    async fn create_group(
        &self,
        name: &str,
        parent: Option<&Self::Group>,
    ) -> StorageResult<Self::Group>;

    /// Gets a group by name. A miss is `Ok(None)`.
    async fn get_group(&self, name: &str) -> StorageResult<Option<Self::Group>>;

    /// Gets the parent of a group.
    async fn get_group_parent(&self, group: &Self::Group) -> StorageResult<Option<Self::Group>>;

    /// Removes a group and its attributes.
    async fn remove_group(&self, group: &Self::Group) -> StorageResult<()>;

    // ========================================================================
    // Roles
    // ========================================================================

    /// Creates and persists a new role.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the name is taken.
    async fn create_role(&self, name: &str) -> StorageResult<Self::Role>;

    /// Gets a role by name. A miss is `Ok(None)`.
    async fn get_role(&self, name: &str) -> StorageResult<Option<Self::Role>>;

    /// Removes a role and its attributes.
    async fn remove_role(&self, role: &Self::Role) -> StorageResult<()>;

    // ========================================================================
    // Memberships
    // ========================================================================

    /// Binds `role` to `user` within `group`.
    ///
    /// Creating the same triple twice is not rejected.
    async fn create_membership(
        &self,
        role: &Self::Role,
        user: &Self::User,
        group: &Self::Group,
    ) -> StorageResult<Membership>;

    /// Gets the membership binding exactly this triple.
    async fn get_membership(
        &self,
        role: &Self::Role,
        user: &Self::User,
        group: &Self::Group,
    ) -> StorageResult<Option<Membership>>;

    /// Removes the membership binding exactly this triple. Removing a
    /// triple that is not stored succeeds and changes nothing.
    async fn remove_membership(
        &self,
        role: &Self::Role,
        user: &Self::User,
        group: &Self::Group,
    ) -> StorageResult<()>;

    // ========================================================================
    // Queries
    // ========================================================================

    /// Evaluates a user query.
    async fn query_users(&self, query: &UserQuery, range: Range) -> StorageResult<Vec<Self::User>>;

    /// Evaluates a group query.
    async fn query_groups(
        &self,
        query: &GroupQuery,
        range: Range,
    ) -> StorageResult<Vec<Self::Group>>;

    /// Evaluates a role query.
    async fn query_roles(&self, query: &RoleQuery, range: Range) -> StorageResult<Vec<Self::Role>>;

    /// Evaluates a membership query.
    async fn query_memberships(
        &self,
        query: &MembershipQuery,
        range: Range,
    ) -> StorageResult<Vec<Membership>>;

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Replaces the values of a user attribute.
    async fn set_user_attribute(
        &self,
        user: &mut Self::User,
        name: &str,
        values: Vec<String>,
    ) -> StorageResult<()>;

    /// Removes a user attribute.
    async fn remove_user_attribute(&self, user: &mut Self::User, name: &str) -> StorageResult<()>;

    /// Reads the stored values of a user attribute.
    async fn user_attribute_values(
        &self,
        user: &Self::User,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>>;

    /// Reads every stored attribute of a user.
    async fn user_attributes(&self, user: &Self::User) -> StorageResult<Attributes>;

    /// Replaces the values of a group attribute.
    async fn set_group_attribute(
        &self,
        group: &mut Self::Group,
        name: &str,
        values: Vec<String>,
    ) -> StorageResult<()>;

    /// Removes a group attribute.
    async fn remove_group_attribute(&self, group: &mut Self::Group, name: &str)
    -> StorageResult<()>;

    /// Reads the stored values of a group attribute.
    async fn group_attribute_values(
        &self,
        group: &Self::Group,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>>;

    /// Reads every stored attribute of a group.
    async fn group_attributes(&self, group: &Self::Group) -> StorageResult<Attributes>;

    /// Replaces the values of a role attribute.
    async fn set_role_attribute(
        &self,
        role: &mut Self::Role,
        name: &str,
        values: Vec<String>,
    ) -> StorageResult<()>;

    /// Removes a role attribute.
    async fn remove_role_attribute(&self, role: &mut Self::Role, name: &str) -> StorageResult<()>;

    /// Reads the stored values of a role attribute.
    async fn role_attribute_values(
        &self,
        role: &Self::Role,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>>;

    /// Reads every stored attribute of a role.
    async fn role_attributes(&self, role: &Self::Role) -> StorageResult<Attributes>;

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Checks a password against the user's stored credential.
    async fn validate_password(&self, user: &Self::User, password: &str) -> StorageResult<bool>;

    /// Replaces the user's password.
    async fn update_password(&self, user: &mut Self::User, password: &str) -> StorageResult<()>;

    /// Stores a DER-encoded certificate for the user.
    async fn update_certificate(&self, user: &mut Self::User, der: &[u8]) -> StorageResult<()> {
        let encoded = BASE64.encode(der);
        self.set_user_attribute(user, CERTIFICATE_ATTRIBUTE, vec![encoded])
            .await
    }

    /// Checks a DER-encoded certificate against the one stored for the user.
    async fn validate_certificate(&self, user: &Self::User, der: &[u8]) -> StorageResult<bool> {
        let expected = BASE64.encode(der);
        let stored = self
            .user_attribute_values(user, CERTIFICATE_ATTRIBUTE)
            .await?;
        Ok(stored
            .and_then(|values| values.into_iter().next())
            .is_some_and(|value| value == expected))
    }
}
