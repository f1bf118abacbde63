//! File-backed identity store implementation.

use std::sync::Arc;

use async_trait::async_trait;
use idm_model::{Attributes, Group, IdentityType, Membership, Role, User};
use idm_store::credential::verify_stored;
use idm_store::{
    GroupQuery, IdentityStore, MembershipQuery, PASSWORD_ATTRIBUTE, PasswordEncoder, Range,
    RoleQuery, StorageError, StorageResult, UserQuery,
};
use tracing::{debug, info};

use crate::collection::PersistedCollection;
use crate::config::FileStoreConfig;
use crate::query;

/// Identity store persisting each collection to its own file.
pub struct FileIdentityStore {
    users: PersistedCollection<User>,
    roles: PersistedCollection<Role>,
    groups: PersistedCollection<Group>,
    memberships: PersistedCollection<Membership>,
    encoder: Arc<dyn PasswordEncoder>,
}

impl std::fmt::Debug for FileIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIdentityStore")
            .field("users", &self.users.path())
            .field("roles", &self.roles.path())
            .field("groups", &self.groups.path())
            .field("memberships", &self.memberships.path())
            .finish_non_exhaustive()
    }
}

impl FileIdentityStore {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a collection
    /// file cannot be created or loaded.
    pub fn open(config: &FileStoreConfig, encoder: Arc<dyn PasswordEncoder>) -> StorageResult<Self> {
        config.validate()?;
        let recreate = config.always_create_files;

        let store = Self {
            users: PersistedCollection::open(config.users_path(), recreate)?,
            roles: PersistedCollection::open(config.roles_path(), recreate)?,
            groups: PersistedCollection::open(config.groups_path(), recreate)?,
            memberships: PersistedCollection::open(config.memberships_path(), recreate)?,
            encoder,
        };

        info!(
            working_dir = %config.working_dir.display(),
            recreated = recreate,
            "File identity store opened"
        );
        Ok(store)
    }
}

// ============================================================================
// Collection helpers
// ============================================================================

fn find<'a, T: IdentityType>(items: &'a [T], key: &str) -> Option<&'a T> {
    items.iter().find(|item| item.key() == key)
}

fn find_mut<'a, T: IdentityType>(items: &'a mut [T], key: &str) -> Option<&'a mut T> {
    items.iter_mut().find(|item| item.key() == key)
}

fn insert_unique<T: IdentityType + Clone>(
    items: &mut Vec<T>,
    entity_type: &'static str,
    entity: T,
) -> StorageResult<T> {
    if find(items, entity.key()).is_some() {
        return Err(StorageError::duplicate(entity_type, "name", entity.key()));
    }
    items.push(entity.clone());
    Ok(entity)
}

fn remove_by_key<T: IdentityType>(items: &mut Vec<T>, key: &str) {
    items.retain(|item| item.key() != key);
}

fn set_attribute<T: IdentityType>(
    collection: &PersistedCollection<T>,
    entity_type: &'static str,
    entity: &mut T,
    name: &str,
    values: Vec<String>,
) -> StorageResult<()>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    let key = entity.key().to_string();
    let stored_values = values.clone();
    collection.mutate(|items| {
        let stored = find_mut(items, &key).ok_or_else(|| StorageError::not_found(entity_type, &key))?;
        stored.attributes_mut().set(name, stored_values);
        Ok(())
    })?;
    entity.attributes_mut().set(name, values);
    debug!(entity_type, key = %key, attribute = name, "Attribute set");
    Ok(())
}

fn remove_attribute<T: IdentityType>(
    collection: &PersistedCollection<T>,
    entity_type: &'static str,
    entity: &mut T,
    name: &str,
) -> StorageResult<()>
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    let key = entity.key().to_string();
    collection.mutate(|items| {
        let stored = find_mut(items, &key).ok_or_else(|| StorageError::not_found(entity_type, &key))?;
        stored.attributes_mut().remove(name);
        Ok(())
    })?;
    entity.attributes_mut().remove(name);
    debug!(entity_type, key = %key, attribute = name, "Attribute removed");
    Ok(())
}

fn attribute_values<T>(collection: &PersistedCollection<T>, key: &str, name: &str) -> Option<Vec<String>>
where
    T: IdentityType + serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    collection.read(|items| {
        find(items, key)
            .and_then(|stored| stored.attributes().get(name))
            .map(<[String]>::to_vec)
    })
}

fn attributes<T>(collection: &PersistedCollection<T>, key: &str) -> Attributes
where
    T: IdentityType + serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    collection.read(|items| {
        find(items, key)
            .map(|stored| stored.attributes().clone())
            .unwrap_or_default()
    })
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    type User = User;
    type Group = Group;
    type Role = Role;

    // ========================================================================
    // Users
    // ========================================================================

    async fn create_user(&self, name: &str) -> StorageResult<User> {
        let user = self
            .users
            .mutate(|users| insert_unique(users, "User", User::new(name)))?;
        debug!(key = %name, "User created");
        Ok(user)
    }

    async fn get_user(&self, name: &str) -> StorageResult<Option<User>> {
        Ok(self.users.read(|users| find(users, name).cloned()))
    }

    async fn update_user(&self, user: &User) -> StorageResult<()> {
        self.users.mutate(|users| {
            let stored = find_mut(users, &user.key)
                .ok_or_else(|| StorageError::not_found("User", &user.key))?;
            stored.full_name.clone_from(&user.full_name);
            stored.first_name.clone_from(&user.first_name);
            stored.last_name.clone_from(&user.last_name);
            stored.email.clone_from(&user.email);
            stored.enabled = user.enabled;
            Ok(())
        })?;
        debug!(key = %user.key, "User updated");
        Ok(())
    }

    async fn remove_user(&self, user: &User) -> StorageResult<()> {
        self.users.mutate(|users| {
            remove_by_key(users, &user.key);
            Ok(())
        })?;
        debug!(key = %user.key, "User removed");
        Ok(())
    }

    // ========================================================================
    // Groups
    // ========================================================================

    async fn create_group(&self, name: &str, parent: Option<&Group>) -> StorageResult<Group> {
        let group = self.groups.mutate(|groups| {
            let mut group = Group::new(name);
            if let Some(parent) = parent {
                if find(groups, &parent.name).is_none() {
                    return Err(StorageError::not_found("Group", &parent.name));
                }
                group.parent = Some(parent.name.clone());
            }
            insert_unique(groups, "Group", group)
        })?;
        debug!(key = %name, parent = ?group.parent, "Group created");
        Ok(group)
    }

    async fn get_group(&self, name: &str) -> StorageResult<Option<Group>> {
        Ok(self.groups.read(|groups| find(groups, name).cloned()))
    }

    async fn get_group_parent(&self, group: &Group) -> StorageResult<Option<Group>> {
        let parent = self.groups.read(|groups| {
            find(groups, &group.name)
                .and_then(|stored| stored.parent.as_deref())
                .and_then(|parent| find(groups, parent))
                .cloned()
        });
        Ok(parent)
    }

    async fn remove_group(&self, group: &Group) -> StorageResult<()> {
        self.groups.mutate(|groups| {
            remove_by_key(groups, &group.name);
            Ok(())
        })?;
        debug!(key = %group.name, "Group removed");
        Ok(())
    }

    // ========================================================================
    // Roles
    // ========================================================================

    async fn create_role(&self, name: &str) -> StorageResult<Role> {
        let role = self
            .roles
            .mutate(|roles| insert_unique(roles, "Role", Role::new(name)))?;
        debug!(key = %name, "Role created");
        Ok(role)
    }

    async fn get_role(&self, name: &str) -> StorageResult<Option<Role>> {
        Ok(self.roles.read(|roles| find(roles, name).cloned()))
    }

    async fn remove_role(&self, role: &Role) -> StorageResult<()> {
        self.roles.mutate(|roles| {
            remove_by_key(roles, &role.name);
            Ok(())
        })?;
        debug!(key = %role.name, "Role removed");
        Ok(())
    }

    // ========================================================================
    // Memberships
    // ========================================================================

    async fn create_membership(&self, role: &Role, user: &User, group: &Group) -> StorageResult<Membership> {
        let membership = Membership::new(&role.name, &user.key, &group.name);
        let stored = membership.clone();
        self.memberships.mutate(|memberships| {
            memberships.push(stored);
            Ok(())
        })?;
        debug!(role = %role.name, user = %user.key, group = %group.name, "Membership created");
        Ok(membership)
    }

    async fn get_membership(
        &self,
        role: &Role,
        user: &User,
        group: &Group,
    ) -> StorageResult<Option<Membership>> {
        Ok(self.memberships.read(|memberships| {
            memberships
                .iter()
                .find(|m| m.binds(&role.name, &user.key, &group.name))
                .cloned()
        }))
    }

    async fn remove_membership(&self, role: &Role, user: &User, group: &Group) -> StorageResult<()> {
        let removed = self.memberships.mutate(|memberships| {
            let before = memberships.len();
            memberships.retain(|m| !m.binds(&role.name, &user.key, &group.name));
            Ok(before - memberships.len())
        })?;
        debug!(role = %role.name, user = %user.key, group = %group.name, removed, "Membership removed");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn query_users(&self, query: &UserQuery, range: Range) -> StorageResult<Vec<User>> {
        let memberships = self.memberships.snapshot();
        let candidates = self.users.snapshot();
        let results = query::users(candidates, &memberships, query, range);
        debug!(results = results.len(), "User query evaluated");
        Ok(results)
    }

    async fn query_groups(&self, query: &GroupQuery, range: Range) -> StorageResult<Vec<Group>> {
        let memberships = self.memberships.snapshot();
        let candidates = self.groups.snapshot();
        let results = query::groups(candidates, &memberships, query, range);
        debug!(results = results.len(), "Group query evaluated");
        Ok(results)
    }

    async fn query_roles(&self, query: &RoleQuery, range: Range) -> StorageResult<Vec<Role>> {
        let memberships = self.memberships.snapshot();
        let candidates = self.roles.snapshot();
        let results = query::roles(candidates, &memberships, query, range);
        debug!(results = results.len(), "Role query evaluated");
        Ok(results)
    }

    async fn query_memberships(
        &self,
        query: &MembershipQuery,
        range: Range,
    ) -> StorageResult<Vec<Membership>> {
        Ok(self
            .memberships
            .read(|memberships| query::memberships(memberships, query, range)))
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    async fn set_user_attribute(&self, user: &mut User, name: &str, values: Vec<String>) -> StorageResult<()> {
        set_attribute(&self.users, "User", user, name, values)
    }

    async fn remove_user_attribute(&self, user: &mut User, name: &str) -> StorageResult<()> {
        remove_attribute(&self.users, "User", user, name)
    }

    async fn user_attribute_values(&self, user: &User, name: &str) -> StorageResult<Option<Vec<String>>> {
        Ok(attribute_values(&self.users, &user.key, name))
    }

    async fn user_attributes(&self, user: &User) -> StorageResult<Attributes> {
        Ok(attributes(&self.users, &user.key))
    }

    async fn set_group_attribute(&self, group: &mut Group, name: &str, values: Vec<String>) -> StorageResult<()> {
        set_attribute(&self.groups, "Group", group, name, values)
    }

    async fn remove_group_attribute(&self, group: &mut Group, name: &str) -> StorageResult<()> {
        remove_attribute(&self.groups, "Group", group, name)
    }

    async fn group_attribute_values(&self, group: &Group, name: &str) -> StorageResult<Option<Vec<String>>> {
        Ok(attribute_values(&self.groups, &group.name, name))
    }

    async fn group_attributes(&self, group: &Group) -> StorageResult<Attributes> {
        Ok(attributes(&self.groups, &group.name))
    }

    async fn set_role_attribute(&self, role: &mut Role, name: &str, values: Vec<String>) -> StorageResult<()> {
        set_attribute(&self.roles, "Role", role, name, values)
    }

    async fn remove_role_attribute(&self, role: &mut Role, name: &str) -> StorageResult<()> {
        remove_attribute(&self.roles, "Role", role, name)
    }

    async fn role_attribute_values(&self, role: &Role, name: &str) -> StorageResult<Option<Vec<String>>> {
        Ok(attribute_values(&self.roles, &role.name, name))
    }

    async fn role_attributes(&self, role: &Role) -> StorageResult<Attributes> {
        Ok(attributes(&self.roles, &role.name))
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    async fn validate_password(&self, user: &User, password: &str) -> StorageResult<bool> {
        let stored = attribute_values(&self.users, &user.key, PASSWORD_ATTRIBUTE);
        verify_stored(self.encoder.as_ref(), stored.as_deref(), password)
    }

    async fn update_password(&self, user: &mut User, password: &str) -> StorageResult<()> {
        let encoded = self.encoder.encode(password)?;
        set_attribute(&self.users, "User", user, PASSWORD_ATTRIBUTE, vec![encoded])
    }
}
