//! Relational identity store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use idm_model::{Attributes, Group, Membership, Role, User};
use idm_store::credential::verify_stored;
use idm_store::query::eval;
use idm_store::{
    GroupQuery, IdentityStore, MembershipQuery, PASSWORD_ATTRIBUTE, PasswordEncoder, Range,
    RoleQuery, StorageError, StorageResult, UserQuery,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::convert::{
    attribute_rows, attributes_by_owner, group_from_row, membership_from_row, role_from_row,
    user_from_row,
};
use crate::entities::{AttributeRow, GroupRow, MembershipRow, OwnerKind, RoleRow, UserRow};
use crate::error::{from_insert_error, from_sqlx_error, from_transaction_error};
use crate::pool::{PoolConfig, create_pool};
use crate::query;

/// Identity store backed by a `SQLite` database.
pub struct SqlIdentityStore {
    pool: SqlitePool,
    encoder: Arc<dyn PasswordEncoder>,
}

impl std::fmt::Debug for SqlIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlIdentityStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl SqlIdentityStore {
    /// Creates a store over an existing, migrated pool.
    #[must_use]
    pub fn new(pool: SqlitePool, encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self { pool, encoder }
    }

    /// Connects a new pool and creates a store over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or migrated.
    pub async fn connect(config: &PoolConfig, encoder: Arc<dyn PasswordEncoder>) -> StorageResult<Self> {
        let pool = create_pool(config).await?;
        info!(url = %config.url, "Relational identity store connected");
        Ok(Self::new(pool, encoder))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_attributes(
        &self,
        kind: OwnerKind,
        keys: &[String],
    ) -> StorageResult<HashMap<String, Attributes>> {
        let mut loaded = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(query::ATTRIBUTE_CHUNK) {
            let rows: Vec<AttributeRow> = query::select_attributes(kind, chunk)
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(from_sqlx_error)?;
            loaded.extend(attributes_by_owner(rows));
        }
        Ok(loaded)
    }

    async fn attributes_of(&self, kind: OwnerKind, key: &str) -> StorageResult<Attributes> {
        let keys = [key.to_string()];
        let mut loaded = self.load_attributes(kind, &keys).await?;
        Ok(loaded.remove(key).unwrap_or_default())
    }

    async fn attribute_values(
        &self,
        kind: OwnerKind,
        key: &str,
        name: &str,
    ) -> StorageResult<Option<Vec<String>>> {
        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            r"SELECT position, value FROM idm_attributes
            WHERE owner_kind = ? AND owner_key = ? AND name = ?
            ORDER BY position",
        )
        .bind(kind.as_str())
        .bind(key)
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().filter_map(|(_, value)| value).collect()))
    }

    async fn exists(&self, kind: OwnerKind, key: &str) -> StorageResult<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE name = ?", kind.table());
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        Ok(row.is_some())
    }

    async fn write_attribute(
        &self,
        kind: OwnerKind,
        key: &str,
        name: &str,
        values: Option<&[String]>,
    ) -> StorageResult<()> {
        if !self.exists(kind, key).await? {
            return Err(StorageError::not_found(kind.entity_type(), key));
        }

        let mut tx = self.pool.begin().await.map_err(from_transaction_error)?;

        sqlx::query("DELETE FROM idm_attributes WHERE owner_kind = ? AND owner_key = ? AND name = ?")
            .bind(kind.as_str())
            .bind(key)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;

        if let Some(values) = values {
            for (position, value) in attribute_rows(values) {
                sqlx::query(
                    r"INSERT INTO idm_attributes (owner_kind, owner_key, name, position, value)
                    VALUES (?, ?, ?, ?, ?)",
                )
                .bind(kind.as_str())
                .bind(key)
                .bind(name)
                .bind(position)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(from_sqlx_error)?;
            }
        }

        tx.commit().await.map_err(from_transaction_error)?;
        debug!(
            entity_type = kind.entity_type(),
            key,
            attribute = name,
            removed = values.is_none(),
            "Attribute written"
        );
        Ok(())
    }

    async fn remove_entity(&self, kind: OwnerKind, key: &str) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_transaction_error)?;

        let sql = format!("DELETE FROM {} WHERE name = ?", kind.table());
        sqlx::query(&sql)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;

        sqlx::query("DELETE FROM idm_attributes WHERE owner_kind = ? AND owner_key = ?")
            .bind(kind.as_str())
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;

        tx.commit().await.map_err(from_transaction_error)?;
        debug!(entity_type = kind.entity_type(), key, "Entity removed");
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqlIdentityStore {
    type User = User;
    type Group = Group;
    type Role = Role;

    // ========================================================================
    // Users
    // ========================================================================

    async fn create_user(&self, name: &str) -> StorageResult<User> {
        let user = User::new(name);
        sqlx::query("INSERT INTO idm_users (name, enabled) VALUES (?, ?)")
            .bind(&user.key)
            .bind(user.enabled)
            .execute(&self.pool)
            .await
            .map_err(from_insert_error("User", name))?;
        debug!(key = %name, "User created");
        Ok(user)
    }

    async fn get_user(&self, name: &str) -> StorageResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM idm_users u WHERE u.name = ?",
            query::USER_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        match row {
            Some(row) => {
                let attributes = self.attributes_of(OwnerKind::User, name).await?;
                Ok(Some(user_from_row(row, attributes)))
            }
            None => Ok(None),
        }
    }

    async fn update_user(&self, user: &User) -> StorageResult<()> {
        let result = sqlx::query(
            r"UPDATE idm_users SET
                full_name = ?, first_name = ?, last_name = ?, email = ?, enabled = ?
            WHERE name = ?",
        )
        .bind(&user.full_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.enabled)
        .bind(&user.key)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", &user.key));
        }
        debug!(key = %user.key, "User updated");
        Ok(())
    }

    async fn remove_user(&self, user: &User) -> StorageResult<()> {
        self.remove_entity(OwnerKind::User, &user.key).await
    }

    // ========================================================================
    // Groups
    // ========================================================================

    async fn create_group(&self, name: &str, parent: Option<&Group>) -> StorageResult<Group> {
        let mut group = Group::new(name);
        if let Some(parent) = parent {
            if !self.exists(OwnerKind::Group, &parent.name).await? {
                return Err(StorageError::not_found("Group", &parent.name));
            }
            group.parent = Some(parent.name.clone());
        }

        sqlx::query("INSERT INTO idm_groups (name, parent) VALUES (?, ?)")
            .bind(&group.name)
            .bind(&group.parent)
            .execute(&self.pool)
            .await
            .map_err(from_insert_error("Group", name))?;
        debug!(key = %name, parent = ?group.parent, "Group created");
        Ok(group)
    }

    async fn get_group(&self, name: &str) -> StorageResult<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(&format!(
            "SELECT {} FROM idm_groups g WHERE g.name = ?",
            query::GROUP_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        match row {
            Some(row) => {
                let attributes = self.attributes_of(OwnerKind::Group, name).await?;
                Ok(Some(group_from_row(row, attributes)))
            }
            None => Ok(None),
        }
    }

    async fn get_group_parent(&self, group: &Group) -> StorageResult<Option<Group>> {
        let parent: Option<(Option<String>,)> =
            sqlx::query_as("SELECT parent FROM idm_groups WHERE name = ?")
                .bind(&group.name)
                .fetch_optional(&self.pool)
                .await
                .map_err(from_sqlx_error)?;

        match parent.and_then(|(parent,)| parent) {
            Some(parent) => self.get_group(&parent).await,
            None => Ok(None),
        }
    }

    async fn remove_group(&self, group: &Group) -> StorageResult<()> {
        self.remove_entity(OwnerKind::Group, &group.name).await
    }

    // ========================================================================
    // Roles
    // ========================================================================

    async fn create_role(&self, name: &str) -> StorageResult<Role> {
        sqlx::query("INSERT INTO idm_roles (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(from_insert_error("Role", name))?;
        debug!(key = %name, "Role created");
        Ok(Role::new(name))
    }

    async fn get_role(&self, name: &str) -> StorageResult<Option<Role>> {
        let row: Option<RoleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM idm_roles r WHERE r.name = ?",
            query::ROLE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        match row {
            Some(row) => {
                let attributes = self.attributes_of(OwnerKind::Role, name).await?;
                Ok(Some(role_from_row(row, attributes)))
            }
            None => Ok(None),
        }
    }

    async fn remove_role(&self, role: &Role) -> StorageResult<()> {
        self.remove_entity(OwnerKind::Role, &role.name).await
    }

    // ========================================================================
    // Memberships
    // ========================================================================

    async fn create_membership(&self, role: &Role, user: &User, group: &Group) -> StorageResult<Membership> {
        sqlx::query("INSERT INTO idm_memberships (role_name, user_name, group_name) VALUES (?, ?, ?)")
            .bind(&role.name)
            .bind(&user.key)
            .bind(&group.name)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        debug!(role = %role.name, user = %user.key, group = %group.name, "Membership created");
        Ok(Membership::new(&role.name, &user.key, &group.name))
    }

    async fn get_membership(
        &self,
        role: &Role,
        user: &User,
        group: &Group,
    ) -> StorageResult<Option<Membership>> {
        let row: Option<MembershipRow> = sqlx::query_as(&format!(
            r"SELECT {} FROM idm_memberships m
            WHERE m.role_name = ? AND m.user_name = ? AND m.group_name = ?
            ORDER BY m.id LIMIT 1",
            query::MEMBERSHIP_COLUMNS
        ))
        .bind(&role.name)
        .bind(&user.key)
        .bind(&group.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        Ok(row.map(membership_from_row))
    }

    async fn remove_membership(&self, role: &Role, user: &User, group: &Group) -> StorageResult<()> {
        let result = sqlx::query(
            "DELETE FROM idm_memberships WHERE role_name = ? AND user_name = ? AND group_name = ?",
        )
        .bind(&role.name)
        .bind(&user.key)
        .bind(&group.name)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx_error)?;

        debug!(
            role = %role.name,
            user = %user.key,
            group = %group.name,
            removed = result.rows_affected(),
            "Membership removed"
        );
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn query_users(&self, query: &UserQuery, range: Range) -> StorageResult<Vec<User>> {
        // Exact sequence checks happen after the fetch, so paging must too
        let post_filter = !query.attributes.is_empty();
        let sql_range = if post_filter { Range::all() } else { range };

        let rows: Vec<UserRow> = query::select_users(query, sql_range)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        let keys: Vec<String> = rows.iter().map(|row| row.name.clone()).collect();
        let mut attributes = self.load_attributes(OwnerKind::User, &keys).await?;
        let mut users: Vec<User> = rows
            .into_iter()
            .map(|row| {
                let attrs = attributes.remove(&row.name).unwrap_or_default();
                user_from_row(row, attrs)
            })
            .collect();

        if post_filter {
            eval::retain_attributes(&mut users, &query.attributes);
            users = range.apply(users);
        }
        debug!(results = users.len(), "User query evaluated");
        Ok(users)
    }

    async fn query_groups(&self, query: &GroupQuery, range: Range) -> StorageResult<Vec<Group>> {
        let post_filter = !query.attributes.is_empty();
        let sql_range = if post_filter { Range::all() } else { range };

        let rows: Vec<GroupRow> = query::select_groups(query, sql_range)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        let keys: Vec<String> = rows.iter().map(|row| row.name.clone()).collect();
        let mut attributes = self.load_attributes(OwnerKind::Group, &keys).await?;
        let mut groups: Vec<Group> = rows
            .into_iter()
            .map(|row| {
                let attrs = attributes.remove(&row.name).unwrap_or_default();
                group_from_row(row, attrs)
            })
            .collect();

        if post_filter {
            eval::retain_attributes(&mut groups, &query.attributes);
            groups = range.apply(groups);
        }
        debug!(results = groups.len(), "Group query evaluated");
        Ok(groups)
    }

    async fn query_roles(&self, query: &RoleQuery, range: Range) -> StorageResult<Vec<Role>> {
        let post_filter = !query.attributes.is_empty();
        let sql_range = if post_filter { Range::all() } else { range };

        let rows: Vec<RoleRow> = query::select_roles(query, sql_range)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        let keys: Vec<String> = rows.iter().map(|row| row.name.clone()).collect();
        let mut attributes = self.load_attributes(OwnerKind::Role, &keys).await?;
        let mut roles: Vec<Role> = rows
            .into_iter()
            .map(|row| {
                let attrs = attributes.remove(&row.name).unwrap_or_default();
                role_from_row(row, attrs)
            })
            .collect();

        if post_filter {
            eval::retain_attributes(&mut roles, &query.attributes);
            roles = range.apply(roles);
        }
        debug!(results = roles.len(), "Role query evaluated");
        Ok(roles)
    }

    async fn query_memberships(
        &self,
        query: &MembershipQuery,
        range: Range,
    ) -> StorageResult<Vec<Membership>> {
        let rows: Vec<MembershipRow> = query::select_memberships(query, range)
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        Ok(rows.into_iter().map(membership_from_row).collect())
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    async fn set_user_attribute(&self, user: &mut User, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.write_attribute(OwnerKind::User, &user.key, name, Some(&values))
            .await?;
        user.attributes.set(name, values);
        Ok(())
    }

    async fn remove_user_attribute(&self, user: &mut User, name: &str) -> StorageResult<()> {
        self.write_attribute(OwnerKind::User, &user.key, name, None)
            .await?;
        user.attributes.remove(name);
        Ok(())
    }

    async fn user_attribute_values(&self, user: &User, name: &str) -> StorageResult<Option<Vec<String>>> {
        self.attribute_values(OwnerKind::User, &user.key, name).await
    }

    async fn user_attributes(&self, user: &User) -> StorageResult<Attributes> {
        self.attributes_of(OwnerKind::User, &user.key).await
    }

    async fn set_group_attribute(&self, group: &mut Group, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.write_attribute(OwnerKind::Group, &group.name, name, Some(&values))
            .await?;
        group.attributes.set(name, values);
        Ok(())
    }

    async fn remove_group_attribute(&self, group: &mut Group, name: &str) -> StorageResult<()> {
        self.write_attribute(OwnerKind::Group, &group.name, name, None)
            .await?;
        group.attributes.remove(name);
        Ok(())
    }

    async fn group_attribute_values(&self, group: &Group, name: &str) -> StorageResult<Option<Vec<String>>> {
        self.attribute_values(OwnerKind::Group, &group.name, name).await
    }

    async fn group_attributes(&self, group: &Group) -> StorageResult<Attributes> {
        self.attributes_of(OwnerKind::Group, &group.name).await
    }

    async fn set_role_attribute(&self, role: &mut Role, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.write_attribute(OwnerKind::Role, &role.name, name, Some(&values))
            .await?;
        role.attributes.set(name, values);
        Ok(())
    }

    async fn remove_role_attribute(&self, role: &mut Role, name: &str) -> StorageResult<()> {
        self.write_attribute(OwnerKind::Role, &role.name, name, None)
            .await?;
        role.attributes.remove(name);
        Ok(())
    }

    async fn role_attribute_values(&self, role: &Role, name: &str) -> StorageResult<Option<Vec<String>>> {
        self.attribute_values(OwnerKind::Role, &role.name, name).await
    }

    async fn role_attributes(&self, role: &Role) -> StorageResult<Attributes> {
        self.attributes_of(OwnerKind::Role, &role.name).await
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    async fn validate_password(&self, user: &User, password: &str) -> StorageResult<bool> {
        let stored = self
            .attribute_values(OwnerKind::User, &user.key, PASSWORD_ATTRIBUTE)
            .await?;
        verify_stored(self.encoder.as_ref(), stored.as_deref(), password)
    }

    async fn update_password(&self, user: &mut User, password: &str) -> StorageResult<()> {
        let encoded = self.encoder.encode(password)?;
        self.set_user_attribute(user, PASSWORD_ATTRIBUTE, vec![encoded])
            .await
    }
}
