//! Directory identity store implementation.

use async_trait::async_trait;
use idm_model::{Attributes, IdentityType, Membership, User};
use idm_store::query::eval;
use idm_store::{
    AttributeFilters, GroupQuery, IdentityStore, MembershipQuery, Range, RoleQuery, StorageError, StorageResult,
    UserQuery,
};
use tracing::{debug, info, warn};

use crate::client::{DirectoryClient, DirectoryEntry, Modification, Scope};
use crate::config::LdapStoreConfig;
use crate::connection::Ldap3Client;
use crate::dn::{self, CN_RDN, USER_RDN, child_dn};
use crate::entity::{LdapGroup, LdapRole, LdapUser};
use crate::error::LdapStoreError;
use crate::filter::Filter;
use crate::mapper::{
    self, EMAIL, FIRST_NAME, LAST_NAME, MEMBER, OBJECT_CLASS, ROLE_CLASS, ROLE_OCCUPANT, UNICODE_PWD,
    USER_CERTIFICATE_BINARY, USER_CLASS, USER_PASSWORD,
};
use crate::overlay::{OVERLAY_CLASS, OVERLAY_NAME, Overlay, overlay_dn};
use crate::schema::SchemaCache;

/// Entity addressed by an attribute operation.
#[derive(Clone, Copy)]
struct Target<'a> {
    entity_type: &'static str,
    key: &'a str,
    dn: &'a str,
}

impl Target<'_> {
    fn not_found(&self) -> StorageError {
        StorageError::not_found(self.entity_type, self.key)
    }
}

/// Identity store backed by an LDAP directory.
pub struct LdapIdentityStore<C = Ldap3Client> {
    client: C,
    config: LdapStoreConfig,
    schema: SchemaCache,
}

impl<C: std::fmt::Debug> std::fmt::Debug for LdapIdentityStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapIdentityStore")
            .field("client", &self.client)
            .field("user_dn_suffix", &self.config.user_dn_suffix)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl LdapIdentityStore<Ldap3Client> {
    /// Connects to the configured directory.
    ///
    /// ## Errors
    ///
    /// Returns an error if the configuration is invalid or the directory
    /// cannot be reached.
    pub async fn connect(config: LdapStoreConfig) -> StorageResult<Self> {
        let client = Ldap3Client::connect(&config).await?;
        Self::with_client(config, client)
    }
}

impl<C: DirectoryClient> LdapIdentityStore<C> {
    /// Creates a store over an existing directory client.
    ///
    /// ## Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_client(config: LdapStoreConfig, client: C) -> StorageResult<Self> {
        config.validate()?;

        if config.active_directory && config.is_plain_transport() {
            warn!(
                url = %config.url,
                "Active Directory over plain transport: password updates will be rejected"
            );
        }
        if !config.properties.is_empty() {
            debug!(properties = ?config.properties.keys().collect::<Vec<_>>(), "Connection properties");
        }
        info!(
            url = %config.url,
            users = %config.user_dn_suffix,
            groups = %config.group_dn_suffix,
            roles = %config.role_dn_suffix,
            "Directory identity store created"
        );

        let schema = SchemaCache::new(&config.managed_attributes);
        Ok(Self {
            client,
            config,
            schema,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LdapStoreConfig {
        &self.config
    }

    /// Returns the directory client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Returns the schema cache.
    #[must_use]
    pub const fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    // ========================================================================
    // DN Mapping
    // ========================================================================

    /// DN of the user entry for `key`.
    #[must_use]
    pub fn user_dn(&self, key: &str) -> String {
        child_dn(USER_RDN, key, &self.config.user_dn_suffix)
    }

    /// DN of the group entry for `name`.
    #[must_use]
    pub fn group_dn(&self, name: &str) -> String {
        child_dn(CN_RDN, name, &self.config.group_dn_suffix)
    }

    /// DN of the role entry for `name`.
    #[must_use]
    pub fn role_dn(&self, name: &str) -> String {
        child_dn(CN_RDN, name, &self.config.role_dn_suffix)
    }

    fn membership_dn(role: &str, group_dn: &str) -> String {
        child_dn(CN_RDN, role, group_dn)
    }

    fn ensure_below(entity_type: &str, entry_dn: &str, suffix: &str) -> StorageResult<()> {
        if dn::is_below(entry_dn, suffix) {
            Ok(())
        } else {
            Err(StorageError::schema_mismatch(format!(
                "{entity_type} entry '{entry_dn}' is not below '{suffix}'"
            )))
        }
    }

    fn check_user(&self, user: &LdapUser) -> StorageResult<()> {
        Self::ensure_below("User", user.dn(), &self.config.user_dn_suffix)
    }

    fn check_group(&self, group: &LdapGroup) -> StorageResult<()> {
        Self::ensure_below("Group", group.dn(), &self.config.group_dn_suffix)
    }

    fn check_role(&self, role: &LdapRole) -> StorageResult<()> {
        Self::ensure_below("Role", role.dn(), &self.config.role_dn_suffix)
    }

    // ========================================================================
    // Entry Loading
    // ========================================================================

    async fn load_overlay(&self, entity_dn: &str) -> StorageResult<(Overlay, bool)> {
        match self.client.lookup(&overlay_dn(entity_dn)).await? {
            Some(entry) if entry.has_value(OBJECT_CLASS, OVERLAY_CLASS) => {
                Ok((Overlay::from_entry(&entry)?, true))
            }
            Some(entry) => {
                warn!(dn = %entry.dn, "Entry at custom attribute DN is not an overlay, ignoring");
                Ok((Overlay::default(), false))
            }
            None => {
                debug!(dn = entity_dn, "No custom attribute entry");
                Ok((Overlay::default(), false))
            }
        }
    }

    async fn save_overlay(&self, entity_dn: &str, overlay: &Overlay, exists: bool) -> StorageResult<()> {
        let dn = overlay_dn(entity_dn);
        if exists {
            self.client.modify(&dn, vec![overlay.rewrite()?]).await?;
        } else {
            self.client.add(&dn, overlay.new_entry()?).await?;
        }
        Ok(())
    }

    async fn user_from(&self, entry: &DirectoryEntry) -> StorageResult<LdapUser> {
        let (overlay, _) = self.load_overlay(&entry.dn).await?;
        Ok(mapper::user_from_entry(entry, &overlay))
    }

    async fn group_from(&self, entry: &DirectoryEntry) -> StorageResult<LdapGroup> {
        let (overlay, _) = self.load_overlay(&entry.dn).await?;
        let parent = self
            .find_parent(&entry.dn)
            .await?
            .and_then(|parent| dn::rdn_value(&parent.dn));
        Ok(mapper::group_from_entry(entry, parent, &overlay))
    }

    async fn role_from(&self, entry: &DirectoryEntry) -> StorageResult<LdapRole> {
        let (overlay, _) = self.load_overlay(&entry.dn).await?;
        Ok(mapper::role_from_entry(entry, &overlay))
    }

    /// Group entry listing `group_dn` as a member.
    async fn find_parent(&self, group_dn: &str) -> StorageResult<Option<DirectoryEntry>> {
        let filter = Filter::object_class(self.config.group_object_class())
            .and(Filter::equality(MEMBER, group_dn));
        let parents = self
            .client
            .search(&self.config.group_dn_suffix, Scope::Subtree, &filter, &["*"])
            .await?;
        Ok(parents.into_iter().next())
    }

    /// Deletes an entry's children (overlay and memberships), then the
    /// entry. A missing entry is not an error.
    async fn delete_subtree(&self, entry_dn: &str) -> StorageResult<()> {
        let children = self
            .client
            .search(entry_dn, Scope::OneLevel, &Filter::present("objectClass"), &["1.1"])
            .await?;
        for child in &children {
            self.client.delete(&child.dn).await?;
        }

        match self.client.delete(entry_dn).await {
            Ok(()) => {
                debug!(dn = entry_dn, children = children.len(), "Entry removed");
                Ok(())
            }
            Err(e) if e.is_no_such_object() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Equality assertions for attribute filters on managed attributes.
    async fn managed_filter(&self, mut filter: Filter, attributes: &AttributeFilters) -> StorageResult<Filter> {
        for (name, values) in attributes {
            if self.schema.is_managed(&self.client, name).await? {
                for value in values {
                    filter = filter.and(Filter::equality(name.clone(), value.clone()));
                }
            }
        }
        Ok(filter)
    }

    // ========================================================================
    // Attribute Routing
    // ========================================================================

    /// Writes (`Some`) or removes (`None`) an attribute.
    ///
    /// Managed attributes are replaced or deleted on the entry. Custom
    /// attributes are updated in the overlay, after offering the change to
    /// the entry itself; the two writes are not atomic.
    async fn write_attribute(
        &self,
        target: Target<'_>,
        name: &str,
        values: Option<&[String]>,
    ) -> StorageResult<()> {
        if self.schema.is_managed(&self.client, name).await? {
            let change = match values {
                Some(values) => Modification::replace(name, values),
                None => Modification::delete(name, &[]),
            };
            return match self.client.modify(target.dn, vec![change]).await {
                Ok(()) => Ok(()),
                Err(LdapStoreError::NoSuchAttribute(_)) if values.is_none() => Ok(()),
                Err(e) if e.is_no_such_object() => Err(target.not_found()),
                Err(e) => Err(e.into()),
            };
        }

        let (mut overlay, exists) = self.load_overlay(target.dn).await?;
        let notification = match values {
            Some(values) => {
                overlay.attributes.set(name, values.to_vec());
                (!values.is_empty()).then(|| Modification::add(name, values))
            }
            None => {
                overlay.attributes.remove(name);
                Some(Modification::delete(name, &[]))
            }
        };

        if let Some(change) = notification {
            match self.client.modify(target.dn, vec![change]).await {
                Ok(()) => {}
                Err(e) if e.is_no_such_object() => return Err(target.not_found()),
                Err(
                    e @ (LdapStoreError::SchemaViolation { .. }
                    | LdapStoreError::NoSuchAttribute(_)
                    | LdapStoreError::ValueExists(_)),
                ) => {
                    debug!(dn = target.dn, attribute = name, error = %e, "Entry rejected custom attribute");
                }
                Err(e) => return Err(e.into()),
            }
        } else if self.client.lookup(target.dn).await?.is_none() {
            return Err(target.not_found());
        }

        self.save_overlay(target.dn, &overlay, exists).await?;
        debug!(dn = target.dn, attribute = name, removed = values.is_none(), "Custom attribute written");
        Ok(())
    }

    async fn read_attribute(&self, target: Target<'_>, name: &str) -> StorageResult<Option<Vec<String>>> {
        if self.schema.is_managed(&self.client, name).await? {
            let entry = self.client.lookup(target.dn).await?;
            return Ok(entry.and_then(|e| e.values(name).map(<[String]>::to_vec)));
        }
        let (overlay, _) = self.load_overlay(target.dn).await?;
        Ok(overlay.attributes.get(name).map(<[String]>::to_vec))
    }

    /// Looks up the membership entry `dn`, skipping entries of another class.
    async fn membership_entry(&self, dn: &str) -> StorageResult<Option<DirectoryEntry>> {
        Ok(self
            .client
            .lookup(dn)
            .await?
            .filter(|entry| entry.has_value(OBJECT_CLASS, ROLE_CLASS)))
    }

    async fn membership_query_for(
        &self,
        role: Option<&String>,
        user: Option<&String>,
        group: Option<&String>,
    ) -> StorageResult<Vec<Membership>> {
        let mut query = MembershipQuery::new();
        query.role = role.cloned();
        query.user = user.cloned();
        query.group = group.cloned();
        self.query_memberships(&query, Range::all()).await
    }
}

/// Role names that would address a custom-attribute overlay instead of a
/// membership entry.
fn reject_reserved(name: &str) -> StorageResult<()> {
    if name.eq_ignore_ascii_case(OVERLAY_NAME) {
        Err(StorageError::InvalidData(format!(
            "Role name '{name}' is reserved by the directory store"
        )))
    } else {
        Ok(())
    }
}

fn created<'a>(entity_type: &'static str, key: &'a str) -> impl FnOnce(LdapStoreError) -> StorageError + 'a {
    move |err| {
        if err.is_already_exists() {
            StorageError::duplicate(entity_type, "name", key)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl<C: DirectoryClient> IdentityStore for LdapIdentityStore<C> {
    type User = LdapUser;
    type Group = LdapGroup;
    type Role = LdapRole;

    // ========================================================================
    // Users
    // ========================================================================

    async fn create_user(&self, name: &str) -> StorageResult<LdapUser> {
        let dn = self.user_dn(name);
        self.client
            .add(&dn, mapper::new_user_entry(name))
            .await
            .map_err(created("User", name))?;
        debug!(dn = %dn, "User created");

        let user = User::new(name).with_full_name(name).with_last_name(name);
        Ok(LdapUser::new(dn, user))
    }

    async fn get_user(&self, name: &str) -> StorageResult<Option<LdapUser>> {
        match self.client.lookup(&self.user_dn(name)).await? {
            Some(entry) => Ok(Some(self.user_from(&entry).await?)),
            None => Ok(None),
        }
    }

    async fn update_user(&self, user: &LdapUser) -> StorageResult<()> {
        self.check_user(user)?;
        match self
            .client
            .modify(user.dn(), mapper::profile_modifications(user))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_no_such_object() => return Err(StorageError::not_found("User", &user.key)),
            Err(e) => return Err(e.into()),
        }

        let (mut overlay, exists) = self.load_overlay(user.dn()).await?;
        if overlay.is_enabled() != user.enabled {
            overlay.enabled = (!user.enabled).then_some(false);
            self.save_overlay(user.dn(), &overlay, exists).await?;
        }
        debug!(dn = user.dn(), "User updated");
        Ok(())
    }

    async fn remove_user(&self, user: &LdapUser) -> StorageResult<()> {
        self.check_user(user)?;
        self.delete_subtree(user.dn()).await
    }

    // ========================================================================
    // Groups
    // ========================================================================

    async fn create_group(&self, name: &str, parent: Option<&LdapGroup>) -> StorageResult<LdapGroup> {
        if let Some(parent) = parent {
            self.check_group(parent)?;
            if self.client.lookup(parent.dn()).await?.is_none() {
                return Err(StorageError::not_found("Group", &parent.name));
            }
        }

        let dn = self.group_dn(name);
        let attrs = mapper::new_group_entry(
            name,
            self.config.group_object_class(),
            !self.config.active_directory,
        );
        self.client
            .add(&dn, attrs)
            .await
            .map_err(created("Group", name))?;

        let mut group = idm_model::Group::new(name);
        if let Some(parent) = parent {
            self.client
                .modify(parent.dn(), vec![Modification::add(MEMBER, &[dn.clone()])])
                .await?;
            group.parent = Some(parent.name.clone());
        }
        debug!(dn = %dn, parent = ?group.parent, "Group created");
        Ok(LdapGroup::new(dn, group))
    }

    async fn get_group(&self, name: &str) -> StorageResult<Option<LdapGroup>> {
        match self.client.lookup(&self.group_dn(name)).await? {
            Some(entry) => Ok(Some(self.group_from(&entry).await?)),
            None => Ok(None),
        }
    }

    async fn get_group_parent(&self, group: &LdapGroup) -> StorageResult<Option<LdapGroup>> {
        self.check_group(group)?;
        match self.find_parent(group.dn()).await? {
            Some(entry) => Ok(Some(self.group_from(&entry).await?)),
            None => Ok(None),
        }
    }

    async fn remove_group(&self, group: &LdapGroup) -> StorageResult<()> {
        self.check_group(group)?;
        let parent = self.find_parent(group.dn()).await?;
        self.delete_subtree(group.dn()).await?;

        if let Some(parent) = parent {
            let detach = Modification::delete(MEMBER, &[group.dn().to_string()]);
            match self.client.modify(&parent.dn, vec![detach]).await {
                Ok(()) | Err(LdapStoreError::NoSuchAttribute(_) | LdapStoreError::NoSuchObject(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // ========================================================================
    // Roles
    // ========================================================================

    async fn create_role(&self, name: &str) -> StorageResult<LdapRole> {
        reject_reserved(name)?;
        let dn = self.role_dn(name);
        self.client
            .add(&dn, mapper::new_role_entry(name))
            .await
            .map_err(created("Role", name))?;
        debug!(dn = %dn, "Role created");
        Ok(LdapRole::new(dn, idm_model::Role::new(name)))
    }

    async fn get_role(&self, name: &str) -> StorageResult<Option<LdapRole>> {
        match self.client.lookup(&self.role_dn(name)).await? {
            Some(entry) => Ok(Some(self.role_from(&entry).await?)),
            None => Ok(None),
        }
    }

    async fn remove_role(&self, role: &LdapRole) -> StorageResult<()> {
        self.check_role(role)?;
        self.delete_subtree(role.dn()).await
    }

    // ========================================================================
    // Memberships
    // ========================================================================

    async fn create_membership(
        &self,
        role: &LdapRole,
        user: &LdapUser,
        group: &LdapGroup,
    ) -> StorageResult<Membership> {
        self.check_role(role)?;
        self.check_user(user)?;
        self.check_group(group)?;
        reject_reserved(&role.name)?;

        let dn = Self::membership_dn(&role.name, group.dn());
        match self.membership_entry(&dn).await? {
            Some(entry) if entry.has_value(ROLE_OCCUPANT, user.dn()) => {}
            Some(_) => {
                self.client
                    .modify(&dn, vec![Modification::add(ROLE_OCCUPANT, &[user.dn().to_string()])])
                    .await?;
            }
            None => {
                self.client
                    .add(&dn, mapper::new_membership_entry(&role.name, user.dn()))
                    .await?;
            }
        }
        debug!(dn = %dn, user = user.dn(), "Membership created");
        Ok(Membership::new(&role.name, &user.key, &group.name))
    }

    async fn get_membership(
        &self,
        role: &LdapRole,
        user: &LdapUser,
        group: &LdapGroup,
    ) -> StorageResult<Option<Membership>> {
        self.check_role(role)?;
        self.check_user(user)?;
        self.check_group(group)?;

        let dn = Self::membership_dn(&role.name, group.dn());
        let bound = self
            .membership_entry(&dn)
            .await?
            .is_some_and(|entry| entry.has_value(ROLE_OCCUPANT, user.dn()));
        Ok(bound.then(|| Membership::new(&role.name, &user.key, &group.name)))
    }

    async fn remove_membership(
        &self,
        role: &LdapRole,
        user: &LdapUser,
        group: &LdapGroup,
    ) -> StorageResult<()> {
        self.check_role(role)?;
        self.check_user(user)?;
        self.check_group(group)?;

        let dn = Self::membership_dn(&role.name, group.dn());
        let Some(entry) = self.membership_entry(&dn).await? else {
            return Ok(());
        };
        let occupants = entry.values(ROLE_OCCUPANT).unwrap_or_default();
        let Some(stored) = occupants.iter().find(|o| dn::same_dn(o, user.dn())) else {
            return Ok(());
        };

        if occupants.len() == 1 {
            self.client.delete(&dn).await?;
        } else {
            self.client
                .modify(&dn, vec![Modification::delete(ROLE_OCCUPANT, &[stored.clone()])])
                .await?;
        }
        debug!(dn = %dn, user = user.dn(), "Membership removed");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn query_users(&self, query: &UserQuery, range: Range) -> StorageResult<Vec<LdapUser>> {
        let mut filter = Filter::object_class(USER_CLASS);
        for (attr, value) in [
            (USER_RDN, &query.key),
            (FIRST_NAME, &query.first_name),
            (LAST_NAME, &query.last_name),
            (EMAIL, &query.email),
        ] {
            if let Some(value) = value {
                filter = filter.and(Filter::equality(attr, value.clone()));
            }
        }
        let filter = self.managed_filter(filter, &query.attributes).await?;

        let entries = self
            .client
            .search(&self.config.user_dn_suffix, Scope::Subtree, &filter, &["*"])
            .await?;
        let mut users = Vec::with_capacity(entries.len());
        for entry in &entries {
            users.push(self.user_from(entry).await?);
        }

        users.retain(|u| query.matches_fields(u));
        if query.has_relation_filter() {
            let memberships = self
                .membership_query_for(query.role.as_ref(), None, query.group.as_ref())
                .await?;
            eval::retain_related(
                &mut users,
                &memberships,
                |m| query.matches_membership(m),
                |m| m.user.as_str(),
            );
        }
        eval::retain_attributes(&mut users, &query.attributes);

        debug!(filter = %filter, results = users.len(), "User query evaluated");
        Ok(eval::finish(users, query.sort_ascending, range))
    }

    async fn query_groups(&self, query: &GroupQuery, range: Range) -> StorageResult<Vec<LdapGroup>> {
        let mut filter = Filter::object_class(self.config.group_object_class());
        if let Some(key) = &query.key {
            filter = filter.and(Filter::equality(CN_RDN, key.clone()));
        }
        let filter = self.managed_filter(filter, &query.attributes).await?;

        let entries = self
            .client
            .search(&self.config.group_dn_suffix, Scope::OneLevel, &filter, &["*"])
            .await?;
        let mut groups = Vec::with_capacity(entries.len());
        for entry in &entries {
            groups.push(self.group_from(entry).await?);
        }

        groups.retain(|g| query.matches_fields(g));
        if query.has_relation_filter() {
            let memberships = self
                .membership_query_for(query.role.as_ref(), query.user.as_ref(), None)
                .await?;
            eval::retain_related(
                &mut groups,
                &memberships,
                |m| query.matches_membership(m),
                |m| m.group.as_str(),
            );
        }
        eval::retain_attributes(&mut groups, &query.attributes);

        debug!(filter = %filter, results = groups.len(), "Group query evaluated");
        Ok(eval::finish(groups, query.sort_ascending, range))
    }

    async fn query_roles(&self, query: &RoleQuery, range: Range) -> StorageResult<Vec<LdapRole>> {
        let mut filter = Filter::object_class(ROLE_CLASS);
        if let Some(key) = &query.key {
            filter = filter.and(Filter::equality(CN_RDN, key.clone()));
        }
        let filter = self.managed_filter(filter, &query.attributes).await?;

        let entries = self
            .client
            .search(&self.config.role_dn_suffix, Scope::OneLevel, &filter, &["*"])
            .await?;
        let mut roles = Vec::with_capacity(entries.len());
        for entry in &entries {
            roles.push(self.role_from(entry).await?);
        }

        roles.retain(|r| query.matches_fields(r));
        if query.has_relation_filter() {
            let memberships = self
                .membership_query_for(None, query.user.as_ref(), query.group.as_ref())
                .await?;
            eval::retain_related(
                &mut roles,
                &memberships,
                |m| query.matches_membership(m),
                |m| m.role.as_str(),
            );
        }
        eval::retain_attributes(&mut roles, &query.attributes);

        debug!(filter = %filter, results = roles.len(), "Role query evaluated");
        Ok(eval::finish(roles, query.sort_ascending, range))
    }

    async fn query_memberships(
        &self,
        query: &MembershipQuery,
        range: Range,
    ) -> StorageResult<Vec<Membership>> {
        let (base, scope) = match &query.group {
            Some(group) => (self.group_dn(group), Scope::OneLevel),
            None => (self.config.group_dn_suffix.clone(), Scope::Subtree),
        };
        let mut filter = Filter::object_class(ROLE_CLASS);
        if let Some(role) = &query.role {
            filter = filter.and(Filter::equality(CN_RDN, role.clone()));
        }
        if let Some(user) = &query.user {
            filter = filter.and(Filter::equality(ROLE_OCCUPANT, self.user_dn(user)));
        }

        let entries = self
            .client
            .search(&base, scope, &filter, &[CN_RDN, ROLE_OCCUPANT])
            .await?;

        let mut memberships = Vec::new();
        for entry in &entries {
            let Some(group_dn) = dn::parent_dn(&entry.dn) else {
                continue;
            };
            if !dn::is_child_of(group_dn, &self.config.group_dn_suffix) {
                continue;
            }
            let (Some(role), Some(group)) = (dn::rdn_value(&entry.dn), dn::rdn_value(group_dn)) else {
                continue;
            };

            let occupants = entry.values(ROLE_OCCUPANT).unwrap_or_default();
            for occupant in occupants {
                if !dn::is_child_of(occupant, &self.config.user_dn_suffix) {
                    continue;
                }
                if let Some(user) = dn::rdn_value(occupant) {
                    let membership = Membership::new(role.clone(), user, group.clone());
                    if query.matches(&membership) {
                        memberships.push(membership);
                    }
                }
            }
        }

        Ok(range.apply(memberships))
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    async fn set_user_attribute(&self, user: &mut LdapUser, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.check_user(user)?;
        let target = Target {
            entity_type: "User",
            key: &user.key,
            dn: user.dn(),
        };
        self.write_attribute(target, name, Some(&values)).await?;
        user.attributes.set(name, values);
        Ok(())
    }

    async fn remove_user_attribute(&self, user: &mut LdapUser, name: &str) -> StorageResult<()> {
        self.check_user(user)?;
        let target = Target {
            entity_type: "User",
            key: &user.key,
            dn: user.dn(),
        };
        self.write_attribute(target, name, None).await?;
        user.attributes.remove(name);
        Ok(())
    }

    async fn user_attribute_values(&self, user: &LdapUser, name: &str) -> StorageResult<Option<Vec<String>>> {
        self.check_user(user)?;
        let target = Target {
            entity_type: "User",
            key: &user.key,
            dn: user.dn(),
        };
        self.read_attribute(target, name).await
    }

    async fn user_attributes(&self, user: &LdapUser) -> StorageResult<Attributes> {
        self.check_user(user)?;
        match self.client.lookup(user.dn()).await? {
            Some(entry) => Ok(self.user_from(&entry).await?.attributes().clone()),
            None => Ok(Attributes::new()),
        }
    }

    async fn set_group_attribute(&self, group: &mut LdapGroup, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.check_group(group)?;
        let target = Target {
            entity_type: "Group",
            key: &group.name,
            dn: group.dn(),
        };
        self.write_attribute(target, name, Some(&values)).await?;
        group.attributes.set(name, values);
        Ok(())
    }

    async fn remove_group_attribute(&self, group: &mut LdapGroup, name: &str) -> StorageResult<()> {
        self.check_group(group)?;
        let target = Target {
            entity_type: "Group",
            key: &group.name,
            dn: group.dn(),
        };
        self.write_attribute(target, name, None).await?;
        group.attributes.remove(name);
        Ok(())
    }

    async fn group_attribute_values(&self, group: &LdapGroup, name: &str) -> StorageResult<Option<Vec<String>>> {
        self.check_group(group)?;
        let target = Target {
            entity_type: "Group",
            key: &group.name,
            dn: group.dn(),
        };
        self.read_attribute(target, name).await
    }

    async fn group_attributes(&self, group: &LdapGroup) -> StorageResult<Attributes> {
        self.check_group(group)?;
        match self.client.lookup(group.dn()).await? {
            Some(entry) => {
                let (overlay, _) = self.load_overlay(group.dn()).await?;
                Ok(mapper::group_from_entry(&entry, None, &overlay).attributes().clone())
            }
            None => Ok(Attributes::new()),
        }
    }

    async fn set_role_attribute(&self, role: &mut LdapRole, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.check_role(role)?;
        let target = Target {
            entity_type: "Role",
            key: &role.name,
            dn: role.dn(),
        };
        self.write_attribute(target, name, Some(&values)).await?;
        role.attributes.set(name, values);
        Ok(())
    }

    async fn remove_role_attribute(&self, role: &mut LdapRole, name: &str) -> StorageResult<()> {
        self.check_role(role)?;
        let target = Target {
            entity_type: "Role",
            key: &role.name,
            dn: role.dn(),
        };
        self.write_attribute(target, name, None).await?;
        role.attributes.remove(name);
        Ok(())
    }

    async fn role_attribute_values(&self, role: &LdapRole, name: &str) -> StorageResult<Option<Vec<String>>> {
        self.check_role(role)?;
        let target = Target {
            entity_type: "Role",
            key: &role.name,
            dn: role.dn(),
        };
        self.read_attribute(target, name).await
    }

    async fn role_attributes(&self, role: &LdapRole) -> StorageResult<Attributes> {
        self.check_role(role)?;
        match self.client.lookup(role.dn()).await? {
            Some(entry) => Ok(self.role_from(&entry).await?.attributes().clone()),
            None => Ok(Attributes::new()),
        }
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    async fn validate_password(&self, user: &LdapUser, password: &str) -> StorageResult<bool> {
        self.check_user(user)?;
        let filter = Filter::object_class(USER_CLASS).and(Filter::equality(USER_RDN, user.key.clone()));
        let valid = self
            .client
            .verify_credentials(&self.config.user_dn_suffix, &filter, password)
            .await?;
        debug!(dn = user.dn(), valid, "Password validated");
        Ok(valid)
    }

    async fn update_password(&self, user: &mut LdapUser, password: &str) -> StorageResult<()> {
        self.check_user(user)?;
        let change = if self.config.active_directory {
            Modification::Replace(UNICODE_PWD.to_string(), vec![mapper::unicode_pwd(password)])
        } else {
            Modification::replace(USER_PASSWORD, &[password.to_string()])
        };

        match self.client.modify(user.dn(), vec![change]).await {
            Ok(()) => {
                debug!(dn = user.dn(), "Password updated");
                Ok(())
            }
            Err(e) if e.is_no_such_object() => Err(StorageError::not_found("User", &user.key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_certificate(&self, user: &mut LdapUser, der: &[u8]) -> StorageResult<()> {
        self.check_user(user)?;
        let change = Modification::Replace(USER_CERTIFICATE_BINARY.to_string(), vec![der.to_vec()]);
        match self.client.modify(user.dn(), vec![change]).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_no_such_object() => Err(StorageError::not_found("User", &user.key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn validate_certificate(&self, user: &LdapUser, der: &[u8]) -> StorageResult<bool> {
        self.check_user(user)?;
        let Some(entry) = self.client.lookup(user.dn()).await? else {
            return Ok(false);
        };
        let binary = entry
            .binary_values(USER_CERTIFICATE_BINARY)
            .is_some_and(|values| values.iter().any(|v| v.as_slice() == der));
        let text = entry
            .values(USER_CERTIFICATE_BINARY)
            .is_some_and(|values| values.iter().any(|v| v.as_bytes() == der));
        Ok(binary || text)
    }
}
