//! User query specification.

use idm_model::{Membership, User};

use super::AttributeFilters;

/// Filter predicates for a user query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserQuery {
    /// Filter by key (exact match).
    pub key: Option<String>,
    /// Filter by first name (exact match).
    pub first_name: Option<String>,
    /// Filter by last name (exact match).
    pub last_name: Option<String>,
    /// Filter by email (exact match).
    pub email: Option<String>,
    /// Filter by enabled status.
    pub enabled: Option<bool>,
    /// Only users holding this role (by key) in some membership.
    pub role: Option<String>,
    /// Only users belonging to this group (by key) in some membership.
    pub group: Option<String>,
    /// Attribute filters.
    pub attributes: AttributeFilters,
    /// Sort by key, ascending when `true`.
    pub sort_ascending: Option<bool>,
}

impl UserQuery {
    /// Creates an unconstrained query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key: None,
            first_name: None,
            last_name: None,
            email: None,
            enabled: None,
            role: None,
            group: None,
            attributes: AttributeFilters::new(),
            sort_ascending: None,
        }
    }

    /// Filters by key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Filters by first name.
    #[must_use]
    pub fn first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Filters by last name.
    #[must_use]
    pub fn last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Filters by email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Filters by enabled status.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Filters by role membership.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Filters by group membership.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Adds an attribute filter.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(name.into(), values);
        self
    }

    /// Requests results sorted by key.
    #[must_use]
    pub const fn sort(mut self, ascending: bool) -> Self {
        self.sort_ascending = Some(ascending);
        self
    }

    /// Returns `true` if any direct-field filter is set.
    #[must_use]
    pub const fn has_field_filter(&self) -> bool {
        self.key.is_some()
            || self.first_name.is_some()
            || self.last_name.is_some()
            || self.email.is_some()
            || self.enabled.is_some()
    }

    /// Returns `true` if a role or group constraint is set.
    #[must_use]
    pub const fn has_relation_filter(&self) -> bool {
        self.role.is_some() || self.group.is_some()
    }

    /// Checks the direct-field predicates against a user.
    #[must_use]
    pub fn matches_fields(&self, user: &User) -> bool {
        eq(self.key.as_deref(), Some(user.key.as_str()))
            && eq(self.first_name.as_deref(), user.first_name.as_deref())
            && eq(self.last_name.as_deref(), user.last_name.as_deref())
            && eq(self.email.as_deref(), user.email.as_deref())
            && self.enabled.is_none_or(|enabled| enabled == user.enabled)
    }

    /// Checks the role and group constraints against a membership.
    #[must_use]
    pub fn matches_membership(&self, membership: &Membership) -> bool {
        eq(self.role.as_deref(), Some(membership.role.as_str()))
            && eq(self.group.as_deref(), Some(membership.group.as_str()))
    }
}

/// An unset filter matches anything; a set filter needs an equal value.
pub(crate) fn eq(filter: Option<&str>, actual: Option<&str>) -> bool {
    filter.is_none_or(|expected| actual == Some(expected))
}
