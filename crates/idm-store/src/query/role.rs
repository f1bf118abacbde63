//! Role query specification.

use idm_model::{Membership, Role};

use super::AttributeFilters;
use super::user::eq;

/// Filter predicates for a role query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoleQuery {
    /// Filter by name (exact match).
    pub key: Option<String>,
    /// Only roles held by this user (by key) in some membership.
    pub user: Option<String>,
    /// Only roles bound within this group (by key) in some membership.
    pub group: Option<String>,
    /// Attribute filters.
    pub attributes: AttributeFilters,
    /// Sort by name, ascending when `true`.
    pub sort_ascending: Option<bool>,
}

impl RoleQuery {
    /// Creates an unconstrained query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key: None,
            user: None,
            group: None,
            attributes: AttributeFilters::new(),
            sort_ascending: None,
        }
    }

    /// Filters by name.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Filters by user membership.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
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

    /// Requests results sorted by name.
    #[must_use]
    pub const fn sort(mut self, ascending: bool) -> Self {
        self.sort_ascending = Some(ascending);
        self
    }

    /// Returns `true` if a user or group constraint is set.
    #[must_use]
    pub const fn has_relation_filter(&self) -> bool {
        self.user.is_some() || self.group.is_some()
    }

    /// Checks the direct-field predicates against a role.
    #[must_use]
    pub fn matches_fields(&self, role: &Role) -> bool {
        eq(self.key.as_deref(), Some(role.name.as_str()))
    }

    /// Checks the user and group constraints against a membership.
    #[must_use]
    pub fn matches_membership(&self, membership: &Membership) -> bool {
        eq(self.user.as_deref(), Some(membership.user.as_str()))
            && eq(self.group.as_deref(), Some(membership.group.as_str()))
    }
}
