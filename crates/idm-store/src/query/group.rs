//! Group query specification.

use idm_model::{Group, Membership};

use super::AttributeFilters;
use super::user::eq;

/// Filter predicates for a group query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupQuery {
    /// Filter by name (exact match).
    pub key: Option<String>,
    /// Filter by parent group key.
    pub parent: Option<String>,
    /// Only groups binding this role (by key) in some membership.
    pub role: Option<String>,
    /// Only groups containing this user (by key) in some membership.
    pub user: Option<String>,
    /// Attribute filters.
    pub attributes: AttributeFilters,
    /// Sort by name, ascending when `true`.
    pub sort_ascending: Option<bool>,
}

impl GroupQuery {
    /// Creates an unconstrained query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key: None,
            parent: None,
            role: None,
            user: None,
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

    /// Filters by parent group.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Filters by role membership.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Filters by user membership.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
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

    /// Returns `true` if a role or user constraint is set.
    #[must_use]
    pub const fn has_relation_filter(&self) -> bool {
        self.role.is_some() || self.user.is_some()
    }

    /// Checks the direct-field predicates against a group.
    #[must_use]
    pub fn matches_fields(&self, group: &Group) -> bool {
        eq(self.key.as_deref(), Some(group.name.as_str()))
            && eq(self.parent.as_deref(), group.parent.as_deref())
    }

    /// Checks the role and user constraints against a membership.
    #[must_use]
    pub fn matches_membership(&self, membership: &Membership) -> bool {
        eq(self.role.as_deref(), Some(membership.role.as_str()))
            && eq(self.user.as_deref(), Some(membership.user.as_str()))
    }
}
