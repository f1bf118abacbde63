//! Membership query specification.

use idm_model::Membership;

use super::user::eq;

/// Filter predicates for a membership query.
///
/// Any of the three keys may be left unset to mean "any".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MembershipQuery {
    /// Role key.
    pub role: Option<String>,
    /// User key.
    pub user: Option<String>,
    /// Group key.
    pub group: Option<String>,
}

impl MembershipQuery {
    /// Creates an unconstrained query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            role: None,
            user: None,
            group: None,
        }
    }

    /// Filters by role.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Filters by user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Filters by group.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Checks a stored membership against the filters.
    #[must_use]
    pub fn matches(&self, membership: &Membership) -> bool {
        eq(self.role.as_deref(), Some(membership.role.as_str()))
            && eq(self.user.as_deref(), Some(membership.user.as_str()))
            && eq(self.group.as_deref(), Some(membership.group.as_str()))
    }
}
