//! Membership: the ternary association of a role, a user and a group.

use serde::{Deserialize, Serialize};

/// Binds a role to a user within a group.
///
/// Equality is structural over the triple of keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    /// Role key.
    pub role: String,
    /// User key.
    pub user: String,
    /// Group key.
    pub group: String,
}

impl Membership {
    /// Creates a membership triple.
    #[must_use]
    pub fn new(role: impl Into<String>, user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            user: user.into(),
            group: group.into(),
        }
    }

    /// Returns `true` if this membership binds exactly the given keys.
    #[must_use]
    pub fn binds(&self, role: &str, user: &str, group: &str) -> bool {
        self.role == role && self.user == user && self.group == group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        let a = Membership::new("admin", "asaldhana", "Administrators");
        let b = Membership::new("admin", "asaldhana", "Administrators");
        let c = Membership::new("admin", "asaldhana", "Staff");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.binds("admin", "asaldhana", "Administrators"));
        assert!(!a.binds("admin", "asaldhana", "Staff"));
    }
}
