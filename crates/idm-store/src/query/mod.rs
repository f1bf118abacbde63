//! Query specifications.
//!
//! Each entity type has a builder describing optional filter predicates.
//! Unset fields place no constraint; set fields are ANDed. Attribute
//! filters require the candidate's value sequence for a name to equal the
//! requested sequence exactly.

pub mod eval;
pub mod group;
pub mod membership;
pub mod role;
pub mod user;

use std::collections::BTreeMap;

pub use group::GroupQuery;
pub use membership::MembershipQuery;
pub use role::RoleQuery;
pub use user::UserQuery;

/// Attribute filters: attribute name to the exact value sequence required.
pub type AttributeFilters = BTreeMap<String, Vec<String>>;

/// Pagination window applied to query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    /// Number of results to skip.
    pub offset: usize,
    /// Maximum number of results to return.
    pub limit: Option<usize>,
}

impl Range {
    /// A window covering every result.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            offset: 0,
            limit: None,
        }
    }

    /// A window of at most `limit` results starting at `offset`.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Returns `true` if the window does not restrict results.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    /// Applies the window to an ordered result list.
    #[must_use]
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_unbounded() {
            return items;
        }
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_all_keeps_everything() {
        let items = vec![1, 2, 3];
        assert_eq!(Range::all().apply(items), vec![1, 2, 3]);
    }

    #[test]
    fn range_slices_window() {
        assert_eq!(Range::new(1, 2).apply(vec![1, 2, 3, 4]), vec![2, 3]);
        assert_eq!(Range::new(3, 10).apply(vec![1, 2, 3, 4]), vec![4]);
        assert!(Range::new(5, 1).apply(vec![1, 2]).is_empty());
    }

    #[test]
    fn offset_without_limit() {
        let range = Range {
            offset: 2,
            limit: None,
        };
        assert!(!range.is_unbounded());
        assert_eq!(range.apply(vec!["a", "b", "c"]), vec!["c"]);
    }
}
