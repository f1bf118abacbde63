//! In-process query evaluation.
//!
//! Building blocks for stores that filter candidates in memory. Evaluation
//! runs in this order:
//!
//! 1. direct-field predicates;
//! 2. if that leaves nothing and a relational or attribute constraint is
//!    present, the full candidate set is restored;
//! 3. relational constraints through memberships;
//! 4. exact attribute filters;
//! 5. optional sort by key, then the pagination window.

use std::collections::HashSet;

use idm_model::{Attributes, IdentityType, Membership};

use super::{AttributeFilters, Range};

/// Applies direct-field predicates, falling back to every candidate when
/// nothing matched and relational or attribute filters are about to be
/// applied.
pub fn filter_fields<T, F>(candidates: Vec<T>, has_later_filters: bool, predicate: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let matched: Vec<T> = candidates.iter().filter(|c| predicate(c)).cloned().collect();
    if matched.is_empty() && has_later_filters {
        candidates
    } else {
        matched
    }
}

/// Keeps candidates whose key is bound by at least one membership accepted
/// by `accept`. `key_of` picks the side of the triple the candidates are on.
pub fn retain_related<T, A, K>(
    candidates: &mut Vec<T>,
    memberships: &[Membership],
    accept: A,
    key_of: K,
) where
    T: IdentityType,
    A: Fn(&Membership) -> bool,
    K: Fn(&Membership) -> &str,
{
    let related: HashSet<&str> = memberships
        .iter()
        .filter(|m| accept(m))
        .map(&key_of)
        .collect();
    candidates.retain(|c| related.contains(c.key()));
}

/// Returns `true` if every filter's value sequence equals the bag's.
#[must_use]
pub fn attributes_match(attributes: &Attributes, filters: &AttributeFilters) -> bool {
    filters
        .iter()
        .all(|(name, expected)| attributes.matches_exactly(name, expected))
}

/// Keeps candidates satisfying every attribute filter.
pub fn retain_attributes<T: IdentityType>(candidates: &mut Vec<T>, filters: &AttributeFilters) {
    if filters.is_empty() {
        return;
    }
    candidates.retain(|c| attributes_match(c.attributes(), filters));
}

/// Drops repeated keys, keeping the first occurrence.
pub fn dedup_by_key<T: IdentityType>(candidates: &mut Vec<T>) {
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.key().to_string()));
}

/// Sorts by key when requested, then applies the window.
#[must_use]
pub fn finish<T: IdentityType>(mut results: Vec<T>, sort_ascending: Option<bool>, range: Range) -> Vec<T> {
    if let Some(ascending) = sort_ascending {
        results.sort_by(|a, b| a.key().cmp(b.key()));
        if !ascending {
            results.reverse();
        }
    }
    range.apply(results)
}
