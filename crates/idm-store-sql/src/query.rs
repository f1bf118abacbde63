//! SQL composition for query specifications.
//!
//! Direct fields become equality predicates, relational constraints an
//! `EXISTS` over `idm_memberships`, attribute filters an `EXISTS` over
//! `idm_attributes` with a `value IN (...)` set test. The set test only
//! narrows candidates; callers must still check exact value sequences.

use idm_store::{AttributeFilters, GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};
use sqlx::{QueryBuilder, Sqlite};

use crate::entities::OwnerKind;

/// Columns selected for users.
pub const USER_COLUMNS: &str = "u.id, u.name, u.full_name, u.first_name, u.last_name, u.email, u.enabled";
/// Columns selected for groups.
pub const GROUP_COLUMNS: &str = "g.id, g.name, g.parent";
/// Columns selected for roles.
pub const ROLE_COLUMNS: &str = "r.id, r.name";
/// Columns selected for memberships.
pub const MEMBERSHIP_COLUMNS: &str = "m.id, m.role_name, m.user_name, m.group_name";

/// Builds the user query. `range` is pushed as `LIMIT/OFFSET`.
#[must_use]
pub fn select_users(query: &UserQuery, range: Range) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM idm_users u WHERE 1 = 1"));

    if let Some(key) = &query.key {
        qb.push(" AND u.name = ").push_bind(key.as_str());
    }
    if let Some(first_name) = &query.first_name {
        qb.push(" AND u.first_name = ").push_bind(first_name.as_str());
    }
    if let Some(last_name) = &query.last_name {
        qb.push(" AND u.last_name = ").push_bind(last_name.as_str());
    }
    if let Some(email) = &query.email {
        qb.push(" AND u.email = ").push_bind(email.as_str());
    }
    if let Some(enabled) = query.enabled {
        qb.push(" AND u.enabled = ").push_bind(enabled);
    }

    if query.has_relation_filter() {
        qb.push(" AND EXISTS (SELECT 1 FROM idm_memberships m WHERE m.user_name = u.name");
        if let Some(role) = &query.role {
            qb.push(" AND m.role_name = ").push_bind(role.as_str());
        }
        if let Some(group) = &query.group {
            qb.push(" AND m.group_name = ").push_bind(group.as_str());
        }
        qb.push(")");
    }

    push_attribute_filters(&mut qb, OwnerKind::User, "u.name", &query.attributes);
    push_order(&mut qb, "u", query.sort_ascending);
    push_range(&mut qb, range);
    qb
}

/// Builds the group query. `range` is pushed as `LIMIT/OFFSET`.
#[must_use]
pub fn select_groups(query: &GroupQuery, range: Range) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT {GROUP_COLUMNS} FROM idm_groups g WHERE 1 = 1"));

    if let Some(key) = &query.key {
        qb.push(" AND g.name = ").push_bind(key.as_str());
    }
    if let Some(parent) = &query.parent {
        qb.push(" AND g.parent = ").push_bind(parent.as_str());
    }

    if query.has_relation_filter() {
        qb.push(" AND EXISTS (SELECT 1 FROM idm_memberships m WHERE m.group_name = g.name");
        if let Some(role) = &query.role {
            qb.push(" AND m.role_name = ").push_bind(role.as_str());
        }
        if let Some(user) = &query.user {
            qb.push(" AND m.user_name = ").push_bind(user.as_str());
        }
        qb.push(")");
    }

    push_attribute_filters(&mut qb, OwnerKind::Group, "g.name", &query.attributes);
    push_order(&mut qb, "g", query.sort_ascending);
    push_range(&mut qb, range);
    qb
}

/// Builds the role query. `range` is pushed as `LIMIT/OFFSET`.
#[must_use]
pub fn select_roles(query: &RoleQuery, range: Range) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::new(format!("SELECT {ROLE_COLUMNS} FROM idm_roles r WHERE 1 = 1"));

    if let Some(key) = &query.key {
        qb.push(" AND r.name = ").push_bind(key.as_str());
    }

    if query.has_relation_filter() {
        qb.push(" AND EXISTS (SELECT 1 FROM idm_memberships m WHERE m.role_name = r.name");
        if let Some(user) = &query.user {
            qb.push(" AND m.user_name = ").push_bind(user.as_str());
        }
        if let Some(group) = &query.group {
            qb.push(" AND m.group_name = ").push_bind(group.as_str());
        }
        qb.push(")");
    }

    push_attribute_filters(&mut qb, OwnerKind::Role, "r.name", &query.attributes);
    push_order(&mut qb, "r", query.sort_ascending);
    push_range(&mut qb, range);
    qb
}

/// Builds the membership query in insertion order.
#[must_use]
pub fn select_memberships(query: &MembershipQuery, range: Range) -> QueryBuilder<'_, Sqlite> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM idm_memberships m WHERE 1 = 1"
    ));

    if let Some(role) = &query.role {
        qb.push(" AND m.role_name = ").push_bind(role.as_str());
    }
    if let Some(user) = &query.user {
        qb.push(" AND m.user_name = ").push_bind(user.as_str());
    }
    if let Some(group) = &query.group {
        qb.push(" AND m.group_name = ").push_bind(group.as_str());
    }

    qb.push(" ORDER BY m.id");
    push_range(&mut qb, range);
    qb
}

/// Largest number of owner keys bound into one attribute fetch. Keeps
/// every statement well below `SQLite`'s host parameter limit.
pub const ATTRIBUTE_CHUNK: usize = 500;

/// Builds the attribute fetch for a set of owners, ordered for
/// [`crate::convert::attributes_by_owner`]. Callers pass at most
/// [`ATTRIBUTE_CHUNK`] keys.
#[must_use]
pub fn select_attributes<'a>(kind: OwnerKind, keys: &'a [String]) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(
        "SELECT owner_key, name, position, value FROM idm_attributes WHERE owner_kind = ",
    );
    qb.push_bind(kind.as_str()).push(" AND owner_key IN (");
    let mut keys_list = qb.separated(", ");
    for key in keys {
        keys_list.push_bind(key.as_str());
    }
    keys_list.push_unseparated(")");
    qb.push(" ORDER BY owner_key, name, position");
    qb
}

fn push_attribute_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    kind: OwnerKind,
    owner_column: &str,
    filters: &'a AttributeFilters,
) {
    for (name, values) in filters {
        qb.push(" AND EXISTS (SELECT 1 FROM idm_attributes a WHERE a.owner_kind = ")
            .push_bind(kind.as_str())
            .push(" AND a.owner_key = ")
            .push(owner_column)
            .push(" AND a.name = ")
            .push_bind(name.as_str());

        if !values.is_empty() {
            qb.push(" AND a.value IN (");
            let mut value_list = qb.separated(", ");
            for value in values {
                value_list.push_bind(value.as_str());
            }
            value_list.push_unseparated(")");
        }
        qb.push(")");
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, alias: &str, sort_ascending: Option<bool>) {
    match sort_ascending {
        Some(true) => qb.push(format!(" ORDER BY {alias}.name ASC")),
        Some(false) => qb.push(format!(" ORDER BY {alias}.name DESC")),
        None => qb.push(format!(" ORDER BY {alias}.id")),
    };
}

fn push_range(qb: &mut QueryBuilder<'_, Sqlite>, range: Range) {
    if range.is_unbounded() {
        return;
    }
    // SQLite treats a negative limit as "no limit"
    let limit = range
        .limit
        .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
    let offset = i64::try_from(range.offset).unwrap_or(i64::MAX);
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
}
