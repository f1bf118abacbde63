//! Conversions between database rows and domain models.

use std::collections::HashMap;

use idm_model::{Attributes, Group, Membership, Role, User};

use crate::entities::{AttributeRow, GroupRow, MembershipRow, RoleRow, UserRow};

/// Converts a user row and its attributes into a domain user.
#[must_use]
pub fn user_from_row(row: UserRow, attributes: Attributes) -> User {
    User {
        key: row.name,
        enabled: row.enabled,
        full_name: row.full_name,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        attributes,
    }
}

/// Converts a group row and its attributes into a domain group.
#[must_use]
pub fn group_from_row(row: GroupRow, attributes: Attributes) -> Group {
    Group {
        name: row.name,
        parent: row.parent,
        attributes,
    }
}

/// Converts a role row and its attributes into a domain role.
#[must_use]
pub fn role_from_row(row: RoleRow, attributes: Attributes) -> Role {
    Role {
        name: row.name,
        attributes,
    }
}

/// Converts a membership row.
#[must_use]
pub fn membership_from_row(row: MembershipRow) -> Membership {
    Membership {
        role: row.role_name,
        user: row.user_name,
        group: row.group_name,
    }
}

/// Groups attribute rows by owner key.
///
/// Rows must be ordered by owner, name and position.
#[must_use]
pub fn attributes_by_owner(rows: Vec<AttributeRow>) -> HashMap<String, Attributes> {
    let mut grouped: HashMap<String, Vec<(String, Vec<String>)>> = HashMap::new();

    for row in rows {
        let entries = grouped.entry(row.owner_key).or_default();
        let same_name = entries.last().is_some_and(|(name, _)| *name == row.name);
        if !same_name {
            entries.push((row.name, Vec::new()));
        }
        if let (Some(value), Some((_, values))) = (row.value, entries.last_mut()) {
            values.push(value);
        }
    }

    grouped
        .into_iter()
        .map(|(owner, entries)| (owner, entries.into_iter().collect()))
        .collect()
}

/// Splits an attribute value list into `(position, value)` rows.
#[must_use]
pub fn attribute_rows(values: &[String]) -> Vec<(i64, Option<&str>)> {
    if values.is_empty() {
        return vec![(crate::entities::EMPTY_LIST_POSITION, None)];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i64::try_from(i).unwrap_or(i64::MAX), Some(v.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(owner: &str, name: &str, position: i64, value: Option<&str>) -> AttributeRow {
        AttributeRow {
            owner_key: owner.to_string(),
            name: name.to_string(),
            position,
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn groups_rows_preserving_value_order() {
        let rows = vec![
            row("u1", "a1", 0, Some("v1")),
            row("u1", "a1", 1, Some("v2")),
            row("u1", "mail", 0, Some("x@example.org")),
            row("u2", "a1", 0, Some("other")),
        ];

        let grouped = attributes_by_owner(rows);

        let u1 = &grouped["u1"];
        assert_eq!(u1.get("a1"), Some(&["v1".to_string(), "v2".to_string()][..]));
        assert_eq!(u1.first("mail"), Some("x@example.org"));
        assert_eq!(grouped["u2"].first("a1"), Some("other"));
    }

    #[test]
    fn empty_list_marker_round_trips() {
        let rows = attribute_rows(&[]);
        assert_eq!(rows, vec![(-1, None)]);

        let grouped = attributes_by_owner(vec![row("u1", "flags", -1, None)]);
        assert_eq!(grouped["u1"].get("flags"), Some(&[][..]));
    }

    #[test]
    fn user_row_conversion() {
        let user = user_from_row(
            UserRow {
                id: 1,
                name: "asaldhana".to_string(),
                full_name: None,
                first_name: Some("Anil".to_string()),
                last_name: Some("Saldhana".to_string()),
                email: Some("myemail@company.com".to_string()),
                enabled: true,
            },
            Attributes::new(),
        );

        assert_eq!(user.key, "asaldhana");
        assert_eq!(user.first_name.as_deref(), Some("Anil"));
    }
}
