//! Linear-scan query engine over collection snapshots.

use idm_model::{Group, Membership, Role, User};
use idm_store::query::eval;
use idm_store::{GroupQuery, MembershipQuery, Range, RoleQuery, UserQuery};

/// Evaluates a user query.
#[must_use]
pub fn users(candidates: Vec<User>, memberships: &[Membership], query: &UserQuery, range: Range) -> Vec<User> {
    let relational = query.has_relation_filter();
    let fallback = relational || !query.attributes.is_empty();
    let mut results = eval::filter_fields(candidates, fallback, |u| query.matches_fields(u));
    if relational {
        eval::retain_related(
            &mut results,
            memberships,
            |m| query.matches_membership(m),
            |m| m.user.as_str(),
        );
    }
    eval::retain_attributes(&mut results, &query.attributes);
    eval::finish(results, query.sort_ascending, range)
}

/// Evaluates a group query.
#[must_use]
pub fn groups(
    candidates: Vec<Group>,
    memberships: &[Membership],
    query: &GroupQuery,
    range: Range,
) -> Vec<Group> {
    let relational = query.has_relation_filter();
    let fallback = relational || !query.attributes.is_empty();
    let mut results = eval::filter_fields(candidates, fallback, |g| query.matches_fields(g));
    if relational {
        eval::retain_related(
            &mut results,
            memberships,
            |m| query.matches_membership(m),
            |m| m.group.as_str(),
        );
    }
    eval::retain_attributes(&mut results, &query.attributes);
    eval::finish(results, query.sort_ascending, range)
}

/// Evaluates a role query.
#[must_use]
pub fn roles(candidates: Vec<Role>, memberships: &[Membership], query: &RoleQuery, range: Range) -> Vec<Role> {
    let relational = query.has_relation_filter();
    let fallback = relational || !query.attributes.is_empty();
    let mut results = eval::filter_fields(candidates, fallback, |r| query.matches_fields(r));
    if relational {
        eval::retain_related(
            &mut results,
            memberships,
            |m| query.matches_membership(m),
            |m| m.role.as_str(),
        );
    }
    eval::retain_attributes(&mut results, &query.attributes);
    eval::finish(results, query.sort_ascending, range)
}

/// Evaluates a membership query. Results keep insertion order.
#[must_use]
pub fn memberships(candidates: &[Membership], query: &MembershipQuery, range: Range) -> Vec<Membership> {
    let matched = candidates
        .iter()
        .filter(|m| query.matches(m))
        .cloned()
        .collect();
    range.apply(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Vec<User>, Vec<Membership>) {
        let users = vec![
            User::new("asaldhana").with_email("myemail@company.com"),
            User::new("jdoe").with_email("jdoe@company.com"),
            User::new("guest"),
        ];
        let memberships = vec![
            Membership::new("admin", "asaldhana", "Administrators"),
            Membership::new("admin", "jdoe", "Staff"),
            Membership::new("viewer", "guest", "Staff"),
        ];
        (users, memberships)
    }

    fn keys(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.key.as_str()).collect()
    }

    #[test]
    fn role_filter_joins_through_memberships() {
        let (users, memberships) = fixture();
        let result = super::users(users, &memberships, &UserQuery::new().role("admin"), Range::all());
        assert_eq!(keys(&result), vec!["asaldhana", "jdoe"]);
    }

    #[test]
    fn role_and_group_must_hold_in_one_membership() {
        let (users, memberships) = fixture();
        let query = UserQuery::new().role("admin").group("Staff");
        let result = super::users(users, &memberships, &query, Range::all());
        assert_eq!(keys(&result), vec!["jdoe"]);
    }

    #[test]
    fn key_miss_with_role_falls_back_to_role_members() {
        let (users, memberships) = fixture();
        let query = UserQuery::new().key("nobody").role("viewer");
        let result = super::users(users, &memberships, &query, Range::all());
        assert_eq!(keys(&result), vec!["guest"]);
    }

    #[test]
    fn key_miss_alone_is_empty() {
        let (users, memberships) = fixture();
        let result = super::users(users, &memberships, &UserQuery::new().key("nobody"), Range::all());
        assert!(result.is_empty());
    }

    #[test]
    fn key_miss_with_attribute_falls_back_to_attribute_match() {
        let (mut users, memberships) = fixture();
        users[1].attributes.set("QuestionTotal", vec!["2".into()]);
        let query = UserQuery::new()
            .key("nobody")
            .attribute("QuestionTotal", vec!["2".to_string()]);
        let result = super::users(users, &memberships, &query, Range::all());
        assert_eq!(keys(&result), vec!["jdoe"]);
    }

    #[test]
    fn groups_by_user() {
        let groups = vec![Group::new("Administrators"), Group::new("Staff")];
        let (_, memberships) = fixture();
        let result = super::groups(groups, &memberships, &GroupQuery::new().user("guest"), Range::all());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Staff");
    }

    #[test]
    fn roles_by_group_are_distinct() {
        let roles = vec![Role::new("admin"), Role::new("viewer"), Role::new("unused")];
        let (_, memberships) = fixture();
        let result = super::roles(roles, &memberships, &RoleQuery::new().group("Staff"), Range::all());
        let names: Vec<&str> = result.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "viewer"]);
    }

    #[test]
    fn memberships_filter_and_page() {
        let (_, memberships) = fixture();
        let result = super::memberships(&memberships, &MembershipQuery::new().group("Staff"), Range::new(1, 5));
        assert_eq!(result, vec![Membership::new("viewer", "guest", "Staff")]);
    }
}
