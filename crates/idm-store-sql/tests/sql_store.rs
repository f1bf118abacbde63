//! Relational store behavior through the identity manager.

mod common;

use std::sync::Arc;

use common::{manager, open_store, values};
use idm_auth::SaltedDigestEncoder;
use idm_store::{GroupQuery, IdentityStore, MembershipQuery, Range, RoleQuery, UserQuery};
use idm_store_sql::query::ATTRIBUTE_CHUNK;
use idm_store_sql::{PoolConfig, SqlIdentityStore};

#[tokio::test]
async fn get_after_create_returns_same_key() {
    let idm = manager().await;

    idm.create_user("asaldhana").await.unwrap();
    idm.create_group("Administrators", None).await.unwrap();
    idm.create_role("admin").await.unwrap();

    let user = idm.get_user("asaldhana").await.unwrap().unwrap();
    assert_eq!(user.key, "asaldhana");
    assert!(user.enabled);
    assert_eq!(
        idm.get_group("Administrators").await.unwrap().unwrap().name,
        "Administrators"
    );
    assert_eq!(idm.get_role("admin").await.unwrap().unwrap().name, "admin");
    assert!(idm.get_user("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn get_after_remove_is_absent() {
    let idm = manager().await;

    let mut user = idm.create_user("u").await.unwrap();
    idm.set_user_attribute(&mut user, "mail", values(&["u@example.org"]))
        .await
        .unwrap();
    let group = idm.create_group("g", None).await.unwrap();
    let role = idm.create_role("r").await.unwrap();

    idm.remove_user(&user).await.unwrap();
    idm.remove_group(&group).await.unwrap();
    idm.remove_role(&role).await.unwrap();

    assert!(idm.get_user("u").await.unwrap().is_none());
    assert!(idm.get_group("g").await.unwrap().is_none());
    assert!(idm.get_role("r").await.unwrap().is_none());

    // Attribute rows go with the entity
    let recreated = idm.create_user("u").await.unwrap();
    assert!(idm.user_attributes(&recreated).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_keys_are_rejected() {
    let idm = manager().await;

    idm.create_user("asaldhana").await.unwrap();
    assert!(idm.create_user("asaldhana").await.unwrap_err().is_duplicate());

    idm.create_group("Administrators", None).await.unwrap();
    assert!(
        idm.create_group("Administrators", None)
            .await
            .unwrap_err()
            .is_duplicate()
    );

    idm.create_role("admin").await.unwrap();
    assert!(idm.create_role("admin").await.unwrap_err().is_duplicate());
}

#[tokio::test]
async fn update_user_persists_profile() {
    let idm = manager().await;

    let mut user = idm.create_user("asaldhana").await.unwrap();
    user.set_first_name("Anil");
    user.set_last_name("Saldhana");
    user.set_enabled(false);
    idm.update_user(&user).await.unwrap();

    let stored = idm.get_user("asaldhana").await.unwrap().unwrap();
    assert_eq!(stored.first_name.as_deref(), Some("Anil"));
    assert_eq!(stored.last_name.as_deref(), Some("Saldhana"));
    assert!(!stored.enabled);

    let ghost = idm_model::User::new("ghost");
    assert!(idm.update_user(&ghost).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn attribute_round_trip_preserves_order() {
    let idm = manager().await;

    let mut user = idm.create_user("u").await.unwrap();
    idm.set_user_attribute(&mut user, "a1", values(&["v3", "v1", "v2"]))
        .await
        .unwrap();
    idm.set_user_attribute(&mut user, "flags", Vec::new())
        .await
        .unwrap();

    assert_eq!(
        idm.user_attribute_values(&user, "a1").await.unwrap(),
        Some(values(&["v3", "v1", "v2"]))
    );
    assert_eq!(idm.user_attribute_values(&user, "flags").await.unwrap(), Some(Vec::new()));

    let reloaded = idm.get_user("u").await.unwrap().unwrap();
    assert_eq!(reloaded.attributes, user.attributes);

    idm.set_user_attribute(&mut user, "a1", values(&["only"]))
        .await
        .unwrap();
    assert_eq!(
        idm.user_attribute_values(&user, "a1").await.unwrap(),
        Some(values(&["only"]))
    );

    idm.remove_user_attribute(&mut user, "a1").await.unwrap();
    assert_eq!(idm.user_attribute_values(&user, "a1").await.unwrap(), None);
    assert!(user.attributes.get("a1").is_none());
}

#[tokio::test]
async fn attributes_on_missing_entity_fail() {
    let idm = manager().await;

    let mut role = idm.create_role("r").await.unwrap();
    idm.remove_role(&role).await.unwrap();

    let err = idm
        .set_role_attribute(&mut role, "level", values(&["3"]))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn group_and_role_attributes() {
    let idm = manager().await;

    let mut group = idm.create_group("g", None).await.unwrap();
    let mut role = idm.create_role("r").await.unwrap();

    idm.set_group_attribute(&mut group, "location", values(&["HQ"]))
        .await
        .unwrap();
    idm.set_role_attribute(&mut role, "level", values(&["3"]))
        .await
        .unwrap();

    assert_eq!(
        idm.group_attribute_values(&group, "location").await.unwrap(),
        Some(values(&["HQ"]))
    );
    assert_eq!(idm.role_attributes(&role).await.unwrap().first("level"), Some("3"));

    idm.remove_group_attribute(&mut group, "location").await.unwrap();
    idm.remove_role_attribute(&mut role, "level").await.unwrap();
    assert!(idm.group_attributes(&group).await.unwrap().is_empty());
    assert_eq!(idm.role_attribute_values(&role, "level").await.unwrap(), None);
}

#[tokio::test]
async fn attribute_filter_needs_exact_sequence() {
    let idm = manager().await;

    let mut user = idm.create_user("u").await.unwrap();
    idm.set_user_attribute(&mut user, "a1", values(&["v1", "v2", "v3"]))
        .await
        .unwrap();
    let mut other = idm.create_user("other").await.unwrap();
    idm.set_user_attribute(&mut other, "a1", values(&["v1", "v2"]))
        .await
        .unwrap();

    let exact = UserQuery::new().attribute("a1", values(&["v1", "v2", "v3"]));
    let found = idm.query_users(&exact, Range::all()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key, "u");

    let subset = UserQuery::new().attribute("a1", values(&["v1", "v2"]));
    let found = idm.query_users(&subset, Range::all()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key, "other");

    let reordered = UserQuery::new().attribute("a1", values(&["v3", "v2", "v1"]));
    assert!(idm.query_users(&reordered, Range::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn membership_queries_by_role() {
    let idm = manager().await;

    let admin = idm.create_role("admin").await.unwrap();
    let viewer = idm.create_role("viewer").await.unwrap();
    let g1 = idm.create_group("G1", None).await.unwrap();
    let g2 = idm.create_group("G2", None).await.unwrap();
    let a = idm.create_user("a").await.unwrap();
    let b = idm.create_user("b").await.unwrap();
    let c = idm.create_user("c").await.unwrap();

    idm.create_membership(&admin, &a, &g1).await.unwrap();
    idm.create_membership(&admin, &b, &g2).await.unwrap();
    idm.create_membership(&viewer, &c, &g1).await.unwrap();

    let users = idm
        .query_users(&UserQuery::new().role("admin"), Range::all())
        .await
        .unwrap();
    let keys: Vec<&str> = users.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b"]);

    let users = idm
        .query_users(&UserQuery::new().role("admin").group("G1"), Range::all())
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].key, "a");

    let groups = idm
        .query_groups(&GroupQuery::new().role("admin").sort(true), Range::all())
        .await
        .unwrap();
    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["G1", "G2"]);

    let roles = idm
        .query_roles(&RoleQuery::new().group("G1"), Range::all())
        .await
        .unwrap();
    assert_eq!(roles.len(), 2);

    let bound = idm
        .query_memberships(&MembershipQuery::new().role("admin"), Range::all())
        .await
        .unwrap();
    assert_eq!(bound.len(), 2);
    assert!(bound[0].binds("admin", "a", "G1"));
}

#[tokio::test]
async fn key_miss_with_role_filter_is_empty() {
    let idm = manager().await;

    let admin = idm.create_role("admin").await.unwrap();
    let group = idm.create_group("G", None).await.unwrap();
    let user = idm.create_user("a").await.unwrap();
    idm.create_membership(&admin, &user, &group).await.unwrap();

    let query = UserQuery::new().key("missing").role("admin");
    assert!(idm.query_users(&query, Range::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn membership_removal_is_exact_and_idempotent() {
    let idm = manager().await;

    let admin = idm.create_role("admin").await.unwrap();
    let g1 = idm.create_group("G1", None).await.unwrap();
    let g2 = idm.create_group("G2", None).await.unwrap();
    let user = idm.create_user("u").await.unwrap();

    idm.create_membership(&admin, &user, &g1).await.unwrap();
    idm.create_membership(&admin, &user, &g2).await.unwrap();

    let other = idm.create_role("other").await.unwrap();
    idm.remove_membership(&other, &user, &g1).await.unwrap();
    let all = idm
        .query_memberships(&MembershipQuery::new(), Range::all())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    idm.remove_membership(&admin, &user, &g1).await.unwrap();
    idm.remove_membership(&admin, &user, &g1).await.unwrap();
    assert!(idm.get_membership(&admin, &user, &g1).await.unwrap().is_none());
    assert!(idm.get_membership(&admin, &user, &g2).await.unwrap().is_some());
}

#[tokio::test]
async fn removing_user_keeps_memberships() {
    let idm = manager().await;

    let role = idm.create_role("admin").await.unwrap();
    let group = idm.create_group("G", None).await.unwrap();
    let user = idm.create_user("u").await.unwrap();
    idm.create_membership(&role, &user, &group).await.unwrap();

    idm.remove_user(&user).await.unwrap();

    assert!(idm.get_membership(&role, &user, &group).await.unwrap().is_some());
}

#[tokio::test]
async fn end_to_end_scenario() {
    let idm = manager().await;

    let mut user = idm.create_user("asaldhana").await.unwrap();
    user.set_first_name("Anil");
    user.set_last_name("Saldhana");
    user.set_email("myemail@company.com");
    idm.update_user(&user).await.unwrap();

    let role = idm.create_role("admin").await.unwrap();
    let group = idm.create_group("Administrators", None).await.unwrap();
    idm.create_membership(&role, &user, &group).await.unwrap();

    let by_role = idm
        .query_users(&UserQuery::new().role("admin"), Range::all())
        .await
        .unwrap();
    assert!(by_role.iter().any(|u| u.key == "asaldhana"));

    let by_email = idm
        .query_users(&UserQuery::new().email("myemail@company.com"), Range::all())
        .await
        .unwrap();
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].key, "asaldhana");
    assert_eq!(by_email[0].first_name.as_deref(), Some("Anil"));

    idm.remove_user(&user).await.unwrap();
    assert!(idm.get_user("asaldhana").await.unwrap().is_none());
}

#[tokio::test]
async fn group_hierarchy() {
    let idm = manager().await;

    let parent = idm.create_group("Administrators", None).await.unwrap();
    let child = idm.create_group("Staff", Some(&parent)).await.unwrap();

    assert_eq!(child.parent.as_deref(), Some("Administrators"));
    let found = idm.get_group_parent(&child).await.unwrap().unwrap();
    assert_eq!(found.name, "Administrators");
    assert!(idm.get_group_parent(&parent).await.unwrap().is_none());

    let children = idm
        .query_groups(&GroupQuery::new().parent("Administrators"), Range::all())
        .await
        .unwrap();
    assert_eq!(children.len(), 1);

    idm.remove_group(&parent).await.unwrap();
    assert!(idm.get_group_parent(&child).await.unwrap().is_none());
    let err = idm.create_group("Orphan", Some(&parent)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn passwords_and_certificates() {
    let idm = manager().await;

    let mut user = idm.create_user("u").await.unwrap();
    assert!(!idm.validate_password(&user, "secret").await.unwrap());

    idm.update_password(&mut user, "secret").await.unwrap();
    assert!(idm.validate_password(&user, "secret").await.unwrap());
    assert!(!idm.validate_password(&user, "wrong").await.unwrap());

    let stored = idm.user_attribute_values(&user, "userPassword").await.unwrap().unwrap();
    assert_ne!(stored, values(&["secret"]));

    let der = [0x30, 0x82, 0x01, 0x0a];
    idm.update_certificate(&mut user, &der).await.unwrap();
    assert!(idm.validate_certificate(&user, &der).await.unwrap());
    assert!(!idm.validate_certificate(&user, &[0x30]).await.unwrap());
}

#[tokio::test]
async fn range_and_sort() {
    let store = open_store().await;

    for key in ["c", "a", "d", "b"] {
        store.create_user(key).await.unwrap();
    }

    let insertion = store.query_users(&UserQuery::new(), Range::all()).await.unwrap();
    let keys: Vec<&str> = insertion.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(keys, vec!["c", "a", "d", "b"]);

    let page = store
        .query_users(&UserQuery::new().sort(true), Range::new(1, 2))
        .await
        .unwrap();
    let keys: Vec<&str> = page.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(keys, vec!["b", "c"]);

    let descending = store
        .query_users(&UserQuery::new().sort(false), Range::new(0, 1))
        .await
        .unwrap();
    assert_eq!(descending[0].key, "d");
}

#[tokio::test]
async fn range_applies_after_attribute_check() {
    let store = open_store().await;

    for (key, tags) in [("a", vec!["x", "y"]), ("b", vec!["x"]), ("c", vec!["x"])] {
        let mut user = store.create_user(key).await.unwrap();
        store
            .set_user_attribute(&mut user, "tag", values(&tags))
            .await
            .unwrap();
    }

    let page = store
        .query_users(&UserQuery::new().attribute("tag", values(&["x"])), Range::new(0, 1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].key, "b");
}

#[tokio::test]
async fn attributes_load_across_chunks() {
    let store = open_store().await;
    let count = ATTRIBUTE_CHUNK * 2 + 1;

    for i in 0..count {
        let mut user = store.create_user(&format!("user-{i:05}")).await.unwrap();
        store
            .set_user_attribute(&mut user, "seq", vec![i.to_string()])
            .await
            .unwrap();
    }

    let users = store
        .query_users(&UserQuery::new().sort(true), Range::all())
        .await
        .unwrap();
    assert_eq!(users.len(), count);
    for (i, user) in users.iter().enumerate() {
        assert_eq!(user.key, format!("user-{i:05}"));
        assert_eq!(user.attributes.get("seq"), Some(&[i.to_string()][..]));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_database_shared_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("idm.db").display());
    let config = PoolConfig::new(url).max_connections(4);

    let store = Arc::new(
        SqlIdentityStore::connect(&config, Arc::new(SaltedDigestEncoder::default()))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.create_user(&format!("user-{i}")).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reopened = SqlIdentityStore::connect(&config, Arc::new(SaltedDigestEncoder::default()))
        .await
        .unwrap();
    let all = reopened.query_users(&UserQuery::new(), Range::all()).await.unwrap();
    assert_eq!(all.len(), 8);
}
