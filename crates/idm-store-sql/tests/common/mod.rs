//! Shared helpers for relational store integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use idm_auth::SaltedDigestEncoder;
use idm_store::IdentityManager;
use idm_store_sql::{PoolConfig, SqlIdentityStore};

/// Connects a store to a private, migrated in-memory database.
pub async fn open_store() -> SqlIdentityStore {
    SqlIdentityStore::connect(&PoolConfig::in_memory(), Arc::new(SaltedDigestEncoder::default()))
        .await
        .expect("failed to connect in-memory store")
}

/// Wraps a fresh store in the manager facade.
pub async fn manager() -> IdentityManager<SqlIdentityStore> {
    IdentityManager::new(open_store().await)
}

/// Converts string literals into owned attribute values.
pub fn values(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
