//! Shared helpers for file store integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use idm_auth::SaltedDigestEncoder;
use idm_store::IdentityManager;
use idm_store_file::{FileIdentityStore, FileStoreConfig};

/// Opens a store that recreates its files in `dir`.
pub fn open_store(dir: &Path) -> FileIdentityStore {
    open_with(FileStoreConfig::new(dir))
}

/// Opens a store with an explicit configuration.
pub fn open_with(config: FileStoreConfig) -> FileIdentityStore {
    FileIdentityStore::open(&config, Arc::new(SaltedDigestEncoder::default()))
        .expect("failed to open file store")
}

/// Wraps a fresh store in the manager facade.
pub fn manager(dir: &Path) -> IdentityManager<FileIdentityStore> {
    IdentityManager::new(open_store(dir))
}

/// Converts string literals into owned attribute values.
pub fn values(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
