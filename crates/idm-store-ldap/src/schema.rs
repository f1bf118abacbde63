//! Managed-attribute classification.
//!
//! An attribute is *managed* when the directory schema defines it; managed
//! attributes live on the entry itself, everything else goes to the
//! custom-attribute overlay. Answers are cached per store instance for its
//! whole lifetime, so schema changes on the server are not picked up until
//! the store is rebuilt.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use crate::client::DirectoryClient;
use crate::error::LdapStoreResult;

/// Per-instance cache of schema lookups.
#[derive(Debug, Default)]
pub struct SchemaCache {
    configured: HashSet<String>,
    resolved: RwLock<HashMap<String, bool>>,
}

impl SchemaCache {
    /// Creates a cache that treats `managed` as defined without asking the
    /// directory.
    #[must_use]
    pub fn new<I, S>(managed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            configured: managed.into_iter().map(|name| normalize(name.as_ref())).collect(),
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Returns `true` if `name` is defined by the directory schema.
    ///
    /// Names are compared case-insensitively; attribute options such as
    /// `;binary` are ignored.
    ///
    /// ## Errors
    ///
    /// Propagates directory errors from an uncached lookup.
    pub async fn is_managed<C>(&self, client: &C, name: &str) -> LdapStoreResult<bool>
    where
        C: DirectoryClient + ?Sized,
    {
        let key = normalize(name);
        if self.configured.contains(&key) {
            return Ok(true);
        }
        if let Some(&managed) = self.resolved.read().get(&key) {
            return Ok(managed);
        }

        let base = key.split(';').next().unwrap_or_default();
        let managed = client.attribute_type_defined(base).await?;
        debug!(attribute = name, managed, "Attribute type resolved");
        self.resolved.write().insert(key, managed);
        Ok(managed)
    }

    /// Number of cached lookups.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.resolved.read().len()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
