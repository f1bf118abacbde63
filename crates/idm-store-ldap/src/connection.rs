//! `ldap3` implementation of [`DirectoryClient`].
//!
//! One connection, bound as the service account, is shared behind a
//! `tokio` mutex. Credential checks rebind that connection as the user, so
//! the whole search, bind and reconnect sequence holds the lock.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, SearchEntry, SearchResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{DirectoryClient, DirectoryEntry, Modification, Scope};
use crate::config::LdapStoreConfig;
use crate::error::{LdapStoreError, LdapStoreResult, RC_INVALID_CREDENTIALS, RC_NO_SUCH_OBJECT};
use crate::filter::Filter;

const SUCCESS: u32 = 0;

/// Directory client over a single `ldap3` connection.
pub struct Ldap3Client {
    config: LdapStoreConfig,
    connection: Mutex<Ldap>,
}

impl std::fmt::Debug for Ldap3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ldap3Client")
            .field("url", &self.config.url)
            .field("bind_dn", &self.config.bind_dn)
            .finish_non_exhaustive()
    }
}

impl Ldap3Client {
    /// Connects and binds as the configured service account.
    ///
    /// ## Errors
    ///
    /// Returns an error if the configuration is invalid, the server cannot
    /// be reached or the service bind is rejected.
    pub async fn connect(config: &LdapStoreConfig) -> LdapStoreResult<Self> {
        config.validate()?;
        let ldap = open(config).await?;
        info!(url = %config.url, "LDAP connection established");
        Ok(Self {
            config: config.clone(),
            connection: Mutex::new(ldap),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LdapStoreConfig {
        &self.config
    }
}

/// Opens a connection and binds as the service account.
async fn open(config: &LdapStoreConfig) -> LdapStoreResult<Ldap> {
    let settings = LdapConnSettings::new()
        .set_conn_timeout(config.connect_timeout)
        .set_starttls(config.uses_starttls());

    let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.url)
        .await
        .map_err(|e| LdapStoreError::connection(e.to_string()))?;

    // Spawn connection driver
    tokio::spawn(async move {
        if let Err(e) = conn.drive().await {
            warn!(error = %e, "LDAP connection driver error");
        }
    });

    let result = ldap
        .simple_bind(&config.bind_dn, &config.bind_credential)
        .await
        .map_err(|e| LdapStoreError::Bind(e.to_string()))?;
    if result.rc != SUCCESS {
        return Err(LdapStoreError::Bind(format!(
            "service bind rejected with code {}",
            result.rc
        )));
    }

    Ok(ldap)
}

fn check(dn: &str, result: &ldap3::LdapResult) -> LdapStoreResult<()> {
    if result.rc == SUCCESS {
        Ok(())
    } else {
        Err(LdapStoreError::from_result_code(dn, result.rc, result.text.clone()))
    }
}

fn to_mod(modification: Modification) -> Mod<Vec<u8>> {
    match modification {
        Modification::Add(name, values) => Mod::Add(name.into_bytes(), values.into_iter().collect()),
        Modification::Replace(name, values) => {
            Mod::Replace(name.into_bytes(), values.into_iter().collect())
        }
        Modification::Delete(name, values) => {
            Mod::Delete(name.into_bytes(), values.into_iter().collect())
        }
    }
}

/// Extracts the names declared by an RFC 4512 `AttributeTypeDescription`.
fn attribute_type_names(definition: &str) -> Vec<String> {
    let Some(start) = definition.find(" NAME ") else {
        return Vec::new();
    };
    let rest = definition[start + " NAME ".len()..].trim_start();
    let list = match rest.strip_prefix('(') {
        Some(inner) => inner.split(')').next().unwrap_or_default(),
        None => rest.split_whitespace().next().unwrap_or_default(),
    };
    list.split_whitespace()
        .map(|name| name.trim_matches('\'').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[async_trait]
impl DirectoryClient for Ldap3Client {
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> LdapStoreResult<Vec<DirectoryEntry>> {
        let filter = filter.to_ldap_string();
        let mut ldap = self.connection.lock().await;
        let SearchResult(entries, result) = ldap
            .search(base, scope.into(), &filter, attrs.to_vec())
            .await?;

        match result.rc {
            SUCCESS => {
                let entries: Vec<DirectoryEntry> = entries
                    .into_iter()
                    .map(SearchEntry::construct)
                    .map(DirectoryEntry::from)
                    .collect();
                debug!(base, filter = %filter, results = entries.len(), "LDAP search");
                Ok(entries)
            }
            RC_NO_SUCH_OBJECT => Ok(Vec::new()),
            rc => Err(LdapStoreError::from_result_code(base, rc, result.text)),
        }
    }

    async fn lookup(&self, dn: &str) -> LdapStoreResult<Option<DirectoryEntry>> {
        let entries = self
            .search(dn, Scope::Base, &Filter::present("objectClass"), &["*"])
            .await?;
        Ok(entries.into_iter().next())
    }

    async fn add(&self, dn: &str, attrs: Vec<(String, Vec<String>)>) -> LdapStoreResult<()> {
        let attrs: Vec<(String, HashSet<String>)> = attrs
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().collect()))
            .collect();

        let mut ldap = self.connection.lock().await;
        let result = ldap.add(dn, attrs).await?;
        check(dn, &result)?;
        debug!(dn, "LDAP entry added");
        Ok(())
    }

    async fn modify(&self, dn: &str, mods: Vec<Modification>) -> LdapStoreResult<()> {
        let mods: Vec<Mod<Vec<u8>>> = mods.into_iter().map(to_mod).collect();

        let mut ldap = self.connection.lock().await;
        let result = ldap.modify(dn, mods).await?;
        check(dn, &result)?;
        debug!(dn, "LDAP entry modified");
        Ok(())
    }

    async fn delete(&self, dn: &str) -> LdapStoreResult<()> {
        let mut ldap = self.connection.lock().await;
        let result = ldap.delete(dn).await?;
        check(dn, &result)?;
        debug!(dn, "LDAP entry deleted");
        Ok(())
    }

    async fn attribute_type_defined(&self, name: &str) -> LdapStoreResult<bool> {
        let root = self
            .search("", Scope::Base, &Filter::present("objectClass"), &["subschemaSubentry"])
            .await?;
        let Some(subschema) = root
            .first()
            .and_then(|entry| entry.first("subschemaSubentry"))
            .map(str::to_string)
        else {
            return Ok(false);
        };

        let schema = self
            .search(
                &subschema,
                Scope::Base,
                &Filter::object_class("subschema"),
                &["attributeTypes"],
            )
            .await?;

        let defined = schema
            .iter()
            .filter_map(|entry| entry.values("attributeTypes"))
            .flatten()
            .any(|definition| {
                attribute_type_names(definition)
                    .iter()
                    .any(|declared| declared.eq_ignore_ascii_case(name))
            });
        Ok(defined)
    }

    async fn verify_credentials(
        &self,
        base: &str,
        filter: &Filter,
        secret: &str,
    ) -> LdapStoreResult<bool> {
        // An empty password would be an unauthenticated bind, which succeeds
        if secret.is_empty() {
            return Ok(false);
        }

        let mut ldap = self.connection.lock().await;
        let SearchResult(entries, result) = ldap
            .search(base, ldap3::Scope::Subtree, &filter.to_ldap_string(), vec!["1.1"])
            .await?;
        if result.rc != SUCCESS && result.rc != RC_NO_SUCH_OBJECT {
            return Err(LdapStoreError::from_result_code(base, result.rc, result.text));
        }
        if entries.len() != 1 {
            debug!(base, matches = entries.len(), "Credential target is not unique");
            return Ok(false);
        }
        let Some(dn) = entries.into_iter().next().map(|e| SearchEntry::construct(e).dn) else {
            return Ok(false);
        };

        let outcome = bind_outcome(&dn, ldap.simple_bind(&dn, secret).await);

        // Bound as the user or broken either way; restore the service binding
        let _ = ldap.unbind().await;
        *ldap = open(&self.config).await?;
        debug!(dn = %dn, "Service binding restored after credential check");

        outcome
    }
}

/// Maps a user bind to a credential verdict. Only `invalidCredentials`
/// means a wrong secret; every other failure is an error.
fn bind_outcome(dn: &str, bound: Result<LdapResult, LdapError>) -> LdapStoreResult<bool> {
    let result = bound?;
    match result.rc {
        SUCCESS => Ok(true),
        RC_INVALID_CREDENTIALS => Ok(false),
        rc => Err(LdapStoreError::from_result_code(dn, rc, result.text)),
    }
}
