//! In-memory directory server double for store integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use idm_store::IdentityManager;
use idm_store_ldap::{
    DirectoryClient, DirectoryEntry, Filter, LdapIdentityStore, LdapStoreConfig, LdapStoreError,
    LdapStoreResult, Modification, Scope,
};
use parking_lot::Mutex;

pub const PEOPLE: &str = "ou=People,dc=example,dc=org";
pub const ROLES: &str = "ou=Roles,dc=example,dc=org";
pub const GROUPS: &str = "ou=Groups,dc=example,dc=org";

/// Attribute types the double's schema defines.
const SCHEMA: &[&str] = &[
    "objectClass",
    "ou",
    "dc",
    "uid",
    "cn",
    "sn",
    "givenName",
    "mail",
    "userPassword",
    "unicodePwd",
    "userCertificate",
    "telephoneNumber",
    "member",
    "roleOccupant",
    "description",
];

/// Directory operations recorded by the double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Search(String),
    Lookup(String),
    Add(String),
    Modify(String),
    Delete(String),
    Schema(String),
    Bind(String),
}

/// Directory server kept in memory.
#[derive(Debug)]
pub struct MemoryDirectory {
    entries: Mutex<BTreeMap<String, DirectoryEntry>>,
    schema: HashSet<String>,
    log: Mutex<Vec<Op>>,
}

impl MemoryDirectory {
    /// Creates a directory holding the three containers.
    pub fn new() -> Self {
        let directory = Self {
            entries: Mutex::new(BTreeMap::new()),
            schema: SCHEMA.iter().map(|s| s.to_ascii_lowercase()).collect(),
            log: Mutex::new(Vec::new()),
        };
        for dn in ["dc=example,dc=org", PEOPLE, ROLES, GROUPS] {
            let mut entry = DirectoryEntry::new(dn);
            entry
                .attrs
                .insert("objectClass".to_string(), vec!["organizationalUnit".to_string()]);
            directory.entries.lock().insert(normalize(dn), entry);
        }
        directory
    }

    /// Returns a copy of a stored entry.
    pub fn entry(&self, dn: &str) -> Option<DirectoryEntry> {
        self.entries.lock().get(&normalize(dn)).cloned()
    }

    /// Returns `true` if an entry exists.
    pub fn contains(&self, dn: &str) -> bool {
        self.entries.lock().contains_key(&normalize(dn))
    }

    /// Returns the recorded operations.
    pub fn ops(&self) -> Vec<Op> {
        self.log.lock().clone()
    }

    /// Number of schema lookups so far.
    pub fn schema_lookups(&self) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|op| matches!(op, Op::Schema(_)))
            .count()
    }

    /// Forgets the recorded operations.
    pub fn clear_ops(&self) {
        self.log.lock().clear();
    }

    fn record(&self, op: Op) {
        self.log.lock().push(op);
    }

    fn check_schema(&self, dn: &str, name: &str) -> LdapStoreResult<()> {
        let base = name.split(';').next().unwrap_or_default().to_ascii_lowercase();
        if self.schema.contains(&base) {
            Ok(())
        } else {
            Err(LdapStoreError::SchemaViolation {
                dn: dn.to_string(),
                message: format!("undefined attribute type {name}"),
            })
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| rdn.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

fn parent_of(normalized: &str) -> Option<&str> {
    normalized.split_once(',').map(|(_, parent)| parent)
}

fn in_scope(dn: &str, base: &str, scope: Scope) -> bool {
    match scope {
        Scope::Base => dn == base,
        Scope::OneLevel => parent_of(dn) == Some(base),
        Scope::Subtree => dn == base || dn.ends_with(&format!(",{base}")),
    }
}

fn matches(entry: &DirectoryEntry, filter: &Filter) -> bool {
    match filter {
        Filter::And(filters) => filters.iter().all(|f| matches(entry, f)),
        Filter::Present(attr) => attr.eq_ignore_ascii_case("objectClass") || entry.has_attr(attr),
        Filter::Equality(attr, value) => entry
            .values(attr)
            .unwrap_or_default()
            .iter()
            .any(|v| normalize(v) == normalize(value)),
    }
}

fn find_key<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a String> {
    map.keys().find(|k| k.eq_ignore_ascii_case(name))
}

fn apply(entry: &mut DirectoryEntry, modification: Modification) -> LdapStoreResult<()> {
    let dn = entry.dn.clone();
    let (name, raw) = match &modification {
        Modification::Add(name, raw)
        | Modification::Replace(name, raw)
        | Modification::Delete(name, raw) => (name.clone(), raw.clone()),
    };

    if name.contains(";binary") {
        match modification {
            Modification::Replace(..) if raw.is_empty() => {
                entry.bin_attrs.remove(&name);
            }
            Modification::Add(..) | Modification::Replace(..) => {
                entry.bin_attrs.insert(name, raw);
            }
            Modification::Delete(..) => {
                entry.bin_attrs.remove(&name);
            }
        }
        return Ok(());
    }

    let values: Vec<String> = raw
        .into_iter()
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .collect();
    let mut attrs: BTreeMap<String, Vec<String>> = entry.attrs.drain().collect();
    let existing = find_key(&attrs, &name).cloned();

    match modification {
        Modification::Add(..) => {
            let key = existing.unwrap_or(name);
            let current = attrs.entry(key).or_default();
            if values.iter().any(|v| current.contains(v)) {
                entry.attrs = attrs.into_iter().collect();
                return Err(LdapStoreError::ValueExists(dn));
            }
            current.extend(values);
        }
        Modification::Replace(..) => {
            if let Some(key) = existing {
                attrs.remove(&key);
            }
            if !values.is_empty() {
                attrs.insert(name, values);
            }
        }
        Modification::Delete(..) => {
            let Some(key) = existing else {
                entry.attrs = attrs.into_iter().collect();
                return Err(LdapStoreError::NoSuchAttribute(dn));
            };
            if values.is_empty() {
                attrs.remove(&key);
            } else {
                let current = attrs.entry(key.clone()).or_default();
                if !values.iter().all(|v| current.iter().any(|c| normalize(c) == normalize(v))) {
                    entry.attrs = attrs.into_iter().collect();
                    return Err(LdapStoreError::NoSuchAttribute(dn));
                }
                current.retain(|c| !values.iter().any(|v| normalize(c) == normalize(v)));
                if current.is_empty() {
                    attrs.remove(&key);
                }
            }
        }
    }

    entry.attrs = attrs.into_iter().collect();
    Ok(())
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        _attrs: &[&str],
    ) -> LdapStoreResult<Vec<DirectoryEntry>> {
        self.record(Op::Search(base.to_string()));
        let base = normalize(base);
        let entries = self.entries.lock();
        if !entries.contains_key(&base) {
            return Ok(Vec::new());
        }
        Ok(entries
            .iter()
            .filter(|(dn, entry)| in_scope(dn, &base, scope) && matches(entry, filter))
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn lookup(&self, dn: &str) -> LdapStoreResult<Option<DirectoryEntry>> {
        self.record(Op::Lookup(dn.to_string()));
        Ok(self.entry(dn))
    }

    async fn add(&self, dn: &str, attrs: Vec<(String, Vec<String>)>) -> LdapStoreResult<()> {
        self.record(Op::Add(dn.to_string()));
        for (name, _) in &attrs {
            self.check_schema(dn, name)?;
        }

        let key = normalize(dn);
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return Err(LdapStoreError::AlreadyExists(dn.to_string()));
        }
        if parent_of(&key).is_none_or(|parent| !entries.contains_key(parent)) {
            return Err(LdapStoreError::NoSuchObject(dn.to_string()));
        }

        let mut entry = DirectoryEntry::new(dn);
        entry.attrs = attrs.into_iter().collect();
        entries.insert(key, entry);
        Ok(())
    }

    async fn modify(&self, dn: &str, mods: Vec<Modification>) -> LdapStoreResult<()> {
        self.record(Op::Modify(dn.to_string()));
        let key = normalize(dn);
        let mut entries = self.entries.lock();
        let Some(stored) = entries.get(&key) else {
            return Err(LdapStoreError::NoSuchObject(dn.to_string()));
        };
        for modification in &mods {
            self.check_schema(dn, modification.attribute())?;
        }

        let mut updated = stored.clone();
        for modification in mods {
            apply(&mut updated, modification)?;
        }
        entries.insert(key, updated);
        Ok(())
    }

    async fn delete(&self, dn: &str) -> LdapStoreResult<()> {
        self.record(Op::Delete(dn.to_string()));
        let key = normalize(dn);
        let mut entries = self.entries.lock();
        if !entries.contains_key(&key) {
            return Err(LdapStoreError::NoSuchObject(dn.to_string()));
        }
        if entries.keys().any(|k| parent_of(k) == Some(key.as_str())) {
            return Err(LdapStoreError::Operation {
                dn: dn.to_string(),
                code: 66,
                message: "not allowed on non-leaf".to_string(),
            });
        }
        entries.remove(&key);
        Ok(())
    }

    async fn attribute_type_defined(&self, name: &str) -> LdapStoreResult<bool> {
        self.record(Op::Schema(name.to_string()));
        Ok(self.schema.contains(&name.to_ascii_lowercase()))
    }

    async fn verify_credentials(
        &self,
        base: &str,
        filter: &Filter,
        secret: &str,
    ) -> LdapStoreResult<bool> {
        self.record(Op::Bind(base.to_string()));
        if secret.is_empty() {
            return Ok(false);
        }
        let base = normalize(base);
        let entries = self.entries.lock();
        let found: Vec<&DirectoryEntry> = entries
            .iter()
            .filter(|(dn, entry)| in_scope(dn, &base, Scope::Subtree) && matches(entry, filter))
            .map(|(_, entry)| entry)
            .collect();
        Ok(match found.as_slice() {
            [entry] => entry.first("userPassword") == Some(secret),
            _ => false,
        })
    }
}

/// Configuration pointing at the double's containers.
pub fn config() -> LdapStoreConfig {
    LdapStoreConfig::builder()
        .url("ldap://localhost:10389")
        .bind_dn("uid=admin,ou=system")
        .bind_credential("secret")
        .user_dn_suffix(PEOPLE)
        .role_dn_suffix(ROLES)
        .group_dn_suffix(GROUPS)
        .build()
        .expect("valid test configuration")
}

/// Store over a fresh in-memory directory.
pub fn open_store() -> LdapIdentityStore<MemoryDirectory> {
    LdapIdentityStore::with_client(config(), MemoryDirectory::new()).expect("store over double")
}

/// Wraps a fresh store in the manager facade.
pub fn manager() -> IdentityManager<LdapIdentityStore<MemoryDirectory>> {
    IdentityManager::new(open_store())
}

/// Converts string literals into owned attribute values.
pub fn values(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

