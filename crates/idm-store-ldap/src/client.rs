//! Directory access seam.
//!
//! The store never talks to `ldap3` directly; every read and write goes
//! through [`DirectoryClient`] so the DN mapping and attribute routing can be
//! exercised against any directory implementation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LdapStoreResult;
use crate::filter::Filter;

/// Search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the base entry.
    Base,
    /// Immediate children of the base entry.
    OneLevel,
    /// The base entry and everything below it.
    Subtree,
}

impl From<Scope> for ldap3::Scope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Base => Self::Base,
            Scope::OneLevel => Self::OneLevel,
            Scope::Subtree => Self::Subtree,
        }
    }
}

/// One change in a modify request. Values are raw bytes; an empty value
/// list on `Delete` or `Replace` removes the whole attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// Add values.
    Add(String, Vec<Vec<u8>>),
    /// Replace all values.
    Replace(String, Vec<Vec<u8>>),
    /// Delete values, or the attribute when empty.
    Delete(String, Vec<Vec<u8>>),
}

impl Modification {
    /// Adds text values.
    #[must_use]
    pub fn add(name: impl Into<String>, values: &[String]) -> Self {
        Self::Add(name.into(), text_values(values))
    }

    /// Replaces with text values.
    #[must_use]
    pub fn replace(name: impl Into<String>, values: &[String]) -> Self {
        Self::Replace(name.into(), text_values(values))
    }

    /// Deletes text values, or the whole attribute when `values` is empty.
    #[must_use]
    pub fn delete(name: impl Into<String>, values: &[String]) -> Self {
        Self::Delete(name.into(), text_values(values))
    }

    /// Name of the modified attribute.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Add(name, _) | Self::Replace(name, _) | Self::Delete(name, _) => name,
        }
    }
}

fn text_values(values: &[String]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.as_bytes().to_vec()).collect()
}

/// A directory entry with its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Text attributes (all values are multi-valued).
    pub attrs: HashMap<String, Vec<String>>,

    /// Attributes whose values are not valid UTF-8.
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    /// Creates an empty entry.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Gets a multi-valued text attribute. Attribute names are
    /// case-insensitive.
    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Gets a single-valued text attribute.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Gets a binary attribute.
    #[must_use]
    pub fn binary_values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.bin_attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Checks if a text attribute holds `value`, ignoring case.
    #[must_use]
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.values(name)
            .is_some_and(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
    }

    /// Checks if the entry has an attribute.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.values(name).is_some() || self.binary_values(name).is_some()
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
            bin_attrs: entry.bin_attrs,
        }
    }
}

/// Operations the directory store needs from a directory server.
///
/// Implementations must be thread-safe; the store shares one client across
/// all concurrent calls.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Searches below `base`. A missing base yields no entries.
    ///
    /// `attrs` lists the attributes to return; `*` requests every user
    /// attribute.
    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &Filter,
        attrs: &[&str],
    ) -> LdapStoreResult<Vec<DirectoryEntry>>;

    /// Reads one entry with all user attributes. A missing entry is `None`.
    async fn lookup(&self, dn: &str) -> LdapStoreResult<Option<DirectoryEntry>>;

    /// Adds an entry.
    ///
    /// ## Errors
    ///
    /// Returns `LdapStoreError::AlreadyExists` if the DN is taken.
    async fn add(&self, dn: &str, attrs: Vec<(String, Vec<String>)>) -> LdapStoreResult<()>;

    /// Applies modifications to an entry.
    ///
    /// ## Errors
    ///
    /// Returns `LdapStoreError::NoSuchObject` if the entry is missing, or
    /// `LdapStoreError::SchemaViolation` if the schema rejects a change.
    async fn modify(&self, dn: &str, mods: Vec<Modification>) -> LdapStoreResult<()>;

    /// Deletes a leaf entry.
    async fn delete(&self, dn: &str) -> LdapStoreResult<()>;

    /// Checks whether the directory schema defines an attribute type.
    async fn attribute_type_defined(&self, name: &str) -> LdapStoreResult<bool>;

    /// Resolves exactly one entry matching `filter` below `base` and probes
    /// `secret` by binding as it.
    ///
    /// Returns `false` on zero or several matches and on invalid
    /// credentials. The service binding is restored afterwards.
    async fn verify_credentials(&self, base: &str, filter: &Filter, secret: &str)
    -> LdapStoreResult<bool>;
}
