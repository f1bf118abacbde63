//! LDAP store configuration.
//!
//! ## Transport
//!
//! `ldaps://` URLs use TLS from connection start; `StartTls` upgrades a
//! plain `ldap://` connection. Plain transport is accepted, but Active
//! Directory refuses password changes over it, so the store logs a warning
//! when the Active Directory flag is combined with plain transport.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LdapStoreError, LdapStoreResult};

// ============================================================================
// Transport Protocol
// ============================================================================

/// Transport security requested on top of the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    /// TLS from connection start (`ldaps://`).
    Ssl,
    /// Upgrade a plain connection with the StartTLS extended operation.
    StartTls,
}

// ============================================================================
// Store Configuration
// ============================================================================

/// LDAP store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapStoreConfig {
    // === Connection ===
    /// Server URL (`ldap://` or `ldaps://`).
    pub url: String,

    /// Bind DN for the service account.
    pub bind_dn: String,

    /// Bind credential (password).
    #[serde(skip_serializing)]
    pub bind_credential: String,

    /// Optional transport protocol.
    pub protocol: Option<TransportProtocol>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    // === Directory Structure ===
    /// Parent DN of user entries.
    pub user_dn_suffix: String,

    /// Parent DN of role entries.
    pub role_dn_suffix: String,

    /// Parent DN of group entries.
    pub group_dn_suffix: String,

    /// Target is Microsoft Active Directory.
    pub active_directory: bool,

    /// Attribute names always written to the entry itself, consulted before
    /// the directory schema.
    pub managed_attributes: Vec<String>,

    /// Extra connection properties, kept for the caller.
    pub properties: BTreeMap<String, String>,
}

impl Default for LdapStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bind_dn: String::new(),
            bind_credential: String::new(),
            protocol: None,
            connect_timeout: Duration::from_secs(5),
            user_dn_suffix: String::new(),
            role_dn_suffix: String::new(),
            group_dn_suffix: String::new(),
            active_directory: false,
            managed_attributes: Vec::new(),
            properties: BTreeMap::new(),
        }
    }
}

impl LdapStoreConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> LdapStoreConfigBuilder {
        LdapStoreConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if a required field is empty or the URL scheme
    /// contradicts the transport protocol.
    pub fn validate(&self) -> LdapStoreResult<()> {
        let url = self.url.to_lowercase();
        let secure_scheme = if url.starts_with("ldaps://") {
            true
        } else if url.starts_with("ldap://") {
            false
        } else {
            return Err(LdapStoreError::config(
                "url must start with ldap:// or ldaps://",
            ));
        };

        match self.protocol {
            Some(TransportProtocol::Ssl) if !secure_scheme => {
                return Err(LdapStoreError::config("protocol ssl requires an ldaps:// url"));
            }
            Some(TransportProtocol::StartTls) if secure_scheme => {
                return Err(LdapStoreError::config(
                    "protocol starttls requires an ldap:// url",
                ));
            }
            _ => {}
        }

        if self.bind_dn.is_empty() {
            return Err(LdapStoreError::config("bind_dn cannot be empty"));
        }
        for (name, suffix) in [
            ("user_dn_suffix", &self.user_dn_suffix),
            ("role_dn_suffix", &self.role_dn_suffix),
            ("group_dn_suffix", &self.group_dn_suffix),
        ] {
            if suffix.is_empty() {
                return Err(LdapStoreError::config(format!("{name} cannot be empty")));
            }
        }

        Ok(())
    }

    /// Returns `true` if the connection is upgraded with StartTLS.
    #[must_use]
    pub const fn uses_starttls(&self) -> bool {
        matches!(self.protocol, Some(TransportProtocol::StartTls))
    }

    /// Returns `true` if credentials would travel in cleartext.
    #[must_use]
    pub fn is_plain_transport(&self) -> bool {
        !self.url.to_lowercase().starts_with("ldaps://") && !self.uses_starttls()
    }

    /// Object class of group entries.
    #[must_use]
    pub const fn group_object_class(&self) -> &'static str {
        if self.active_directory {
            "group"
        } else {
            "groupOfNames"
        }
    }
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for [`LdapStoreConfig`].
#[derive(Debug, Default)]
pub struct LdapStoreConfigBuilder {
    config: LdapStoreConfig,
}

impl LdapStoreConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the bind DN.
    #[must_use]
    pub fn bind_dn(mut self, dn: impl Into<String>) -> Self {
        self.config.bind_dn = dn.into();
        self
    }

    /// Sets the bind credential.
    #[must_use]
    pub fn bind_credential(mut self, credential: impl Into<String>) -> Self {
        self.config.bind_credential = credential.into();
        self
    }

    /// Sets the transport protocol.
    #[must_use]
    pub const fn protocol(mut self, protocol: TransportProtocol) -> Self {
        self.config.protocol = Some(protocol);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the user DN suffix.
    #[must_use]
    pub fn user_dn_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.user_dn_suffix = suffix.into();
        self
    }

    /// Sets the role DN suffix.
    #[must_use]
    pub fn role_dn_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.role_dn_suffix = suffix.into();
        self
    }

    /// Sets the group DN suffix.
    #[must_use]
    pub fn group_dn_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.group_dn_suffix = suffix.into();
        self
    }

    /// Marks the target as Active Directory.
    #[must_use]
    pub const fn active_directory(mut self, active_directory: bool) -> Self {
        self.config.active_directory = active_directory;
        self
    }

    /// Adds an attribute that is always written to the entry itself.
    #[must_use]
    pub fn managed_attribute(mut self, name: impl Into<String>) -> Self {
        self.config.managed_attributes.push(name.into());
        self
    }

    /// Adds a passthrough connection property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.properties.insert(key.into(), value.into());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> LdapStoreResult<LdapStoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
