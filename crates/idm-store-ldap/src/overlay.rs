//! Custom-attribute overlay entries.
//!
//! Attributes the directory schema does not define are stored in a child
//! entry `cn=CustomAttributes,<entity DN>` of class `applicationProcess`,
//! whose `description` holds a JSON document. The user's enabled flag is
//! kept in the same document.

use idm_model::Attributes;
use serde::{Deserialize, Serialize};

use crate::client::{DirectoryEntry, Modification};
use crate::dn::{CN_RDN, child_dn};
use crate::error::LdapStoreResult;

/// RDN value of overlay entries.
pub const OVERLAY_NAME: &str = "CustomAttributes";
/// Object class of overlay entries.
pub const OVERLAY_CLASS: &str = "applicationProcess";
/// Attribute holding the serialized document.
pub const OVERLAY_ATTRIBUTE: &str = "description";

/// DN of the overlay entry for `entity_dn`.
#[must_use]
pub fn overlay_dn(entity_dn: &str) -> String {
    child_dn(CN_RDN, OVERLAY_NAME, entity_dn)
}

/// Custom state stored beside a directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    /// Enabled flag; absent means enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Custom attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Overlay {
    /// Decodes an overlay entry. An entry without a document is empty.
    ///
    /// ## Errors
    ///
    /// Returns an error if the document is not valid JSON.
    pub fn from_entry(entry: &DirectoryEntry) -> LdapStoreResult<Self> {
        match entry.first(OVERLAY_ATTRIBUTE) {
            Some(document) => Ok(serde_json::from_str(document)?),
            None => Ok(Self::default()),
        }
    }

    /// Encodes the document.
    ///
    /// ## Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_document(&self) -> LdapStoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Attributes for a new overlay entry.
    ///
    /// ## Errors
    ///
    /// Returns an error if serialization fails.
    pub fn new_entry(&self) -> LdapStoreResult<Vec<(String, Vec<String>)>> {
        Ok(vec![
            ("objectClass".to_string(), vec![OVERLAY_CLASS.to_string()]),
            (CN_RDN.to_string(), vec![OVERLAY_NAME.to_string()]),
            (OVERLAY_ATTRIBUTE.to_string(), vec![self.to_document()?]),
        ])
    }

    /// Modification rewriting an existing overlay entry.
    ///
    /// ## Errors
    ///
    /// Returns an error if serialization fails.
    pub fn rewrite(&self) -> LdapStoreResult<Modification> {
        Ok(Modification::replace(OVERLAY_ATTRIBUTE, &[self.to_document()?]))
    }

    /// Returns the enabled flag, defaulting to `true`.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_dn_is_child() {
        assert_eq!(
            overlay_dn("uid=asaldhana,ou=People,dc=example,dc=org"),
            "cn=CustomAttributes,uid=asaldhana,ou=People,dc=example,dc=org"
        );
    }

    #[test]
    fn document_round_trip_keeps_order() {
        let mut overlay = Overlay::default();
        overlay
            .attributes
            .set("QuestionTotal", vec!["2".to_string(), "1".to_string()]);
        overlay.enabled = Some(false);

        let mut entry = DirectoryEntry::new("cn=CustomAttributes,uid=a,ou=People");
        entry
            .attrs
            .insert("description".to_string(), vec![overlay.to_document().unwrap()]);

        let decoded = Overlay::from_entry(&entry).unwrap();
        assert_eq!(decoded, overlay);
        assert!(!decoded.is_enabled());
    }

    #[test]
    fn missing_document_is_empty() {
        let entry = DirectoryEntry::new("cn=CustomAttributes,uid=a,ou=People");
        let overlay = Overlay::from_entry(&entry).unwrap();
        assert!(overlay.attributes.is_empty());
        assert!(overlay.is_enabled());
    }

    #[test]
    fn enabled_flag_omitted_when_unset() {
        let json = Overlay::default().to_document().unwrap();
        assert_eq!(json, r#"{"attributes":{}}"#);
    }
}
