//! User domain model.
//!
//! Users are the primary identity entities. They are keyed by an immutable
//! unique name and reach roles and groups through memberships.

use serde::{Deserialize, Serialize};

use crate::{Attributes, IdentityType};

/// An identity-store user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    // === Identity ===
    /// Unique, immutable key.
    pub key: String,
    /// Whether the user account is enabled.
    pub enabled: bool,

    // === Profile ===
    /// Full display name.
    pub full_name: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Email address.
    pub email: Option<String>,

    // === Custom Attributes ===
    /// Attribute bag.
    #[serde(default)]
    pub attributes: Attributes,
}

impl User {
    /// Creates a new, enabled user with the given key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            enabled: true,
            full_name: None,
            first_name: None,
            last_name: None,
            email: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the user's full name.
    #[must_use]
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Sets the user's first name.
    #[must_use]
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Sets the user's last name.
    #[must_use]
    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Sets the user's email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets whether the user is enabled.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the first name in place.
    pub fn set_first_name(&mut self, name: impl Into<String>) {
        self.first_name = Some(name.into());
    }

    /// Sets the last name in place.
    pub fn set_last_name(&mut self, name: impl Into<String>) {
        self.last_name = Some(name.into());
    }

    /// Sets the email in place.
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = Some(email.into());
    }

    /// Sets the full name in place.
    pub fn set_full_name(&mut self, name: impl Into<String>) {
        self.full_name = Some(name.into());
    }

    /// Enables or disables the user in place.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns the explicit full name, or one composed from the first and
    /// last names.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = &self.full_name {
            return Some(full.clone());
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

impl IdentityType for User {
    fn key(&self) -> &str {
        &self.key
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl AsRef<Self> for User {
    fn as_ref(&self) -> &Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_defaults() {
        let user = User::new("asaldhana");

        assert_eq!(user.key, "asaldhana");
        assert!(user.enabled);
        assert!(user.email.is_none());
        assert!(user.attributes.is_empty());
    }

    #[test]
    fn builder_pattern_works() {
        let user = User::new("asaldhana")
            .with_first_name("Anil")
            .with_last_name("Saldhana")
            .with_email("myemail@company.com")
            .with_enabled(false);

        assert_eq!(user.first_name.as_deref(), Some("Anil"));
        assert_eq!(user.last_name.as_deref(), Some("Saldhana"));
        assert_eq!(user.email.as_deref(), Some("myemail@company.com"));
        assert!(!user.enabled);
    }

    #[test]
    fn display_name_handles_partial() {
        let user = User::new("u").with_first_name("Anil");
        assert_eq!(user.display_name().as_deref(), Some("Anil"));

        let user = User::new("u").with_first_name("Anil").with_last_name("Saldhana");
        assert_eq!(user.display_name().as_deref(), Some("Anil Saldhana"));

        let user = user.with_full_name("A. Saldhana");
        assert_eq!(user.display_name().as_deref(), Some("A. Saldhana"));

        assert!(User::new("u").display_name().is_none());
    }

    #[test]
    fn identity_type_exposes_attributes() {
        let mut user = User::new("u");
        user.attributes_mut().set("telephoneNumber", vec!["12345".into()]);

        assert_eq!(user.key(), "u");
        assert_eq!(user.attributes().first("telephoneNumber"), Some("12345"));
    }
}
