//! Role domain model.

use serde::{Deserialize, Serialize};

use crate::{Attributes, IdentityType};

/// An identity-store role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name.
    pub name: String,
    /// Attribute bag.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Role {
    /// Creates a new role.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }
}

impl IdentityType for Role {
    fn key(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl AsRef<Self> for Role {
    fn as_ref(&self) -> &Self {
        self
    }
}
