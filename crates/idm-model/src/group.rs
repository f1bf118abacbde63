//! Group domain model.
//!
//! Groups form a forest: each group names at most one parent by key.

use serde::{Deserialize, Serialize};

use crate::{Attributes, IdentityType};

/// An identity-store group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group name.
    pub name: String,
    /// Key of the parent group, if any.
    pub parent: Option<String>,
    /// Attribute bag.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Group {
    /// Creates a new top-level group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the parent group key.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Checks if this is a top-level group.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

impl IdentityType for Group {
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

impl AsRef<Self> for Group {
    fn as_ref(&self) -> &Self {
        self
    }
}
