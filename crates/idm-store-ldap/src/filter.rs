//! Search filter construction.

use std::fmt;

use ldap3::ldap_escape;

/// A search filter, rendered to RFC 4515 text by [`Filter::to_ldap_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every sub-filter must match. An empty conjunction matches everything.
    And(Vec<Filter>),
    /// `(attr=value)` equality assertion.
    Equality(String, String),
    /// `(attr=*)` presence assertion.
    Present(String),
}

impl Filter {
    /// Creates an equality assertion.
    #[must_use]
    pub fn equality(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equality(attr.into(), value.into())
    }

    /// Creates a presence assertion.
    #[must_use]
    pub fn present(attr: impl Into<String>) -> Self {
        Self::Present(attr.into())
    }

    /// Matches entries of the given object class.
    #[must_use]
    pub fn object_class(class: &str) -> Self {
        Self::equality("objectClass", class)
    }

    /// Conjunction of `self` and `other`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (one, Self::And(mut right)) => {
                right.insert(0, one);
                Self::And(right)
            }
            (one, other) => Self::And(vec![one, other]),
        }
    }

    /// Renders the filter, escaping assertion values.
    #[must_use]
    pub fn to_ldap_string(&self) -> String {
        match self {
            Self::And(filters) if filters.is_empty() => "(objectClass=*)".to_string(),
            Self::And(filters) if filters.len() == 1 => filters[0].to_ldap_string(),
            Self::And(filters) => {
                let inner: String = filters.iter().map(Self::to_ldap_string).collect();
                format!("(&{inner})")
            }
            Self::Equality(attr, value) => format!("({attr}={})", ldap_escape(value.as_str())),
            Self::Present(attr) => format!("({attr}=*)"),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldap_string())
    }
}
