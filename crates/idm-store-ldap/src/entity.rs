//! Directory-backed entity types.
//!
//! Each wrapper pairs a model entity with the DN of its directory entry.
//! They dereference to the model type, so profile setters and field reads
//! work unchanged.

use std::ops::{Deref, DerefMut};

use idm_model::{Attributes, Group, IdentityType, Role, User};

macro_rules! directory_entity {
    ($(#[$meta:meta])* $name:ident, $inner:ident, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            dn: String,
            $field: $inner,
        }

        impl $name {
            /// Pairs a model entity with its entry DN.
            #[must_use]
            pub fn new(dn: impl Into<String>, $field: $inner) -> Self {
                Self {
                    dn: dn.into(),
                    $field,
                }
            }

            /// Distinguished name of the backing entry.
            #[must_use]
            pub fn dn(&self) -> &str {
                &self.dn
            }

            /// Unwraps the model entity.
            #[must_use]
            pub fn into_inner(self) -> $inner {
                self.$field
            }
        }

        impl Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &$inner {
                &self.$field
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut $inner {
                &mut self.$field
            }
        }

        impl AsRef<$inner> for $name {
            fn as_ref(&self) -> &$inner {
                &self.$field
            }
        }

        impl IdentityType for $name {
            fn key(&self) -> &str {
                self.$field.key()
            }

            fn attributes(&self) -> &Attributes {
                self.$field.attributes()
            }

            fn attributes_mut(&mut self) -> &mut Attributes {
                self.$field.attributes_mut()
            }
        }
    };
}

directory_entity!(
    /// A user stored as an `inetOrgPerson` entry.
    LdapUser,
    User,
    user
);

directory_entity!(
    /// A group stored as a `groupOfNames` (or Active Directory `group`) entry.
    LdapGroup,
    Group,
    group
);

directory_entity!(
    /// A role stored as an `organizationalRole` entry.
    LdapRole,
    Role,
    role
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_exposes_model() {
        let mut user = LdapUser::new(
            "uid=asaldhana,ou=People,dc=example,dc=org",
            User::new("asaldhana"),
        );
        user.set_first_name("Anil");

        assert_eq!(user.key(), "asaldhana");
        assert_eq!(user.first_name.as_deref(), Some("Anil"));
        assert_eq!(user.dn(), "uid=asaldhana,ou=People,dc=example,dc=org");
        assert_eq!(user.into_inner().key, "asaldhana");
    }
}
