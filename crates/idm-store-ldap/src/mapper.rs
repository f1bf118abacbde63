//! Entry to entity mapping.
//!
//! Maps directory entries to the identity model and builds the attribute
//! sets written for new entries.

use idm_model::{Attributes, Group, Role, User};

use crate::client::{DirectoryEntry, Modification};
use crate::dn::{CN_RDN, USER_RDN, rdn_value};
use crate::entity::{LdapGroup, LdapRole, LdapUser};
use crate::overlay::Overlay;

// ============================================================================
// Attribute Names
// ============================================================================

/// Object class of user entries.
pub const USER_CLASS: &str = "inetOrgPerson";
/// Object class of role and membership entries.
pub const ROLE_CLASS: &str = "organizationalRole";
/// Object class attribute.
pub const OBJECT_CLASS: &str = "objectClass";
/// First name attribute.
pub const FIRST_NAME: &str = "givenName";
/// Last name attribute.
pub const LAST_NAME: &str = "sn";
/// Full name attribute.
pub const FULL_NAME: &str = "cn";
/// Email attribute.
pub const EMAIL: &str = "mail";
/// Group member attribute.
pub const MEMBER: &str = "member";
/// Membership occupant attribute.
pub const ROLE_OCCUPANT: &str = "roleOccupant";
/// Generic password attribute.
pub const USER_PASSWORD: &str = "userPassword";
/// Active Directory password attribute.
pub const UNICODE_PWD: &str = "unicodePwd";
/// Binary certificate attribute.
pub const USER_CERTIFICATE_BINARY: &str = "userCertificate;binary";

const USER_STRUCTURAL: &[&str] = &[
    OBJECT_CLASS,
    USER_RDN,
    FULL_NAME,
    LAST_NAME,
    FIRST_NAME,
    EMAIL,
    USER_PASSWORD,
    UNICODE_PWD,
    "userCertificate",
    USER_CERTIFICATE_BINARY,
];
const GROUP_STRUCTURAL: &[&str] = &[OBJECT_CLASS, CN_RDN, MEMBER];
const ROLE_STRUCTURAL: &[&str] = &[OBJECT_CLASS, CN_RDN, ROLE_OCCUPANT];

// ============================================================================
// Entry to Entity
// ============================================================================

/// Maps a user entry and its overlay to a user.
#[must_use]
pub fn user_from_entry(entry: &DirectoryEntry, overlay: &Overlay) -> LdapUser {
    let key = entry
        .first(USER_RDN)
        .map(str::to_string)
        .or_else(|| rdn_value(&entry.dn))
        .unwrap_or_default();

    let mut user = User::new(key);
    user.full_name = entry.first(FULL_NAME).map(String::from);
    user.first_name = entry.first(FIRST_NAME).map(String::from);
    user.last_name = entry.first(LAST_NAME).map(String::from);
    user.email = entry.first(EMAIL).map(String::from);
    user.enabled = overlay.is_enabled();
    user.attributes = entry_attributes(entry, USER_STRUCTURAL, overlay);

    LdapUser::new(entry.dn.clone(), user)
}

/// Maps a group entry, its resolved parent name and its overlay to a group.
#[must_use]
pub fn group_from_entry(entry: &DirectoryEntry, parent: Option<String>, overlay: &Overlay) -> LdapGroup {
    let mut group = Group::new(entry_name(entry));
    group.parent = parent;
    group.attributes = entry_attributes(entry, GROUP_STRUCTURAL, overlay);
    LdapGroup::new(entry.dn.clone(), group)
}

/// Maps a role entry and its overlay to a role.
#[must_use]
pub fn role_from_entry(entry: &DirectoryEntry, overlay: &Overlay) -> LdapRole {
    let mut role = Role::new(entry_name(entry));
    role.attributes = entry_attributes(entry, ROLE_STRUCTURAL, overlay);
    LdapRole::new(entry.dn.clone(), role)
}

fn entry_name(entry: &DirectoryEntry) -> String {
    rdn_value(&entry.dn)
        .or_else(|| entry.first(CN_RDN).map(str::to_string))
        .unwrap_or_default()
}

/// Attribute bag of an entry: its non-structural text attributes, with the
/// overlay's custom attributes on top.
#[must_use]
pub fn entry_attributes(entry: &DirectoryEntry, structural: &[&str], overlay: &Overlay) -> Attributes {
    let mut attributes: Attributes = entry
        .attrs
        .iter()
        .filter(|(name, _)| !structural.iter().any(|s| s.eq_ignore_ascii_case(name)))
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect();
    attributes.extend_from(&overlay.attributes);
    attributes
}

/// Member DNs of a group entry, without the empty placeholder.
pub fn members(entry: &DirectoryEntry) -> impl Iterator<Item = &str> {
    entry
        .values(MEMBER)
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .filter(|dn| !dn.is_empty())
}

// ============================================================================
// Entity to Entry
// ============================================================================

/// Attributes of a new user entry. `cn` and `sn` are mandatory for
/// `inetOrgPerson` and start out as the key.
#[must_use]
pub fn new_user_entry(key: &str) -> Vec<(String, Vec<String>)> {
    vec![
        (OBJECT_CLASS.to_string(), vec![USER_CLASS.to_string()]),
        (USER_RDN.to_string(), vec![key.to_string()]),
        (FULL_NAME.to_string(), vec![key.to_string()]),
        (LAST_NAME.to_string(), vec![key.to_string()]),
    ]
}

/// Attributes of a new group entry.
///
/// `groupOfNames` requires at least one `member`, so a placeholder empty DN
/// is written; it is ignored by [`members`].
#[must_use]
pub fn new_group_entry(name: &str, object_class: &str, placeholder: bool) -> Vec<(String, Vec<String>)> {
    let mut attrs = vec![
        (OBJECT_CLASS.to_string(), vec![object_class.to_string()]),
        (CN_RDN.to_string(), vec![name.to_string()]),
    ];
    if placeholder {
        attrs.push((MEMBER.to_string(), vec![String::new()]));
    }
    attrs
}

/// Attributes of a new role entry.
#[must_use]
pub fn new_role_entry(name: &str) -> Vec<(String, Vec<String>)> {
    vec![
        (OBJECT_CLASS.to_string(), vec![ROLE_CLASS.to_string()]),
        (CN_RDN.to_string(), vec![name.to_string()]),
    ]
}

/// Attributes of a new membership entry below a group.
#[must_use]
pub fn new_membership_entry(role: &str, user_dn: &str) -> Vec<(String, Vec<String>)> {
    vec![
        (OBJECT_CLASS.to_string(), vec![ROLE_CLASS.to_string()]),
        (CN_RDN.to_string(), vec![role.to_string()]),
        (ROLE_OCCUPANT.to_string(), vec![user_dn.to_string()]),
    ]
}

/// Modifications persisting a user's profile fields. Mandatory attributes
/// fall back to the key; cleared optional fields are removed.
#[must_use]
pub fn profile_modifications(user: &User) -> Vec<Modification> {
    let or_key = |value: &Option<String>| vec![value.clone().unwrap_or_else(|| user.key.clone())];
    let optional = |value: &Option<String>| value.iter().cloned().collect::<Vec<_>>();

    vec![
        Modification::replace(FULL_NAME, &or_key(&user.full_name)),
        Modification::replace(LAST_NAME, &or_key(&user.last_name)),
        Modification::replace(FIRST_NAME, &optional(&user.first_name)),
        Modification::replace(EMAIL, &optional(&user.email)),
    ]
}

/// Active Directory `unicodePwd` encoding: the quoted password in UTF-16LE.
#[must_use]
pub fn unicode_pwd(password: &str) -> Vec<u8> {
    format!("\"{password}\"")
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_entry() -> DirectoryEntry {
        let mut entry = DirectoryEntry::new("uid=asaldhana,ou=People,dc=example,dc=org");
        for (name, value) in [
            ("objectClass", "inetOrgPerson"),
            ("uid", "asaldhana"),
            ("cn", "Anil Saldhana"),
            ("sn", "Saldhana"),
            ("givenName", "Anil"),
            ("mail", "myemail@company.com"),
            ("telephoneNumber", "12345"),
        ] {
            entry.attrs.insert(name.to_string(), vec![value.to_string()]);
        }
        entry
    }

    #[test]
    fn user_mapping() {
        let mut overlay = Overlay::default();
        overlay
            .attributes
            .set("QuestionTotal", vec!["2".to_string()]);

        let user = user_from_entry(&user_entry(), &overlay);

        assert_eq!(user.key, "asaldhana");
        assert_eq!(user.first_name.as_deref(), Some("Anil"));
        assert_eq!(user.last_name.as_deref(), Some("Saldhana"));
        assert_eq!(user.email.as_deref(), Some("myemail@company.com"));
        assert!(user.enabled);
        assert_eq!(user.attributes.first("telephoneNumber"), Some("12345"));
        assert_eq!(user.attributes.first("QuestionTotal"), Some("2"));
        assert!(!user.attributes.contains("uid"));
        assert!(!user.attributes.contains("objectClass"));
    }

    #[test]
    fn members_skip_placeholder() {
        let mut entry = DirectoryEntry::new("cn=Administrators,ou=Groups,dc=example,dc=org");
        entry.attrs.insert(
            "member".to_string(),
            vec![String::new(), "cn=Staff,ou=Groups,dc=example,dc=org".to_string()],
        );
        let members: Vec<&str> = members(&entry).collect();
        assert_eq!(members, vec!["cn=Staff,ou=Groups,dc=example,dc=org"]);
    }

    #[test]
    fn profile_falls_back_to_key() {
        let user = User::new("asaldhana").with_first_name("Anil");
        let mods = profile_modifications(&user);

        assert!(mods.contains(&Modification::replace("cn", &["asaldhana".to_string()])));
        assert!(mods.contains(&Modification::replace("givenName", &["Anil".to_string()])));
        assert!(mods.contains(&Modification::Replace("mail".to_string(), Vec::new())));
    }

    #[test]
    fn unicode_pwd_is_quoted_utf16le() {
        assert_eq!(unicode_pwd("a"), vec![b'"', 0, b'a', 0, b'"', 0]);
    }
}
