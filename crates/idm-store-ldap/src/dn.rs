//! Distinguished name construction and inspection.

use ldap3::dn_escape;

/// RDN attribute of user entries.
pub const USER_RDN: &str = "uid";
/// RDN attribute of group, role, membership and overlay entries.
pub const CN_RDN: &str = "cn";

/// Builds `<attr>=<escaped value>,<suffix>`.
#[must_use]
pub fn child_dn(rdn_attr: &str, value: &str, suffix: &str) -> String {
    format!("{rdn_attr}={},{suffix}", dn_escape(value))
}

/// Returns `true` if `dn` lies strictly below `suffix`.
///
/// Comparison ignores case and whitespace around separators.
#[must_use]
pub fn is_below(dn: &str, suffix: &str) -> bool {
    let dn = normalize(dn);
    let suffix = normalize(suffix);
    dn.len() > suffix.len() && dn.ends_with(&suffix) && dn[..dn.len() - suffix.len()].ends_with(',')
}

/// Returns `true` if `dn` is an immediate child of `parent`.
#[must_use]
pub fn is_child_of(dn: &str, parent: &str) -> bool {
    parent_dn(dn).is_some_and(|p| same_dn(p, parent))
}

/// Case- and whitespace-insensitive DN equality.
#[must_use]
pub fn same_dn(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Returns the DN with its first RDN removed.
#[must_use]
pub fn parent_dn(dn: &str) -> Option<&str> {
    let split = first_separator(dn)?;
    Some(dn[split + 1..].trim_start())
}

/// Returns the unescaped value of the first RDN.
#[must_use]
pub fn rdn_value(dn: &str) -> Option<String> {
    let end = first_separator(dn).unwrap_or(dn.len());
    let rdn = &dn[..end];
    let (_, value) = rdn.split_once('=')?;
    Some(unescape(value.trim()))
}

fn first_separator(dn: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => return Some(i),
            _ => {}
        }
    }
    None
}

fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
            } else {
                out.push(bytes[i + 1]);
                i += 2;
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn normalize(dn: &str) -> String {
    let mut parts = Vec::new();
    let mut rest = dn;
    while let Some(split) = first_separator(rest) {
        parts.push(rest[..split].trim().to_lowercase());
        rest = &rest[split + 1..];
    }
    parts.push(rest.trim().to_lowercase());
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEOPLE: &str = "ou=People,dc=example,dc=org";

    #[test]
    fn user_dn_from_suffix() {
        assert_eq!(
            child_dn(USER_RDN, "asaldhana", PEOPLE),
            "uid=asaldhana,ou=People,dc=example,dc=org"
        );
    }

    #[test]
    fn special_characters_are_escaped() {
        let dn = child_dn(CN_RDN, "Smith, John", PEOPLE);
        assert!(dn.starts_with("cn=Smith\\2c John,") || dn.starts_with("cn=Smith\\, John,"));
        assert_eq!(rdn_value(&dn).as_deref(), Some("Smith, John"));
        assert_eq!(parent_dn(&dn), Some(PEOPLE));
    }

    #[test]
    fn suffix_containment() {
        let dn = "uid=asaldhana,ou=People,dc=example,dc=org";
        assert!(is_below(dn, PEOPLE));
        assert!(is_below(dn, "OU=people, DC=Example, DC=org"));
        assert!(!is_below(dn, "ou=Groups,dc=example,dc=org"));
        assert!(!is_below(PEOPLE, PEOPLE));
        assert!(!is_below("uid=x,xou=People,dc=example,dc=org", PEOPLE));
    }

    #[test]
    fn child_relation() {
        let group = "cn=Administrators,ou=Groups,dc=example,dc=org";
        assert!(is_child_of("cn=admin,cn=Administrators,ou=Groups,dc=example,dc=org", group));
        assert!(!is_child_of(group, group));
        assert!(same_dn(group, "CN=administrators, ou=Groups,dc=example,dc=org"));
    }
}
