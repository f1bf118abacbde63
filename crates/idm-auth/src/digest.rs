//! Salted SHA-2 password encoding.
//!
//! Encodes as `<algorithm>$<hex salt>$<hex digest>` where the digest is
//! taken over the password bytes followed by the salt bytes. Intended for
//! credential databases that already hold digest-based passwords; new
//! deployments should prefer Argon2id.

use idm_store::{PasswordEncoder, StorageError, StorageResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Default salt length in bytes.
const DEFAULT_SALT_LEN: usize = 16;

/// SHA-2 output size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestStrength {
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    #[default]
    Sha512,
}

impl DigestStrength {
    /// Returns the algorithm tag written in front of encodings.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha-256",
            Self::Sha384 => "sha-384",
            Self::Sha512 => "sha-512",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sha-256" => Some(Self::Sha256),
            "sha-384" => Some(Self::Sha384),
            "sha-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    fn digest(self, password: &[u8], salt: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => salted::<Sha256>(password, salt),
            Self::Sha384 => salted::<Sha384>(password, salt),
            Self::Sha512 => salted::<Sha512>(password, salt),
        }
    }
}

fn salted<D: Digest>(password: &[u8], salt: &[u8]) -> Vec<u8> {
    D::new()
        .chain_update(password)
        .chain_update(salt)
        .finalize()
        .to_vec()
}

/// Password encoder using a salted SHA-2 digest.
#[derive(Debug, Clone)]
pub struct SaltedDigestEncoder {
    strength: DigestStrength,
    salt_len: usize,
}

impl SaltedDigestEncoder {
    /// Creates an encoder with the given strength.
    #[must_use]
    pub const fn new(strength: DigestStrength) -> Self {
        Self {
            strength,
            salt_len: DEFAULT_SALT_LEN,
        }
    }

    /// Sets the salt length in bytes.
    #[must_use]
    pub const fn salt_len(mut self, len: usize) -> Self {
        self.salt_len = len;
        self
    }
}

impl Default for SaltedDigestEncoder {
    fn default() -> Self {
        Self::new(DigestStrength::default())
    }
}

impl PasswordEncoder for SaltedDigestEncoder {
    fn encode(&self, password: &str) -> StorageResult<String> {
        let mut salt = vec![0u8; self.salt_len];
        rand::thread_rng().fill_bytes(&mut salt);

        let digest = self.strength.digest(password.as_bytes(), &salt);
        Ok(format!(
            "{}${}${}",
            self.strength.tag(),
            hex::encode(&salt),
            hex::encode(digest)
        ))
    }

    fn verify(&self, password: &str, encoded: &str) -> StorageResult<bool> {
        let mut parts = encoded.splitn(3, '$');
        let (Some(tag), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(StorageError::Credential(
                "malformed digest encoding".to_string(),
            ));
        };

        // Verify with the strength recorded in the encoding, not our own
        let strength = DigestStrength::from_tag(tag)
            .ok_or_else(|| StorageError::Credential(format!("unknown digest '{tag}'")))?;
        let salt = hex::decode(salt).map_err(|e| StorageError::Credential(e.to_string()))?;
        let expected =
            hex::decode(expected).map_err(|e| StorageError::Credential(e.to_string()))?;

        let actual = strength.digest(password.as_bytes(), &salt);
        Ok(constant_time_eq(&actual, &expected))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_verify() {
        let encoder = SaltedDigestEncoder::default();
        let encoded = encoder.encode("secret").unwrap();

        assert!(encoded.starts_with("sha-512$"));
        assert!(encoder.verify("secret", &encoded).unwrap());
        assert!(!encoder.verify("Secret", &encoded).unwrap());
    }

    #[test]
    fn salts_differ_between_encodings() {
        let encoder = SaltedDigestEncoder::new(DigestStrength::Sha256);
        assert_ne!(encoder.encode("pw").unwrap(), encoder.encode("pw").unwrap());
    }

    #[test]
    fn verifies_other_strengths() {
        let encoded = SaltedDigestEncoder::new(DigestStrength::Sha384)
            .salt_len(8)
            .encode("pw")
            .unwrap();

        let verifier = SaltedDigestEncoder::new(DigestStrength::Sha512);
        assert!(verifier.verify("pw", &encoded).unwrap());
    }

    #[test]
    fn known_vector() {
        // SHA-256("abc" || "") with an empty salt
        let encoded =
            "sha-256$$ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        let encoder = SaltedDigestEncoder::new(DigestStrength::Sha256);
        assert!(encoder.verify("abc", encoded).unwrap());
    }

    #[test]
    fn malformed_encoding_is_an_error() {
        let encoder = SaltedDigestEncoder::default();
        assert!(encoder.verify("pw", "nodollars").is_err());
        assert!(encoder.verify("pw", "md5$00$00").is_err());
        assert!(encoder.verify("pw", "sha-512$zz$00").is_err());
    }
}
