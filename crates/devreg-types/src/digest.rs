use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::TypeError;

const SHA256_PREFIX: &str = "sha256:";

/// Content digest of a registry blob or manifest.
///
/// Always `sha256:` followed by 64 lowercase hex characters. Identical bytes
/// always produce the same `Digest`, which is what makes repeated pushes of
/// an unchanged stack idempotent.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the SHA-256 digest of `data`.
    pub fn sha256(data: &[u8]) -> Self {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&Sha256::digest(data));
        Self(arr)
    }

    /// Hex-encoded hash without the algorithm prefix.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 12 characters), for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Returns `true` if `data` hashes to this digest.
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::sha256(data) == *self
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((algorithm, encoded)) = s.split_once(':') else {
            return Err(TypeError::InvalidDigest(s.to_string()));
        };
        if algorithm != "sha256" {
            return Err(TypeError::UnsupportedAlgorithm(algorithm.to_string()));
        }
        if encoded.len() != 64 || encoded.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(TypeError::InvalidDigest(s.to_string()));
        }
        let bytes = hex::decode(encoded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl TryFrom<String> for Digest {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({SHA256_PREFIX}{})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SHA256_PREFIX}{}", self.hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_known_digest() {
        let d = Digest::sha256(b"");
        assert_eq!(
            d.to_string(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(Digest::sha256(b"schemaVersion: 2.0.0"), Digest::sha256(b"schemaVersion: 2.0.0"));
        assert_ne!(Digest::sha256(b"a"), Digest::sha256(b"b"));
    }

    #[test]
    fn parse_display_roundtrip() {
        let d = Digest::sha256(b"devfile");
        let parsed: Digest = d.to_string().parse().unwrap();
        assert_eq!(parsed, d);
    }

    #[test]
    fn rejects_other_algorithms() {
        let err = "sha512:abcd".parse::<Digest>().unwrap_err();
        assert_eq!(err, TypeError::UnsupportedAlgorithm("sha512".into()));
    }

    #[test]
    fn rejects_malformed() {
        assert!("nocolon".parse::<Digest>().is_err());
        assert!("sha256:abc".parse::<Digest>().is_err());
        let upper = format!("sha256:{}", "A".repeat(64));
        assert!(upper.parse::<Digest>().is_err());
        let not_hex = format!("sha256:{}", "z".repeat(64));
        assert!(matches!(not_hex.parse::<Digest>(), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn verify_detects_tampering() {
        let d = Digest::sha256(b"original");
        assert!(d.verify(b"original"));
        assert!(!d.verify(b"tampered"));
    }

    #[test]
    fn serde_as_string() {
        let d = Digest::sha256(b"x");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{d}\""));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert!(serde_json::from_str::<Digest>("\"md5:00\"").is_err());
    }
}
