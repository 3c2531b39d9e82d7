use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content hash of a stored document's bytes.
///
/// A `Revision` is the BLAKE3 hash of the full file contents. Identical
/// bytes always produce the same revision, so a caller can present the
/// revision it read to detect an intervening write.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision([u8; 32]);

impl Revision {
    /// Compute the revision of raw document bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.short_hex())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_is_deterministic() {
        assert_eq!(Revision::of(b"hello world"), Revision::of(b"hello world"));
        assert_ne!(Revision::of(b"hello"), Revision::of(b"world"));
    }

    #[test]
    fn hex_roundtrip() {
        let rev = Revision::of(b"test");
        let parsed = Revision::from_hex(&rev.to_hex()).unwrap();
        assert_eq!(rev, parsed);
        assert_eq!(rev.short_hex().len(), 8);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(Revision::from_hex("zz"), Err(TypeError::InvalidHex(_))));
        assert!(matches!(
            Revision::from_hex("abcd"),
            Err(TypeError::InvalidLength { expected: 32, actual: 2 })
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let rev = Revision::of(b"serde");
        let json = serde_json::to_string(&rev).unwrap();
        assert_eq!(json, format!("\"{}\"", rev.to_hex()));
        let back: Revision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rev);
    }
}
