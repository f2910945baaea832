//! Content-addressed artifact identifiers.
//!
//! The backend keys every firmware image by `<sha256 hex>_<byte length>`.
//! Identifiers computed here must match the ones the backend already stores.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier of an artifact's (possibly truncated) byte content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Compute the identifier for the given bytes.
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(format!("{:x}_{}", digest, content.len()))
    }

    /// Wrap an identifier string reported by the backend.
    pub fn from_backend(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let id = ContentId::of(b"hello world");
        assert_eq!(
            id.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9_11"
        );
    }

    #[test]
    fn test_empty_content() {
        let id = ContentId::of(&[]);
        assert_eq!(
            id.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855_0"
        );
        assert!(id.as_str().ends_with("_0"));
    }

    #[test]
    fn test_deterministic() {
        let data = vec![0x7fu8; 4096];
        assert_eq!(ContentId::of(&data), ContentId::of(&data.clone()));
    }

    #[test]
    fn test_length_changes_identifier() {
        let a = ContentId::of(&[0u8; 16]);
        let b = ContentId::of(&[0u8; 17]);
        assert_ne!(a, b);
        assert!(a.as_str().ends_with("_16"));
        assert!(b.as_str().ends_with("_17"));
    }

    #[test]
    fn test_lowercase_hex() {
        let id = ContentId::of(b"\xde\xad\xbe\xef");
        let (hex, _) = id.as_str().split_once('_').unwrap();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ContentId::from_backend("abc_3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc_3\"");
    }
}
