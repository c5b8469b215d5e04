//! Content fingerprinting
//!
//! A fingerprint is the lowercase hex SHA-256 digest of a post's trimmed
//! text. It serves both as the dedup key and as the persisted record's
//! primary key, so it must never change for a given text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length in characters of a hex-encoded fingerprint
pub const FINGERPRINT_LEN: usize = 64;

/// A stable content identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already-computed digest, e.g. a key read back from the store
    ///
    /// Returns `None` if the value is not a 64-character hex string.
    pub fn from_hex(value: &str) -> Option<Self> {
        let is_valid =
            value.len() == FINGERPRINT_LEN && value.chars().all(|c| c.is_ascii_hexdigit());
        is_valid.then(|| Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the fingerprint of a post's text
///
/// Leading and trailing whitespace is ignored, so the crawler's trimmed
/// block text and the extractor's raw input map to the same key.
///
/// # Example
///
/// ```
/// use feed_harvest::fingerprint;
///
/// assert_eq!(fingerprint("Room for rent"), fingerprint("  Room for rent\n"));
/// assert_ne!(fingerprint("Room for rent"), fingerprint("Room for sale"));
/// ```
pub fn fingerprint(text: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let text = "台南市東區勝利路 套房出租 租金 6000";
        assert_eq!(fingerprint(text), fingerprint(text));
    }

    #[test]
    fn test_fingerprint_distinguishes_inputs() {
        let corpus = [
            "Studio near campus, 5500/month",
            "Studio near campus, 5600/month",
            "studio near campus, 5500/month",
            "雅房出租",
            "套房出租",
            "",
        ];

        for (i, a) in corpus.iter().enumerate() {
            for b in corpus.iter().skip(i + 1) {
                assert_ne!(fingerprint(a), fingerprint(b), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = fingerprint("hello");
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        // Known SHA-256 of "hello"
        assert_eq!(
            fp.as_str(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_fingerprint_ignores_surrounding_whitespace() {
        assert_eq!(fingerprint("post body"), fingerprint("\n  post body \t"));
    }

    #[test]
    fn test_from_hex() {
        let fp = fingerprint("hello");
        assert_eq!(Fingerprint::from_hex(fp.as_str()), Some(fp.clone()));
        assert_eq!(
            Fingerprint::from_hex(&fp.as_str().to_ascii_uppercase()),
            Some(fp)
        );
        assert_eq!(Fingerprint::from_hex("abc"), None);
        assert_eq!(Fingerprint::from_hex(&"z".repeat(64)), None);
    }
}
