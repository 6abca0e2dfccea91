//! Content fingerprinting for change detection.
//!
//! This module provides SHA256-based fingerprints of raw file bytes. A
//! fingerprint is a cheap pre-filter: the scanner only reads, compares and
//! diffs a file when its fingerprint differs from the last synced one.
//! It is never the authoritative change test, full-content comparison is.

use std::fmt;

use sha2::{Digest, Sha256};

/// Fixed-length (32 byte) SHA256 digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Lowercase hex rendering (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        use fmt::Write;

        self.0.iter().fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the fingerprint of a byte slice.
///
/// Deterministic: the same bytes always produce the same digest.
///
/// # Example
///
/// ```
/// use codesync::sync::fingerprint;
///
/// let a = fingerprint(b"x=1\n");
/// assert_eq!(a, fingerprint(b"x=1\n"));
/// assert_ne!(a, fingerprint(b"x=2\n"));
/// ```
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint(hasher.finalize().into())
}

/// Check if a file needs a closer look since its last sync.
///
/// Returns `true` if:
/// - There is no stored fingerprint (never synced, or the last upload failed)
/// - The current fingerprint differs from the stored one
///
/// Returns `false` if the fingerprints match.
#[must_use]
pub fn has_changed(current: &Fingerprint, stored: Option<&Fingerprint>) -> bool {
    stored.is_none_or(|f| f != current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let first = fingerprint(b"print('hello')\n");
        let second = fingerprint(b"print('hello')\n");

        assert_eq!(first, second);
        assert_eq!(first.to_hex().len(), 64); // SHA256 produces 64 hex chars
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_ne!(fingerprint(b"x=1"), fingerprint(b"x=2"));
    }

    #[test]
    fn test_fingerprint_known_value() {
        // SHA256 of the empty input
        assert_eq!(
            fingerprint(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_has_changed_no_stored_fingerprint() {
        assert!(has_changed(&fingerprint(b"abc"), None));
    }

    #[test]
    fn test_has_changed_different_fingerprint() {
        let stored = fingerprint(b"xyz");
        assert!(has_changed(&fingerprint(b"abc"), Some(&stored)));
    }

    #[test]
    fn test_has_changed_same_fingerprint() {
        let stored = fingerprint(b"abc");
        assert!(!has_changed(&fingerprint(b"abc"), Some(&stored)));
    }
}
