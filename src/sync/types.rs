//! Sync types for change tracking and changelogs.
//!
//! This module defines the persisted changelog record, the in-memory
//! per-file state kept by the scanner, and sync-level errors.

use serde::{Deserialize, Serialize};

use super::hash::Fingerprint;

/// One detected change to a watched file.
///
/// Serialized as `{"timestamp": "...", "changes": "..."}` inside the file's
/// changelog array. Entries are never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Local wall-clock time of detection (`%Y-%m-%d %H:%M:%S`).
    pub timestamp: String,
    /// Unified diff from the previous content to the new content.
    pub changes: String,
}

impl ChangelogEntry {
    /// Create a new entry.
    pub fn new(timestamp: impl Into<String>, changes: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            changes: changes.into(),
        }
    }
}

/// Last-known state of a watched file.
///
/// `fingerprint` is only set once the current content has been uploaded, so
/// a file whose upload failed is looked at again on the next cycle.
#[derive(Debug, Clone, Default)]
pub struct WatchedFile {
    /// Fingerprint of the last successfully uploaded content.
    pub fingerprint: Option<Fingerprint>,
    /// Last content recorded in the changelog (empty before first sight).
    pub content: Vec<u8>,
}

impl WatchedFile {
    /// Fast path: does the fingerprint suggest a change worth checking?
    #[must_use]
    pub fn needs_check(&self, current: &Fingerprint) -> bool {
        super::hash::has_changed(current, self.fingerprint.as_ref())
    }

    /// Authoritative test: does `content` differ byte-for-byte from the
    /// last-known content?
    #[must_use]
    pub fn differs(&self, content: &[u8]) -> bool {
        self.content != content
    }
}

/// Summary of a persisted changelog, used by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangelogSummary {
    /// Watched filename (relative, `/` separated).
    pub filename: String,
    /// Number of entries in the changelog.
    pub entries: usize,
    /// Timestamp of the newest entry.
    pub last_change: Option<String>,
    /// Size of the changelog file in bytes.
    pub size: u64,
}

/// Statistics for one scan cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files matching the configured extensions.
    pub scanned: usize,
    /// Changelog entries appended.
    pub changed: usize,
    /// Successful uploads.
    pub uploaded: usize,
    /// Files whose read, changelog append or upload failed.
    pub failed: usize,
}

impl ScanStats {
    /// Whether the cycle did nothing beyond looking.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.changed == 0 && self.uploaded == 0 && self.failed == 0
    }
}

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal error.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Filename cannot be mapped to a changelog path.
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::hash::fingerprint;

    #[test]
    fn test_entry_serializes_with_changes_key() {
        let entry = ChangelogEntry::new("2025-01-20 10:00:00", "+x=1\n");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["timestamp"], "2025-01-20 10:00:00");
        assert_eq!(json["changes"], "+x=1\n");
    }

    #[test]
    fn test_new_watched_file_needs_check() {
        let file = WatchedFile::default();
        assert!(file.needs_check(&fingerprint(b"")));
        assert!(!file.differs(b""));
        assert!(file.differs(b"x=1"));
    }

    #[test]
    fn test_collision_does_not_hide_content_change() {
        // Fingerprint says "unchanged" but the content really differs: the
        // authoritative comparison still catches it.
        let file = WatchedFile {
            fingerprint: Some(fingerprint(b"x=2")),
            content: b"x=1".to_vec(),
        };

        assert!(!file.needs_check(&fingerprint(b"x=2")));
        assert!(file.differs(b"x=2"));
    }

    #[test]
    fn test_scan_stats_idle() {
        let mut stats = ScanStats {
            scanned: 3,
            ..ScanStats::default()
        };
        assert!(stats.is_idle());

        stats.uploaded = 1;
        assert!(!stats.is_idle());
    }
}
