//! Change detection, changelogs and the sync loop.
//!
//! - **Hashing**: SHA-256 fingerprints as a fast "might have changed" check
//! - **Diff**: unified diffs between the last-known and current content
//! - **Changelog**: append-only JSON history per watched file
//! - **Scanner**: one pass over the watched directory
//! - **Service**: the Idle/Running lifecycle around the periodic loop
//!
//! # Change detection
//!
//! A file is only diffed when its fingerprint differs from the one recorded
//! at its last successful upload, and only logged when its bytes differ from
//! the last-known content. Exactly one changelog entry is written per
//! distinct change, no matter how many cycles it takes to upload.
//!
//! # Changelog format
//!
//! `<changelog_dir>/<relative name>.json` holds a JSON array, oldest first:
//! ```json
//! [{"timestamp": "2025-01-20 10:00:00", "changes": "--- a.py (previous)\t..."}]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use codesync::sync::{SyncService, STOP_TIMEOUT};
//!
//! let running = SyncService::new(config, store).start().await?;
//! // ...
//! running.stop(STOP_TIMEOUT).await?;
//! ```

mod changelog;
mod diff;
mod file;
mod hash;
mod scanner;
mod service;
mod types;

pub use changelog::ChangelogStore;
pub use diff::{
    CONTEXT_LINES, DiffStats, TIMESTAMP_FORMAT, diff_stats, now_timestamp, unified_diff,
    unified_diff_at,
};
pub use file::{atomic_write, file_size, safe_relative_path, temp_path};
pub use hash::{Fingerprint, fingerprint, has_changed};
pub use scanner::Scanner;
pub use service::{Lifecycle, RunningSync, STOP_TIMEOUT, StopOutcome, SyncService, SyncState};
pub use types::{ChangelogEntry, ChangelogSummary, ScanStats, SyncError, SyncResult, WatchedFile};
