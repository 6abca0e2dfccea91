//! One scan cycle over the watched directory.
//!
//! For every watched file the scanner:
//! 1. Fingerprints the bytes and skips the file if the fingerprint matches
//!    the last successful upload
//! 2. Compares the full content with the last-known content and, only if it
//!    differs, diffs it and appends a changelog entry
//! 3. Uploads the bytes, recording the fingerprint only on success
//!
//! A file whose upload fails keeps no fingerprint, so the next cycle uploads
//! it again without diffing it against itself.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::SyncConfig;
use crate::remote::{FolderHandle, RemoteStore};

use super::changelog::ChangelogStore;
use super::diff::{diff_stats, now_timestamp, unified_diff_at};
use super::hash::{Fingerprint, fingerprint};
use super::types::{ScanStats, SyncResult, WatchedFile};

/// Scans a directory and syncs changed files. Owns the last-known table.
pub struct Scanner<S> {
    config: SyncConfig,
    changelogs: ChangelogStore,
    store: Arc<S>,
    folder: FolderHandle,
    files: HashMap<String, WatchedFile>,
    fingerprinter: fn(&[u8]) -> Fingerprint,
}

impl<S: RemoteStore> Scanner<S> {
    /// Create a scanner uploading into an already resolved `folder`.
    pub fn new(config: &SyncConfig, store: Arc<S>, folder: FolderHandle) -> Self {
        Self {
            config: config.clone(),
            changelogs: ChangelogStore::new(&config.changelog_dir),
            store,
            folder,
            files: HashMap::new(),
            fingerprinter: fingerprint,
        }
    }

    /// Replace the fingerprint function.
    #[cfg(test)]
    pub(crate) fn with_fingerprinter(mut self, fingerprinter: fn(&[u8]) -> Fingerprint) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// The changelog store this scanner appends to.
    #[must_use]
    pub fn changelogs(&self) -> &ChangelogStore {
        &self.changelogs
    }

    /// Last-known state of `filename`, if it has been seen.
    #[must_use]
    pub fn tracked(&self, filename: &str) -> Option<&WatchedFile> {
        self.files.get(filename)
    }

    /// Enumerate watched files as `(relative name, path)`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch directory itself cannot be listed.
    /// Unreadable subdirectories are logged and skipped.
    pub fn watched_files(&self) -> SyncResult<Vec<(String, PathBuf)>> {
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let changelog_dir = fs::canonicalize(self.changelogs.dir()).ok();

        let walker = WalkDir::new(&self.config.watch_dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry, changelog_dir.as_deref()));

        let mut files = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            // Follows symlinks, so a linked watched file is synced too.
            if !entry.path().is_file() {
                continue;
            }

            if !self.config.matches(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.config.watch_dir) else {
                continue;
            };
            let name = relative.to_string_lossy().replace('\\', "/");
            files.push((name, entry.into_path()));
        }

        Ok(files)
    }

    /// Run one scan cycle.
    ///
    /// Per-file failures are logged and counted in [`ScanStats::failed`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the watch directory cannot be listed.
    pub async fn scan(&mut self) -> SyncResult<ScanStats> {
        let files = self.watched_files()?;
        let mut stats = ScanStats {
            scanned: files.len(),
            ..ScanStats::default()
        };

        for (name, path) in files {
            self.sync_file(&name, &path, &mut stats).await;
        }

        Ok(stats)
    }

    async fn sync_file(&mut self, name: &str, path: &Path, stats: &mut ScanStats) {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = name, error = %e, "Failed to read file");
                stats.failed += 1;
                return;
            }
        };

        let current = (self.fingerprinter)(&bytes);
        let state = self.files.entry(name.to_string()).or_default();

        if !state.needs_check(&current) {
            debug!(file = name, "Unchanged");
            return;
        }

        if state.differs(&bytes) {
            info!(file = name, "Changes detected");

            let old = String::from_utf8_lossy(&state.content);
            let new = String::from_utf8_lossy(&bytes);
            let timestamp = match self.changelogs.next_timestamp(name, &now_timestamp()) {
                Ok(timestamp) => timestamp,
                Err(e) => {
                    warn!(file = name, error = %e, "Failed to read changelog, will retry");
                    state.fingerprint = None;
                    stats.failed += 1;
                    return;
                }
            };
            let changes = unified_diff_at(name, &old, &new, &timestamp);
            let lines = diff_stats(&old, &new);

            if let Err(e) = self.changelogs.append(name, &changes, &timestamp) {
                warn!(file = name, error = %e, "Failed to update changelog, will retry");
                state.fingerprint = None;
                stats.failed += 1;
                return;
            }

            info!(file = name, added = lines.added, removed = lines.removed, "Updated changelog");
            state.content = bytes;
            stats.changed += 1;
        }

        match self.store.upload(&self.folder, name, &state.content).await {
            Ok(id) => {
                state.fingerprint = Some(current);
                stats.uploaded += 1;
                info!(file = name, remote_id = %id, store = self.store.name(), "Synced changes");
            }
            Err(e) => {
                state.fingerprint = None;
                stats.failed += 1;
                warn!(file = name, error = %e, "Upload failed, will retry next cycle");
            }
        }
    }
}

/// Hidden directories and the changelog directory are never descended into.
fn is_skipped_dir(entry: &DirEntry, changelog_dir: Option<&Path>) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    if entry.file_name().to_string_lossy().starts_with('.') {
        return true;
    }
    changelog_dir.is_some_and(|dir| fs::canonicalize(entry.path()).is_ok_and(|p| p == dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryStore;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: Arc<MemoryStore>,
        scanner: Scanner<MemoryStore>,
    }

    impl Fixture {
        async fn new(configure: impl FnOnce(&mut SyncConfig)) -> Self {
            Self::with_fingerprinter(configure, fingerprint).await
        }

        async fn with_fingerprinter(
            configure: impl FnOnce(&mut SyncConfig),
            fingerprinter: fn(&[u8]) -> Fingerprint,
        ) -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = SyncConfig {
                watch_dir: dir.path().join("src"),
                changelog_dir: dir.path().join("changelogs"),
                ..SyncConfig::default()
            };
            configure(&mut config);
            fs::create_dir_all(&config.watch_dir).unwrap();

            let store = Arc::new(MemoryStore::default());
            let folder = store.ensure_folder("CodeSync").await.unwrap();
            let scanner =
                Scanner::new(&config, Arc::clone(&store), folder).with_fingerprinter(fingerprinter);
            Self { dir, store, scanner }
        }

        fn write(&self, name: &str, content: &str) {
            let path = self.dir.path().join("src").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn history(&self, name: &str) -> Vec<crate::sync::ChangelogEntry> {
            self.scanner.changelogs().read(name).unwrap()
        }
    }

    #[tokio::test]
    async fn test_create_unchanged_edit_scenario() {
        let mut fx = Fixture::new(|_| {}).await;

        fx.write("a.py", "x=1");
        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats, ScanStats { scanned: 1, changed: 1, uploaded: 1, failed: 0 });
        let history = fx.history("a.py");
        assert_eq!(history.len(), 1);
        assert!(history[0].changes.contains("+x=1"));
        assert!(!history[0].changes.contains("-x=1"));

        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats, ScanStats { scanned: 1, changed: 0, uploaded: 0, failed: 0 });
        assert_eq!(fx.history("a.py").len(), 1);
        assert_eq!(fx.store.upload_count(), 1);

        fx.write("a.py", "x=2");
        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.uploaded, 1);
        let history = fx.history("a.py");
        assert_eq!(history.len(), 2);
        assert!(history[1].changes.contains("-x=1"));
        assert!(history[1].changes.contains("+x=2"));
        assert_eq!(fx.store.upload_count(), 2);
        assert_eq!(fx.store.last_upload("a.py").unwrap(), b"x=2");
    }

    #[tokio::test]
    async fn test_repeated_content_adds_no_entries() {
        let mut fx = Fixture::new(|_| {}).await;

        // c0, c1, c1 (repeat), c0: entries only where adjacent contents differ
        for content in ["a\n", "b\n", "b\n", "a\n"] {
            fx.write("f.py", content);
            fx.scanner.scan().await.unwrap();
        }

        assert_eq!(fx.history("f.py").len(), 3);
        assert_eq!(fx.store.upload_count(), 3);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_entry_and_retries() {
        let mut fx = Fixture::new(|_| {}).await;
        fx.write("a.py", "x=1\n");

        fx.store.set_fail_uploads(true);
        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(fx.history("a.py").len(), 1);
        assert!(fx.scanner.tracked("a.py").unwrap().fingerprint.is_none());

        fx.store.set_fail_uploads(false);
        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats.changed, 0, "retry must not re-diff the same change");
        assert_eq!(stats.uploaded, 1);
        assert_eq!(fx.history("a.py").len(), 1);
        assert_eq!(fx.store.uploaded(), vec!["a.py".to_string()]);
        assert!(fx.scanner.tracked("a.py").unwrap().fingerprint.is_some());

        let stats = fx.scanner.scan().await.unwrap();
        assert!(stats.is_idle());
    }

    #[tokio::test]
    async fn test_false_changed_fingerprint_records_nothing() {
        fn always_new(_: &[u8]) -> Fingerprint {
            use std::sync::atomic::{AtomicU8, Ordering};
            static COUNTER: AtomicU8 = AtomicU8::new(0);
            Fingerprint::from_bytes([COUNTER.fetch_add(1, Ordering::SeqCst); 32])
        }

        let mut fx = Fixture::with_fingerprinter(|_| {}, always_new).await;

        fx.write("a.py", "x=1\n");
        fx.scanner.scan().await.unwrap();
        let stats = fx.scanner.scan().await.unwrap();

        // Fingerprint always looks new, but the content is identical
        assert_eq!(stats.changed, 0);
        assert_eq!(fx.history("a.py").len(), 1);
    }

    #[tokio::test]
    async fn test_colliding_fingerprint_still_detected_once_checked() {
        fn constant(_: &[u8]) -> Fingerprint {
            Fingerprint::from_bytes([7; 32])
        }

        let mut fx = Fixture::with_fingerprinter(|_| {}, constant).await;

        fx.write("a.py", "x=1\n");
        fx.store.set_fail_uploads(true);
        fx.scanner.scan().await.unwrap();

        // Every content collides, but the failed upload left no fingerprint,
        // so the full-content comparison runs and sees the edit.
        fx.store.set_fail_uploads(false);
        fx.write("a.py", "x=2\n");
        let stats = fx.scanner.scan().await.unwrap();

        assert_eq!(stats.changed, 1);
        let history = fx.history("a.py");
        assert_eq!(history.len(), 2);
        assert!(history[1].changes.contains("+x=2"));
    }

    #[tokio::test]
    async fn test_only_matching_extensions() {
        let mut fx = Fixture::new(|c| c.extensions = vec![".py".into(), ".txt".into()]).await;
        fx.write("a.py", "a");
        fx.write("b.txt", "b");
        fx.write("c.rs", "c");
        fx.write("a.pyc", "bytes");

        let stats = fx.scanner.scan().await.unwrap();

        assert_eq!(stats.scanned, 2);
        assert_eq!(fx.store.uploaded(), vec!["a.py".to_string(), "b.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_non_recursive_ignores_subdirectories() {
        let mut fx = Fixture::new(|_| {}).await;
        fx.write("top.py", "t");
        fx.write("pkg/inner.py", "i");

        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats.scanned, 1);
    }

    #[tokio::test]
    async fn test_recursive_skips_hidden_and_changelog_dirs() {
        let mut fx = Fixture::new(|c| {
            c.recursive = true;
            c.changelog_dir = c.watch_dir.join("changelogs");
        })
        .await;
        fx.write("top.py", "t");
        fx.write("pkg/inner.py", "i");
        fx.write(".venv/lib.py", "hidden");
        fx.write("changelogs/fake.py", "log");

        let stats = fx.scanner.scan().await.unwrap();

        assert_eq!(stats.scanned, 2);
        assert_eq!(
            fx.store.uploaded(),
            vec!["pkg/inner.py".to_string(), "top.py".to_string()]
        );
        assert_eq!(fx.history("pkg/inner.py").len(), 1);
    }

    #[tokio::test]
    async fn test_missing_watch_dir_fails_cycle() {
        let mut fx = Fixture::new(|_| {}).await;
        fs::remove_dir_all(fx.dir.path().join("src")).unwrap();

        assert!(fx.scanner.scan().await.is_err());
    }

    #[tokio::test]
    async fn test_changelog_failure_skips_upload() {
        let mut fx = Fixture::new(|_| {}).await;
        fx.write("a.py", "x=1");
        // A regular file where the changelog directory should be
        fs::write(fx.dir.path().join("changelogs"), "not a dir").unwrap();

        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.changed, 0);
        assert_eq!(fx.store.upload_count(), 0);

        fs::remove_file(fx.dir.path().join("changelogs")).unwrap();
        let stats = fx.scanner.scan().await.unwrap();
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.uploaded, 1);
    }

    #[tokio::test]
    async fn test_one_bad_file_does_not_stop_others() {
        let mut fx = Fixture::new(|_| {}).await;
        fx.write("a.py", "a");
        fx.write("b.py", "b");
        fx.store.set_fail_uploads(true);

        let stats = fx.scanner.scan().await.unwrap();

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.changed, 2);
        assert_eq!(fx.history("a.py").len(), 1);
        assert_eq!(fx.history("b.py").len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_file_is_synced() {
        let mut fx = Fixture::new(|_| {}).await;
        fx.write("real.py", "x=1\n");
        let src = fx.dir.path().join("src");
        std::os::unix::fs::symlink(src.join("real.py"), src.join("link.py")).unwrap();

        let stats = fx.scanner.scan().await.unwrap();

        assert_eq!(stats.scanned, 2);
        assert_eq!(fx.store.uploaded(), vec!["link.py".to_string(), "real.py".to_string()]);
        assert_eq!(fx.store.last_upload("link.py").unwrap(), b"x=1\n");
        assert_eq!(fx.history("link.py").len(), 1);
    }

    #[tokio::test]
    async fn test_clamped_timestamp_matches_diff_header() {
        let mut fx = Fixture::new(|_| {}).await;
        let future = "2999-01-01 00:00:00";
        fx.scanner.changelogs().append("a.py", "earlier", future).unwrap();

        fx.write("a.py", "x=1\n");
        fx.scanner.scan().await.unwrap();

        let history = fx.history("a.py");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].timestamp, future);
        assert!(history[1].changes.contains(&format!("a.py (previous)\t{future}")));
    }
}
