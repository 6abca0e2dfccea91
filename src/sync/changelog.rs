//! Per-file changelog persistence.
//!
//! Each watched file owns one changelog at `<dir>/<filename>.json`: a pretty
//! printed JSON array of [`ChangelogEntry`] in chronological order. Appends
//! load the array, push one entry and rewrite the whole file atomically, so a
//! crash leaves either the old or the new array on disk, never a torn one.
//!
//! A changelog that no longer parses is treated as an empty history. On
//! append it is first moved aside to `<filename>.json.corrupt-<unix secs>`
//! so its content is never silently overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::file::{atomic_write, file_size, safe_relative_path};
use super::types::{ChangelogEntry, ChangelogSummary, SyncError, SyncResult};

const CHANGELOG_EXTENSION: &str = ".json";

/// Result of loading a changelog file.
enum Loaded {
    Missing,
    Entries(Vec<ChangelogEntry>),
    Corrupt(serde_json::Error),
}

/// Append-only changelog storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct ChangelogStore {
    dir: PathBuf,
}

impl ChangelogStore {
    /// Create a store rooted at `dir`. Nothing is touched on disk yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The changelog directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the changelog directory if it doesn't exist.
    ///
    /// Returns `true` if the directory was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dir(&self) -> SyncResult<bool> {
        if self.dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;
        info!(dir = %self.dir.display(), "Created changelog directory");
        Ok(true)
    }

    /// Map a watched filename to its changelog path.
    ///
    /// Only relative paths made of normal components are accepted, so a
    /// changelog can never land outside the store directory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidFilename`] for empty, absolute or
    /// parent-relative names.
    pub fn path_for(&self, filename: &str) -> SyncResult<PathBuf> {
        let relative = safe_relative_path(filename)
            .ok_or_else(|| SyncError::InvalidFilename(filename.to_string()))?;

        let mut path = self.dir.join(relative);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(CHANGELOG_EXTENSION);
        path.set_file_name(name);
        Ok(path)
    }

    /// Read the full history of `filename`.
    ///
    /// A missing changelog is an empty history. A corrupt one is logged and
    /// also reported as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the changelog exists but cannot be read.
    pub fn read(&self, filename: &str) -> SyncResult<Vec<ChangelogEntry>> {
        let path = self.path_for(filename)?;

        match load(&path)? {
            Loaded::Missing => Ok(Vec::new()),
            Loaded::Entries(entries) => Ok(entries),
            Loaded::Corrupt(e) => {
                warn!(
                    file = filename,
                    path = %path.display(),
                    error = %e,
                    "Changelog is corrupt, treating as empty history"
                );
                Ok(Vec::new())
            }
        }
    }

    /// The timestamp the next entry of `filename` will carry if stamped
    /// `now`: `now`, or the newest existing timestamp if the clock went back.
    ///
    /// A missing or corrupt changelog imposes no lower bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the changelog exists but cannot be read.
    pub fn next_timestamp(&self, filename: &str, now: &str) -> SyncResult<String> {
        let path = self.path_for(filename)?;
        match load(&path)? {
            Loaded::Entries(entries) => Ok(clamp_timestamp(&entries, now)),
            Loaded::Missing | Loaded::Corrupt(_) => Ok(now.to_string()),
        }
    }

    /// Append one entry to the history of `filename`.
    ///
    /// The timestamp is clamped to the newest existing entry so timestamps
    /// never decrease within one changelog (wall clocks can step back).
    ///
    /// # Errors
    ///
    /// Returns an error if the changelog cannot be read or rewritten. The
    /// previous file is left intact in that case.
    pub fn append(
        &self,
        filename: &str,
        changes: &str,
        timestamp: &str,
    ) -> SyncResult<ChangelogEntry> {
        let path = self.path_for(filename)?;

        let mut entries = match load(&path)? {
            Loaded::Missing => Vec::new(),
            Loaded::Entries(entries) => entries,
            Loaded::Corrupt(e) => {
                let backup = backup_corrupt(&path)?;
                warn!(
                    file = filename,
                    error = %e,
                    backup = %backup.display(),
                    "Changelog is corrupt, moved aside and starting a new history"
                );
                Vec::new()
            }
        };

        let entry = ChangelogEntry::new(clamp_timestamp(&entries, timestamp), changes);
        entries.push(entry.clone());

        let json = serde_json::to_string_pretty(&entries)?;
        atomic_write(&path, json)?;

        debug!(file = filename, entries = entries.len(), "Appended changelog entry");
        Ok(entry)
    }

    /// Summaries of every changelog in the store, sorted by filename.
    ///
    /// A missing store directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be traversed.
    pub fn list(&self) -> SyncResult<Vec<ChangelogSummary>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();

        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.dir) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            let Some(filename) = relative.strip_suffix(CHANGELOG_EXTENSION) else {
                continue;
            };

            let (entries, last_change) = match load(entry.path())? {
                Loaded::Entries(entries) => (entries.len(), entries.last().map(|e| e.timestamp.clone())),
                Loaded::Missing | Loaded::Corrupt(_) => (0, None),
            };

            summaries.push(ChangelogSummary {
                filename: filename.to_string(),
                entries,
                last_change,
                size: file_size(entry.path()),
            });
        }

        Ok(summaries)
    }
}

fn clamp_timestamp(entries: &[ChangelogEntry], timestamp: &str) -> String {
    match entries.last() {
        Some(last) if last.timestamp.as_str() > timestamp => last.timestamp.clone(),
        _ => timestamp.to_string(),
    }
}

/// Load and parse a changelog file.
fn load(path: &Path) -> SyncResult<Loaded> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&content) {
        Ok(entries) => Ok(Loaded::Entries(entries)),
        Err(e) => Ok(Loaded::Corrupt(e)),
    }
}

/// Move a corrupt changelog aside and return its new path.
fn backup_corrupt(path: &Path) -> SyncResult<PathBuf> {
    let stamp = chrono::Utc::now().timestamp();
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{stamp}"));
    let backup = path.with_file_name(name);
    fs::rename(path, &backup)?;
    Ok(backup)
}
