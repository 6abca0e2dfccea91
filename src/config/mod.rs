//! Configuration management.
//!
//! A run is described by an immutable [`SyncConfig`], resolved once at
//! startup with this priority:
//! 1. Command-line flag or its environment variable
//! 2. The config file (`~/.codesync/config.json`, or `--config`)
//! 3. Built-in defaults
//!
//! A missing config file means defaults; a malformed one is a fatal
//! configuration error.

mod pid;

pub use pid::PidMarker;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::RemoteKind;

/// Default remote folder name.
pub const DEFAULT_FOLDER_NAME: &str = "CodeSync";
/// Default watched extensions (comma separated).
pub const DEFAULT_FILE_TYPES: &str = ".py";
/// Default scan interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 120;
/// Default changelog directory (relative to the working directory).
pub const DEFAULT_CHANGELOG_DIR: &str = "changelogs";
/// Default PID marker file (relative to the working directory).
pub const DEFAULT_PID_FILE: &str = "sync.pid";

/// Immutable settings for one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Directory scanned for watched files.
    pub watch_dir: PathBuf,
    /// Filename suffixes to watch, each starting with `.`.
    pub extensions: Vec<String>,
    /// Pause between scan cycles.
    pub interval: Duration,
    /// Where changelogs are persisted.
    pub changelog_dir: PathBuf,
    /// Remote folder the files are mirrored into.
    pub folder_name: String,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// PID marker written while running.
    pub pid_file: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("."),
            extensions: parse_extensions(DEFAULT_FILE_TYPES),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            changelog_dir: PathBuf::from(DEFAULT_CHANGELOG_DIR),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            recursive: false,
            pid_file: PathBuf::from(DEFAULT_PID_FILE),
        }
    }
}

impl SyncConfig {
    /// Check the settings before anything starts.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty extension list, a zero interval, a
    /// blank folder name or a missing watch directory.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one file extension must be watched".to_string(),
            ));
        }
        if self.interval < Duration::from_secs(1) {
            return Err(Error::InvalidArgument(
                "sync interval must be at least 1 second".to_string(),
            ));
        }
        if self.folder_name.trim().is_empty() {
            return Err(Error::Config("Remote folder name is empty".to_string()));
        }
        if !self.watch_dir.is_dir() {
            return Err(Error::WatchDirNotFound {
                path: self.watch_dir.clone(),
            });
        }
        Ok(())
    }

    /// Whether `file_name` ends with one of the watched extensions.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

/// Parse a comma-separated extension list.
///
/// Entries are trimmed, empty ones dropped, a missing leading `.` added, and
/// duplicates removed (first occurrence wins).
#[must_use]
pub fn parse_extensions(list: &str) -> Vec<String> {
    let mut extensions: Vec<String> = Vec::new();

    for raw in list.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let ext = if raw.starts_with('.') {
            raw.to_string()
        } else {
            format!(".{raw}")
        };
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }

    extensions
}

/// Settings loaded from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub watch_dir: Option<PathBuf>,
    pub folder_name: Option<String>,
    /// Comma-separated extensions, e.g. `".py,.txt"`.
    pub file_types: Option<String>,
    pub interval_secs: Option<u64>,
    pub changelog_dir: Option<PathBuf>,
    pub recursive: Option<bool>,
    pub pid_file: Option<PathBuf>,
    pub remote: Option<RemoteSettings>,
}

/// Remote store settings from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    pub kind: Option<RemoteKind>,
    /// Endpoint for the HTTP store.
    pub url: Option<String>,
    /// Bearer token for the HTTP store.
    pub token: Option<String>,
    /// Root directory for the local mirror.
    pub mirror_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Changelog directory: explicit value, then file, then default.
    #[must_use]
    pub fn changelog_dir(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.changelog_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGELOG_DIR))
    }

    /// PID marker path: explicit value, then file, then default.
    #[must_use]
    pub fn pid_file(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.pid_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PID_FILE))
    }
}

/// Get the global codesync directory (`~/.codesync/`).
#[must_use]
pub fn global_codesync_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".codesync"))
}

/// Default local mirror root (`~/.codesync/mirror`).
#[must_use]
pub fn default_mirror_dir() -> Option<PathBuf> {
    global_codesync_dir().map(|dir| dir.join("mirror"))
}

/// Resolve the config file path: explicit path, then `~/.codesync/config.json`.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    global_codesync_dir().map(|dir| dir.join("config.json"))
}

/// Load the config file.
///
/// # Errors
///
/// Returns a configuration error if the file exists but cannot be read or
/// parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    let Some(path) = config_path(explicit) else {
        return Ok(ConfigFile::default());
    };

    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })
}
