//! Error types for codesync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=not_found, 4=validation, 6=remote, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for `--json` consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for codesync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (exit 3)
    WatchDirNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidFilename,

    // Remote (exit 6)
    RemoteError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    Interrupted,
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::WatchDirNotFound => "WATCH_DIR_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidFilename => "INVALID_FILENAME",
            Self::RemoteError => "REMOTE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::Interrupted => "INTERRUPTED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted | Self::InternalError => 1,
            Self::WatchDirNotFound => 3,
            Self::InvalidArgument | Self::InvalidFilename => 4,
            Self::RemoteError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying the same command later may succeed.
    ///
    /// True for remote and I/O failures, false for bad input or config.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteError | Self::IoError)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in codesync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Watch directory not found: {}", path.display())]
    WatchDirNotFound { path: PathBuf },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interrupted while shutting down")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::WatchDirNotFound { .. } => ErrorCode::WatchDirNotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Remote(_) => ErrorCode::RemoteError,
            Self::Sync(SyncError::InvalidFilename(_)) => ErrorCode::InvalidFilename,
            Self::Sync(SyncError::Io(_) | SyncError::Walk(_)) | Self::Io(_) => ErrorCode::IoError,
            Self::Sync(SyncError::Json(_)) | Self::Json(_) => ErrorCode::JsonError,
            Self::Interrupted => ErrorCode::Interrupted,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::WatchDirNotFound { path } => Some(format!(
                "Create {} or pass an existing directory with --dir",
                path.display()
            )),

            Self::Config(msg) => {
                if msg.contains("endpoint") {
                    Some(
                        "Pass --remote-url, set CODESYNC_REMOTE_URL, or use --remote local"
                            .to_string(),
                    )
                } else if msg.contains("config file") {
                    Some("Fix or remove ~/.codesync/config.json (or the file given by --config)".to_string())
                } else {
                    None
                }
            }

            Self::InvalidArgument(msg) => {
                if msg.contains("extension") {
                    Some("Use comma-separated extensions, e.g. --file-types .py,.txt".to_string())
                } else if msg.contains("interval") {
                    Some("The interval is in seconds and must be at least 1".to_string())
                } else {
                    None
                }
            }

            Self::Sync(SyncError::InvalidFilename(_)) => Some(
                "Use the path relative to the watched directory, e.g. `codesync history pkg/mod.py`"
                    .to_string(),
            ),

            Self::Remote(_) => {
                Some("Check that the remote store is reachable and the token is valid".to_string())
            }

            Self::Sync(_) | Self::Io(_) | Self::Json(_) | Self::Interrupted | Self::Other(_) => {
                None
            }
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
