//! PID marker file.
//!
//! While the sync loop runs, the process ID is written to a marker file
//! (`sync.pid` by default) so external tooling can find and signal the
//! process. The sync engine itself never reads it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::sync::atomic_write;

/// A written PID marker. Remove it with [`PidMarker::remove`] on shutdown.
#[derive(Debug)]
pub struct PidMarker {
    path: PathBuf,
    pid: u32,
}

impl PidMarker {
    /// Write the current process ID to `path`.
    ///
    /// An existing marker is replaced (it is stale if we got this far).
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn write(path: &Path) -> Result<Self> {
        let pid = std::process::id();

        if let Some(existing) = Self::read(path) {
            warn!(path = %path.display(), pid = existing, "Replacing existing PID marker");
        }

        atomic_write(path, pid.to_string())?;
        debug!(path = %path.display(), pid, "Wrote PID marker");

        Ok(Self {
            path: path.to_path_buf(),
            pid,
        })
    }

    /// Read the PID stored at `path`, if any.
    #[must_use]
    pub fn read(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// The recorded process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Delete the marker file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sync.pid");

        let marker = PidMarker::write(&path).unwrap();
        assert_eq!(marker.pid(), std::process::id());
        assert_eq!(PidMarker::read(&path), Some(std::process::id()));

        marker.remove().unwrap();
        assert!(!path.exists());
        assert_eq!(PidMarker::read(&path), None);
    }

    #[test]
    fn test_replaces_stale_marker() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sync.pid");
        fs::write(&path, "999999").unwrap();

        PidMarker::write(&path).unwrap();
        assert_eq!(PidMarker::read(&path), Some(std::process::id()));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sync.pid");
        let marker = PidMarker::write(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(marker.remove().is_ok());
    }
}
