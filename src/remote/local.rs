//! Local directory mirror.
//!
//! Mirrors uploads into `<root>/<folder>/<relative path>`. Useful as the
//! default store, for backups onto a mounted network share, and for tests.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::sync::{atomic_write, safe_relative_path};

use super::{FolderHandle, RemoteFileId, RemoteStore};

/// Remote store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    root: PathBuf,
}

impl LocalMirror {
    /// Create a mirror rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The mirror root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RemoteStore for LocalMirror {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn ensure_folder(&self, name: &str) -> Result<FolderHandle> {
        let relative = safe_relative_path(name)
            .ok_or_else(|| Error::Config(format!("Invalid remote folder name: '{name}'")))?;
        let path = self.root.join(relative);

        if path.is_dir() {
            info!(folder = name, path = %path.display(), "Using existing folder");
        } else {
            fs::create_dir_all(&path).map_err(|e| {
                Error::Remote(format!("Failed to create folder {}: {e}", path.display()))
            })?;
            info!(folder = name, path = %path.display(), "Created new folder");
        }

        Ok(FolderHandle {
            id: path.display().to_string(),
            name: name.to_string(),
        })
    }

    async fn upload(&self, folder: &FolderHandle, filename: &str, bytes: &[u8]) -> Result<RemoteFileId> {
        let relative = safe_relative_path(filename)
            .ok_or_else(|| Error::Remote(format!("Refusing to mirror '{filename}'")))?;
        let path = PathBuf::from(&folder.id).join(relative);

        atomic_write(&path, bytes)
            .map_err(|e| Error::Remote(format!("Failed to write {}: {e}", path.display())))?;

        Ok(RemoteFileId(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_folder_creates_and_reuses() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalMirror::new(temp_dir.path().join("mirror"));

        let first = store.ensure_folder("CodeSync").await.unwrap();
        let second = store.ensure_folder("CodeSync").await.unwrap();

        assert_eq!(first, second);
        assert!(temp_dir.path().join("mirror").join("CodeSync").is_dir());
    }

    #[tokio::test]
    async fn test_upload_creates_then_updates() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalMirror::new(temp_dir.path());
        let folder = store.ensure_folder("CodeSync").await.unwrap();

        let id = store.upload(&folder, "pkg/a.py", b"x=1").await.unwrap();
        store.upload(&folder, "pkg/a.py", b"x=2").await.unwrap();

        let path = temp_dir.path().join("CodeSync").join("pkg").join("a.py");
        assert_eq!(id.0, path.display().to_string());
        assert_eq!(fs::read_to_string(path).unwrap(), "x=2");
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalMirror::new(temp_dir.path());

        assert!(matches!(store.ensure_folder("../out").await, Err(Error::Config(_))));

        let folder = store.ensure_folder("CodeSync").await.unwrap();
        assert!(matches!(store.upload(&folder, "../a.py", b"x").await, Err(Error::Remote(_))));
    }
}
