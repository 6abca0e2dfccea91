//! Remote store collaborators.
//!
//! The sync loop only needs two capabilities from a remote store: resolve
//! (or create) a target folder once at startup, and upload the current bytes
//! of a changed file into it. Everything provider-specific lives behind the
//! [`RemoteStore`] trait.
//!
//! - [`LocalMirror`] - mirrors files into a local directory tree
//! - [`HttpStore`] - generic HTTP object store (`PUT` folder, `PUT` file)

mod http;
mod local;
#[cfg(test)]
pub(crate) mod memory;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use http::HttpStore;
pub use local::LocalMirror;

/// Handle to a resolved remote folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    /// Store-specific folder identifier.
    pub id: String,
    /// Human-readable folder name.
    pub name: String,
}

/// Store-specific identifier of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileId(pub String);

impl fmt::Display for RemoteFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which remote store implementation to use.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    /// Mirror into a local directory
    #[default]
    Local,
    /// Generic HTTP object store
    Http,
}

/// Trait for remote stores.
///
/// Uploads create the remote file on first sight and replace its content
/// afterwards. Implementations must be safe to share with the sync worker.
pub trait RemoteStore: Send + Sync {
    /// Short store name for logs.
    fn name(&self) -> &'static str;

    /// Find the folder called `name`, creating it if missing.
    fn ensure_folder(&self, name: &str) -> impl Future<Output = Result<FolderHandle>> + Send;

    /// Create or update `filename` inside `folder` with `bytes`.
    fn upload(
        &self,
        folder: &FolderHandle,
        filename: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<RemoteFileId>> + Send;
}

/// A store chosen at runtime from configuration.
#[derive(Debug)]
pub enum AnyStore {
    Local(LocalMirror),
    Http(HttpStore),
}

impl RemoteStore for AnyStore {
    fn name(&self) -> &'static str {
        match self {
            Self::Local(store) => store.name(),
            Self::Http(store) => store.name(),
        }
    }

    async fn ensure_folder(&self, name: &str) -> Result<FolderHandle> {
        match self {
            Self::Local(store) => store.ensure_folder(name).await,
            Self::Http(store) => store.ensure_folder(name).await,
        }
    }

    async fn upload(&self, folder: &FolderHandle, filename: &str, bytes: &[u8]) -> Result<RemoteFileId> {
        match self {
            Self::Local(store) => store.upload(folder, filename, bytes).await,
            Self::Http(store) => store.upload(folder, filename, bytes).await,
        }
    }
}
