//! In-memory store that records uploads, for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

use super::{FolderHandle, RemoteFileId, RemoteStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    fail_uploads: AtomicBool,
    fail_folder: AtomicBool,
}

impl MemoryStore {
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_folder(&self, fail: bool) {
        self.fail_folder.store(fail, Ordering::SeqCst);
    }

    /// Filenames uploaded so far, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    /// Bytes of the most recent upload of `filename`.
    pub fn last_upload(&self, filename: &str) -> Option<Vec<u8>> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.clone())
    }
}

impl RemoteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_folder(&self, name: &str) -> Result<FolderHandle> {
        if self.fail_folder.load(Ordering::SeqCst) {
            return Err(Error::Remote("folder lookup refused".into()));
        }
        Ok(FolderHandle {
            id: format!("mem-{name}"),
            name: name.to_string(),
        })
    }

    async fn upload(&self, _folder: &FolderHandle, filename: &str, bytes: &[u8]) -> Result<RemoteFileId> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(Error::Remote("upload refused".into()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((filename.to_string(), bytes.to_vec()));
        Ok(RemoteFileId(format!("mem-{}", uploads.len())))
    }
}
