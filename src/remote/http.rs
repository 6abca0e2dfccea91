//! Generic HTTP object store.
//!
//! Speaks a minimal create-or-update protocol:
//! - `PUT {endpoint}/folders/{name}` returns `{"id": "..."}` for the folder
//! - `PUT {endpoint}/folders/{folder_id}/files/{path...}` with the raw file
//!   bytes returns `{"id": "..."}` for the stored file
//!
//! Requests carry an optional bearer token. Retries are left to the sync
//! loop, which re-uploads a failed file on the next cycle.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{FolderHandle, RemoteFileId, RemoteStore};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote store speaking the HTTP protocol above.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

/// Response body for folder and file `PUT`s.
#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

impl HttpStore {
    /// Create a store for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the endpoint is not an absolute
    /// `http`/`https` URL.
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| Error::Config(format!("Invalid remote endpoint '{endpoint}': {e}")))?;

        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Remote endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Build `{endpoint}/{segments...}` with each segment percent-encoded.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn folder_url(&self, name: &str) -> Url {
        self.url(["folders", name])
    }

    fn file_url(&self, folder_id: &str, filename: &str) -> Url {
        self.url(
            ["folders", folder_id, "files"]
                .into_iter()
                .chain(filename.split('/').filter(|s| !s.is_empty())),
        )
    }

    async fn put(&self, url: Url, body: Vec<u8>) -> Result<IdResponse> {
        let mut request = self.client.put(url.clone()).timeout(REQUEST_TIMEOUT).body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!("{url} returned {status}: {error}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse response from {url}: {e}")))
    }
}

impl RemoteStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn ensure_folder(&self, name: &str) -> Result<FolderHandle> {
        debug!(folder = name, "Looking for folder");
        let data = self.put(self.folder_url(name), Vec::new()).await?;
        info!(folder = name, id = %data.id, "Using remote folder");

        Ok(FolderHandle {
            id: data.id,
            name: name.to_string(),
        })
    }

    async fn upload(&self, folder: &FolderHandle, filename: &str, bytes: &[u8]) -> Result<RemoteFileId> {
        let url = self.file_url(&folder.id, filename);
        let data = self.put(url, bytes.to_vec()).await?;
        Ok(RemoteFileId(data.id))
    }
}
