//! Remote Snapshot Endpoint
//!
//! HTTP client for the whiteboard persistence endpoint:
//! `GET /whiteboard/{id}` returns the stored snapshot (404 means the board
//! has never been saved), `PUT /whiteboard/{id}` stores a new one.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{Error, Result};

/// Wire envelope for the GET response body
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    snapshot: String,
}

/// HTTP client for one whiteboard endpoint
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl RemoteClient {
    /// Create a client from the sync configuration
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, whiteboard_id: &str) -> String {
        format!("{}/whiteboard/{whiteboard_id}", self.base_url)
    }

    /// Fetch the persisted snapshot payload for a whiteboard.
    ///
    /// Returns `None` on 404: a board that has never been saved is a normal
    /// first-use case, not an error.
    pub async fn fetch_snapshot(&self, whiteboard_id: &str) -> Result<Option<String>> {
        let url = self.url(whiteboard_id);
        debug!(%url, "fetching snapshot");

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::load_failed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::load_failed(format!("HTTP {}", response.status())));
        }

        let envelope: SnapshotEnvelope = response
            .json()
            .await
            .map_err(|e| Error::load_failed(e.to_string()))?;
        Ok(Some(envelope.snapshot))
    }

    /// Store an encoded snapshot payload for a whiteboard.
    pub async fn put_snapshot(&self, whiteboard_id: &str, payload: String) -> Result<()> {
        let url = self.url(whiteboard_id);
        debug!(%url, bytes = payload.len(), "saving snapshot");

        let response = self
            .http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::save_failed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::save_failed(format!("HTTP {}", response.status())))
        }
    }
}
