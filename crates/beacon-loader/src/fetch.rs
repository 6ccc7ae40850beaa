//! Asset fetching seam
//!
//! The loader talks to the network through [`AssetFetcher`] so tests can
//! substitute deterministic fetchers with scripted failures.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// A single fetch attempt's failure
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status
    #[error("unexpected status: {0}")]
    Status(u16),
}

/// Fetches one asset candidate URL
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the full body at `url`, or fail
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Production fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Wrap an existing client (connection pools are shared per client)
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
