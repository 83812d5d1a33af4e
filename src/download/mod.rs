//! Fetches a chosen rendition into scratch storage.

pub mod error;
pub mod file;

use std::path::Path;
use std::time::Duration;

use reqwest::Client;

pub use error::DownloadError;

use crate::retry::RetryConfig;

/// Seam between the orchestrator and the network so tasks can be tested
/// without real downloads.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    /// Write the body of `url` to `dest`, returning the byte count.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    retry: RetryConfig,
}

impl HttpDownloader {
    /// `read_timeout` bounds each read of the body, not the whole transfer,
    /// so large files are not cut off mid-stream.
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
        retry: RetryConfig,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self { client, retry })
    }
}

#[async_trait::async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        file::download_file(&self.client, url, dest, &self.retry).await
    }
}
