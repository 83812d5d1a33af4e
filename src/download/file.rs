use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::error::DownloadError;
use crate::retry::{self, RetryAction, RetryConfig};

const WRITE_BUFFER_BYTES: usize = 64 * 1024;

/// Stream `url` into `dest`, retrying every failure with a fixed delay.
///
/// Each attempt truncates `dest` and starts over. Returns the byte count of
/// the completed file. When the budget is spent the partial file is removed
/// and `RetriesExhausted` is returned.
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    retry_config: &RetryConfig,
) -> Result<u64, DownloadError> {
    let result = retry::retry_with_delay(
        retry_config,
        |_: &DownloadError| RetryAction::Retry,
        || attempt_download(client, url, dest),
    )
    .await;

    match result {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            match fs::remove_file(dest).await {
                Ok(()) => {}
                Err(rm) if rm.kind() == std::io::ErrorKind::NotFound => {}
                Err(rm) => {
                    tracing::warn!("Could not remove partial download {}: {}", dest.display(), rm);
                }
            }
            Err(DownloadError::RetriesExhausted {
                url: url.to_string(),
                attempts: retry_config.attempts(),
                last_error: e.to_string(),
            })
        }
    }
}

async fn attempt_download(client: &Client, url: &str, dest: &Path) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await.map_err(|e| DownloadError::Http {
        source: e,
        url: url.to_string(),
        bytes_written: 0,
    })?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(dest)
        .await?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Http {
            source: e,
            url: url.to_string(),
            bytes_written,
        })?;
        writer.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    writer.flush().await?;

    Ok(bytes_written)
}
