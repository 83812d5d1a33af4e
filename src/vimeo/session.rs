use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use url::Url;

use super::error::SourceError;
use crate::retry::{self, RetryAction, RetryConfig};

const VIMEO_ACCEPT: &str = "application/vnd.vimeo.*+json;version=3.4";

/// Minimal async session used by the folder walker.
///
/// Paths are either relative to the API root (`/users/1/folders?page=1`, the
/// form Vimeo uses for `paging.next`) or absolute URLs.
#[async_trait::async_trait]
pub trait SourceSession: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, SourceError>;
}

/// Retry policy for listing calls. Server errors and rate limits get
/// different fixed pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingRetryPolicy {
    pub max_attempts: u32,
    pub server_error_delay_secs: u64,
    pub rate_limit_delay_secs: u64,
}

impl Default for ListingRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            server_error_delay_secs: 30,
            rate_limit_delay_secs: 60,
        }
    }
}

impl ListingRetryPolicy {
    fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            delay_secs: self.server_error_delay_secs,
        }
    }

    fn classify(&self, e: &SourceError) -> RetryAction {
        if e.is_rate_limited() {
            RetryAction::RetryAfter(Duration::from_secs(self.rate_limit_delay_secs))
        } else if e.is_transient() {
            RetryAction::Retry
        } else {
            RetryAction::Abort
        }
    }
}

/// Authenticated client for the Vimeo REST API.
pub struct VimeoClient {
    client: Client,
    api_base: Url,
    retry: ListingRetryPolicy,
}

impl std::fmt::Debug for VimeoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VimeoClient")
            .field("api_base", &self.api_base.as_str())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl VimeoClient {
    pub fn new(
        api_base: &str,
        access_token: &str,
        timeout: Duration,
        retry: ListingRetryPolicy,
    ) -> anyhow::Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("bearer {access_token}"))?;
        auth.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(ACCEPT, HeaderValue::from_static(VIMEO_ACCEPT));

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: Url::parse(api_base)?,
            retry,
        })
    }

    /// Resolve a listing path against the API root.
    pub(crate) fn resolve(&self, path: &str) -> Result<Url, SourceError> {
        self.api_base
            .join(path)
            .map_err(|source| SourceError::InvalidUrl {
                url: path.to_string(),
                source,
            })
    }

    async fn get_once(&self, url: &Url) -> Result<Value, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| SourceError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| SourceError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait::async_trait]
impl SourceSession for VimeoClient {
    async fn get_json(&self, path: &str) -> Result<Value, SourceError> {
        let url = self.resolve(path)?;
        tracing::debug!(url = %url, "GET listing");
        retry::retry_with_delay(
            &self.retry.retry_config(),
            |e| self.retry.classify(e),
            || self.get_once(&url),
        )
        .await
    }
}
