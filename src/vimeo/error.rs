use thiserror::Error;

/// Errors raised while listing folders and videos on the source platform.
///
/// Any of these surfacing from the folder walk is fatal to a migration run;
/// the retry policy in [`crate::vimeo::VimeoClient`] has already been applied.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP {status} listing {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Malformed listing response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Invalid listing URL '{url}': {source}")]
    InvalidUrl { url: String, source: url::ParseError },
}

impl SourceError {
    /// Whether this failure is worth retrying: server errors, rate limits,
    /// and connection-level failures.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            SourceError::Http { source, .. } => source.is_timeout() || source.is_connect(),
            SourceError::Decode { .. } | SourceError::InvalidUrl { .. } => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::HttpStatus { status: 429, .. })
    }
}
