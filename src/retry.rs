use std::future::Future;
use std::time::Duration;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Retry after the configured fixed delay.
    Retry,
    /// Retry after a caller-chosen delay (rate limits ask for a longer pause).
    RetryAfter(Duration),
    Abort,
}

/// Fixed-interval retry policy.
///
/// Both the source listing and the downloader wait a constant interval
/// between attempts rather than backing off exponentially, so the worst-case
/// time spent on one failing request is `(max_attempts - 1) * delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 10,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Attempts actually made when every attempt fails.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Retry an async operation with a fixed delay between attempts.
///
/// - `config`: attempt budget and delay
/// - `classifier`: inspects an error and decides whether (and how long) to wait
/// - `operation`: the async closure to retry
///
/// Returns the first `Ok` result, or the last error once attempts are
/// exhausted or the classifier returns `Abort`.
pub async fn retry_with_delay<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                let delay = match classifier(&e) {
                    RetryAction::Abort => return Err(e),
                    RetryAction::Retry => config.delay(),
                    RetryAction::RetryAfter(delay) => delay,
                };
                if attempt >= total_attempts {
                    return Err(e);
                }
                tracing::warn!(
                    "Attempt {}/{} failed, retrying in {}s: {}",
                    attempt,
                    total_attempts,
                    delay.as_secs(),
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
