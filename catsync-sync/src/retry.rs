//! Retry and rate-limit handling around a single page fetch.

use crate::cursor::Cursor;
use crate::error::FetchError;
use crate::source::{Page, SourceClient};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// Backoff schedule for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before retry `n` is `schedule[min(n - 1, len - 1)]`.
    pub schedule: Vec<Duration>,
    /// Transient failures tolerated per page before giving up.
    pub max_retries: u32,
    /// Wait after a 429 that carries no usable Retry-After header.
    pub default_rate_limit_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            schedule: [5, 10, 30, 60].map(Duration::from_secs).to_vec(),
            max_retries: 3,
            default_rate_limit_wait: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Doubling schedule starting at `base`.
    #[must_use]
    pub fn exponential(base: Duration, max_retries: u32) -> Self {
        let schedule = (0..max_retries.max(1))
            .map(|i| base.saturating_mul(1u32 << i.min(16)))
            .collect();
        Self {
            schedule,
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before the given one-based retry.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let index = (retry.saturating_sub(1) as usize).min(self.schedule.len().saturating_sub(1));
        self.schedule.get(index).copied().unwrap_or_default()
    }
}

/// Suspends the current task. Injected so tests can observe waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fetches one page, waiting out rate limits and retrying transient failures.
///
/// Rate limits do not count against `max_retries`. Fatal errors return
/// immediately. The retry count is local to this call, so it starts over
/// for every page.
pub async fn fetch_with_retry(
    source: &dyn SourceClient,
    cursor: &Cursor,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Page, FetchError> {
    let mut retries = 0u32;
    loop {
        match source.fetch_page(cursor).await {
            Ok(page) => return Ok(page),
            Err(FetchError::RateLimited { retry_after }) => {
                let wait = retry_after.unwrap_or(policy.default_rate_limit_wait);
                info!(
                    "{} rate limited on page {}, waiting {}s",
                    source.name(),
                    cursor.page(),
                    wait.as_secs()
                );
                sleeper.sleep(wait).await;
            }
            Err(FetchError::Transient(reason)) => {
                if retries >= policy.max_retries {
                    warn!(
                        "{} page {} failed after {} retries: {}",
                        source.name(),
                        cursor.page(),
                        retries,
                        reason
                    );
                    return Err(FetchError::Exhausted {
                        retries,
                        last: reason,
                    });
                }
                retries += 1;
                let delay = policy.delay_for(retries);
                warn!(
                    "{} page {} failed ({}), retry {}/{} in {}s",
                    source.name(),
                    cursor.page(),
                    reason,
                    retries,
                    policy.max_retries,
                    delay.as_secs()
                );
                sleeper.sleep(delay).await;
            }
            Err(e) => {
                warn!("{} page {}: {}", source.name(), cursor.page(), e);
                return Err(e);
            }
        }
    }
}
