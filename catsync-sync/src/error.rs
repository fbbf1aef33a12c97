//! Error types for the sync layer.

use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync operation.
///
/// Upstream failures are not in here: they end a run as
/// [`RunOutcome::Degraded`](crate::RunOutcome) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] catsync_storage::StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A record could not be turned into an export row.
    #[error("presentation error: {0}")]
    Presentation(String),

    /// Background task failed.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Classified failure of one upstream round-trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP 429; retried indefinitely after the advertised wait.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Network error, timeout or server-side failure; retried per policy.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Transient failures outlasted the retry budget.
    #[error("giving up after {retries} retries: {last}")]
    Exhausted { retries: u32, last: String },

    /// Response without the expected payload shape; never retried.
    #[error("invalid response: {0}")]
    Fatal(String),
}

impl FetchError {
    /// Returns true if this error represents a 429 rate-limit response.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    /// Returns the advertised wait if this is a rate-limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Returns true if retrying cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Fatal(_) | FetchError::Exhausted { .. })
    }

    /// Classifies a non-success HTTP status.
    ///
    /// 429 is a rate limit, 408 and 5xx are transient, any other status means
    /// the request itself is wrong and is fatal.
    pub fn from_status(status: StatusCode, retry_after: Option<&HeaderValue>) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return FetchError::RateLimited { retry_after };
        }
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            return FetchError::Transient(format!("HTTP {status}"));
        }
        FetchError::Fatal(format!("HTTP {status}"))
    }

    /// Classifies a transport-level error.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Fatal(format!("undecodable response: {err}"))
        } else {
            FetchError::Transient(format!("request failed: {err}"))
        }
    }
}
