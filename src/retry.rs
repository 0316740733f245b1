//! Retry logic with exponential backoff
//!
//! The Graph API throttles aggressively and occasionally answers with generic
//! "unknown error" codes that succeed on a later attempt. This module classifies
//! those failures and retries them with exponential backoff.
//!
//! # Example
//!
//! ```no_run
//! use facebook_ads_downloader::retry::{IsRetryable, download_with_retry};
//! use facebook_ads_downloader::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Throttled,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Throttled)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = download_with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Graph API error codes signalling that a rate limit was hit
///
/// See <https://developers.facebook.com/docs/graph-api/overview/rate-limiting>.
pub const RATE_LIMIT_ERROR_CODES: &[i64] = &[
    4,     // application request limit
    17,    // user request limit
    32,    // page request limit
    613,   // custom rate limit
    80000, // ads insights business use case limit
    80003, // custom audience business use case limit
    80004, // ads management business use case limit
    80014, // ad account business use case limit
];

/// Graph API error codes for transient server-side failures
pub const TRANSIENT_ERROR_CODES: &[i64] = &[
    1, // unknown error
    2, // service temporarily unavailable
];

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (throttling, timeouts, vendor hiccups) should return `true`.
/// Permanent failures (invalid token, missing permission, bad request) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Api(e) => {
                RATE_LIMIT_ERROR_CODES.contains(&e.code) || TRANSIENT_ERROR_CODES.contains(&e.code)
            }
            // Gateway errors without an error envelope
            Error::Http { status, .. } => *status >= 500 || *status == 429,
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            // A failed or stuck report job is resubmitted
            Error::ReportJob(_) => true,
            Error::Config { .. } => false,
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::Serialization(_) => false,
            Error::InvalidResponse(_) => false,
            Error::Cancelled => false,
            Error::DownloadsFailed { .. } => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure that returns Result<T, E> where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result or the last error after all retry attempts are exhausted.
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    "Transient Graph API failure, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
