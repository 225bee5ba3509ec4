//! Bounded retry with exponential backoff for blocking operations.
//!
//! Camera workers run on plain threads, so waits between attempts are
//! sliced and the stop signal is checked between slices.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;

use phoenix_media::MediaError;

/// Longest uninterrupted sleep while waiting for the next attempt.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay for exponential backoff (doubles each attempt).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for MediaError {
    fn is_retryable(&self) -> bool {
        MediaError::is_retryable(self)
    }
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Retries exhausted, or the error was not retryable.
    Failed { error: E, attempts: u32 },
    /// Stop was requested while waiting for the next attempt.
    Cancelled,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Check a stop signal. A dropped sender counts as a stop request.
pub fn stop_requested(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}

/// Sleep for `duration` unless stop is requested first.
///
/// Returns `false` when interrupted.
pub fn sleep_unless_stopped(duration: Duration, stop: &watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop_requested(stop) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
    }
}

/// Run a blocking operation with retry logic.
///
/// `operation` receives the attempt number, starting at 0, so callers can
/// re-establish state before a retry.
pub fn retry_blocking<F, T, E>(config: &RetryConfig, stop: &watch::Receiver<bool>, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display + Retryable,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt) {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if attempt < config.max_retries && e.is_retryable() => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, delay, e
                );
                if !sleep_unless_stopped(delay, stop) {
                    return RetryResult::Cancelled;
                }
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt + 1,
                }
            }
        }
    }
}
