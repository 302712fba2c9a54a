//! Bounded retry with a fixed delay.
//!
//! Used for LED publishes, for display dispatches made while display clients
//! are still connecting, and for the startup timeline build. Everything else
//! fails once and is logged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::bus::BusError;
use crate::error::RelayError;
use crate::state::Config;

/// Errors that may succeed if the operation is attempted again shortly.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for BusError {
    fn is_transient(&self) -> bool {
        // A payload that failed to encode will fail again.
        !matches!(self, BusError::Encode(_))
    }
}

impl Transient for RelayError {
    fn is_transient(&self) -> bool {
        // Only catalog outages clear up on their own; a running refresh will
        // install its own timeline.
        matches!(self, RelayError::Catalog(_))
    }
}

/// How many extra attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Single attempt, no retry.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Policy for display dispatch and LED publishes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dispatch_retry_attempts, config.retry_delay())
    }

    /// Policy for the startup timeline build.
    pub fn catalog_from_config(config: &Config) -> Self {
        Self::new(config.catalog_retry_attempts, config.catalog_retry_delay())
    }
}

/// Runs `operation`, retrying transient failures per `policy`.
///
/// Returns the first success, the first non-transient error, or the last
/// transient error once retries are exhausted.
pub async fn with_retry<T, E, F, Fut>(action: &str, policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                attempt += 1;
                log::info!(
                    "[Retry] {} failed: {} (retry {}/{} in {}ms)",
                    action,
                    e,
                    attempt,
                    policy.retries,
                    policy.delay.as_millis()
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
