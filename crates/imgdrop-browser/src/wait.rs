//! Bounded polls and element waits
//!
//! Every wait is a fixed interval and a fixed attempt cap. No backoff.

use crate::driver::PageDriver;
use crate::error::{DropError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Fixed-interval, fixed-attempt poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Enough attempts at `interval` to cover `timeout`, plus the immediate first probe
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let attempts = timeout.as_millis().div_ceil(interval_ms) + 1;
        Self::new(interval, attempts.min(u32::MAX as u128) as u32)
    }

    /// Time spent sleeping if every attempt misses
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// How long to wait for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Within(Duration),
    /// Only for waits a human controls (manual login)
    Forever,
}

impl From<Option<Duration>> for Wait {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => Self::Within(timeout),
            None => Self::Forever,
        }
    }
}

/// Call `probe` until it yields a value or the attempts run out.
///
/// `probe` receives the 1-based attempt number so callers can log `n/max`.
/// Probe errors end the poll immediately.
pub async fn poll_until<F, Fut, T>(policy: PollPolicy, what: &str, mut probe: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = probe(attempt).await? {
            return Ok(value);
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(DropError::timeout(what, policy.ceiling()))
}

/// Wait until `selector` matches an element
pub async fn wait_for_element<D>(
    driver: &D,
    selector: &str,
    wait: Wait,
    interval: Duration,
) -> Result<()>
where
    D: PageDriver + ?Sized,
{
    debug!("Waiting for element: {} ({:?})", selector, wait);

    match wait {
        Wait::Within(timeout) => {
            let policy = PollPolicy::within(timeout, interval);
            poll_until(policy, selector, |_| async move {
                Ok::<_, DropError>(driver.element_exists(selector).await?.then_some(()))
            })
            .await
            .map_err(|e| match e {
                DropError::Timeout { .. } => DropError::timeout(selector, timeout),
                other => other,
            })
        }
        Wait::Forever => loop {
            if driver.element_exists(selector).await? {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        },
    }
}
