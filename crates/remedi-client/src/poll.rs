//! Backoff poller: send once, then wait for the correlated response.
//!
//! The servers have no way to report a lost job, so the wait is driven
//! purely by checking the correlation store: immediately after the send,
//! then after each wait of the backoff schedule.

use std::future::Future;
use std::time::Duration;

use remedi_core::config::PollingConfig;

use crate::error::{ClientError, Stage};
use crate::transport::TransportError;

/// Shortest wait between store checks, whatever the policy says.
pub const MIN_WAIT: Duration = Duration::from_millis(1);

/// Wait schedule between store checks, plus an optional overall limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub factor: u32,
    pub max: Duration,
    /// `None` waits until the response arrives or the caller is dropped.
    pub timeout: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            factor: 2,
            max: Duration::from_millis(4000),
            timeout: None,
        }
    }
}

impl From<&PollingConfig> for BackoffPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            initial: config.initial_wait(),
            factor: config.backoff_factor,
            max: config.max_wait(),
            timeout: config.timeout(),
        }
    }
}

impl BackoffPolicy {
    /// Both bounds are raised to at least [`MIN_WAIT`].
    pub fn waits(&self) -> Backoff {
        let max = self.max.max(MIN_WAIT);
        Backoff {
            next: self.initial.max(MIN_WAIT).min(max),
            factor: self.factor.max(1),
            max,
        }
    }
}

/// Endless sequence of waits: `initial`, multiplied by `factor` each
/// step, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    factor: u32,
    max: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let wait = self.next;
        self.next = self
            .next
            .checked_mul(self.factor)
            .map_or(self.max, |grown| grown.min(self.max));
        Some(wait)
    }
}

/// Send a request and poll `take` until it yields the response.
///
/// A failed send is returned immediately and the store is never
/// checked. Dropping the returned future stops the polling.
pub async fn await_response<T, S, F>(
    stage: Stage,
    policy: &BackoffPolicy,
    send: S,
    mut take: F,
) -> Result<T, ClientError>
where
    S: Future<Output = Result<(), TransportError>>,
    F: FnMut() -> Option<T>,
{
    send.await
        .map_err(|source| ClientError::Send { stage, source })?;

    let mut waits = policy.waits();
    let poll = async {
        let mut attempts = 0u32;
        loop {
            if let Some(response) = take() {
                tracing::debug!(%stage, attempts, "response received");
                return response;
            }
            attempts += 1;
            if let Some(wait) = waits.next() {
                tracing::trace!(%stage, attempts, wait_ms = wait.as_millis() as u64, "response pending");
                tokio::time::sleep(wait).await;
            }
        }
    };

    match policy.timeout {
        Some(limit) => tokio::time::timeout(limit, poll)
            .await
            .map_err(|_| ClientError::Timeout { stage, waited: limit }),
        None => Ok(poll.await),
    }
}
