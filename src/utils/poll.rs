// src/utils/poll.rs

//! Bounded polling for content that loads asynchronously.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

/// How often and how many times to re-check a condition.
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

    /// Upper bound on time spent sleeping between attempts.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 60)
    }
}

/// Re-run `probe` until it reports `true`.
///
/// Sleeps `policy.interval` between attempts and fails with
/// [`AppError::NavigationTimeout`] naming `target` once `max_attempts`
/// probes have all come back `false`. Probe errors are returned as-is.
pub async fn poll_until<F, Fut>(policy: &PollPolicy, target: &str, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=policy.max_attempts {
        if probe().await? {
            if attempt > 1 {
                log::debug!("{} ready after {} polls", target, attempt);
            }
            return Ok(());
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(AppError::navigation_timeout(
        target,
        policy.budget().as_millis() as u64,
    ))
}
