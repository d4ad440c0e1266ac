//! Injectable time source for poll jitter and retry backoff.
//!
//! Everything in the crate that waits on purpose (the poller between cycles,
//! the submitter between attempts, the supervisor between engine launches)
//! sleeps through a [`Clock`], so tests can observe the requested delays
//! without waiting for them.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

/// Default lower bound of the delay between poll cycles
pub const DEFAULT_POLL_MIN_DELAY: Duration = Duration::from_secs(3);

/// Default upper bound of the delay between poll cycles
pub const DEFAULT_POLL_MAX_DELAY: Duration = Duration::from_secs(7);

/// Default number of attempts for a mutating call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between two attempts of a mutating call
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Something that can put the current task to sleep.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspends the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that records every requested sleep and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    /// Create a new recording clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|sleeps| sleeps.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Uniformly jittered delay between two poll cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Shortest delay
    pub min_delay: Duration,
    /// Longest delay (inclusive)
    pub max_delay: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_POLL_MIN_DELAY,
            max_delay: DEFAULT_POLL_MAX_DELAY,
        }
    }
}

impl PollSchedule {
    /// Create a schedule drawing delays from `[min_delay, max_delay]`
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
        }
    }

    /// Draw the next delay, at millisecond resolution.
    ///
    /// An empty or inverted range yields `min_delay`.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(rng.random_range(min..=max))
    }
}

/// Fixed-delay retry policy for mutating calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after a failed attempt when another one follows
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}
