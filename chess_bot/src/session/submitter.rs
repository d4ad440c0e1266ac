//! Move submission with bounded retries.

use crate::clock::{Clock, RetryPolicy, TokioClock};
use crate::net::{ApiError, GameApi};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout of one submission attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of submitting one move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Server accepted the move
    Delivered,

    /// Server refused the move with this status; not retried
    Rejected { status: u16 },

    /// Every attempt failed below the HTTP layer
    Exhausted { attempts: u32 },
}

impl SubmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmitOutcome::Delivered)
    }
}

/// Submits moves, retrying transport failures with a fixed backoff
pub struct MoveSubmitter {
    api: Arc<dyn GameApi>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl MoveSubmitter {
    /// Create a new submitter
    ///
    /// # Arguments
    ///
    /// * `api` - Remote API used for the move call
    /// * `policy` - Attempt count and backoff
    pub fn new(api: Arc<dyn GameApi>, policy: RetryPolicy) -> Self {
        Self {
            api,
            policy,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit `uci` in `game_id`.
    ///
    /// A non-success status ends the call at once. Network failures and
    /// attempt timeouts are retried after the backoff, with no sleep after
    /// the last attempt.
    pub async fn submit(&self, game_id: &str, uci: &str) -> SubmitOutcome {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            let result =
                tokio::time::timeout(self.attempt_timeout, self.api.submit_move(game_id, uci))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ApiError::Network(format!(
                            "no answer within {:?}",
                            self.attempt_timeout
                        )))
                    });

            match result {
                Ok(()) => {
                    log::info!("[{}] Move {} submitted", game_id, uci);
                    return SubmitOutcome::Delivered;
                }
                Err(ApiError::Status { status, body }) => {
                    log::warn!(
                        "[{}] Move {} rejected with {}: {}",
                        game_id,
                        uci,
                        status,
                        body
                    );
                    return SubmitOutcome::Rejected { status };
                }
                Err(e) => {
                    log::warn!(
                        "[{}] Move {} attempt {}/{} failed: {}",
                        game_id,
                        uci,
                        attempt,
                        attempts,
                        e
                    );
                    if attempt < attempts {
                        self.clock.sleep(self.policy.backoff).await;
                    }
                }
            }
        }

        log::error!("[{}] Move {} not delivered after {} attempts", game_id, uci, attempts);
        SubmitOutcome::Exhausted { attempts }
    }
}
