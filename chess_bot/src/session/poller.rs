//! Discovery loop: challenges in, sessions out.

use super::game::GameSession;
use super::registry::SessionRegistry;
use super::{AgentError, SessionContext};
use crate::challenge::{AcceptanceCriteria, ChallengeDecision, evaluate_raw};
use crate::clock::{Clock, PollSchedule, TokioClock};
use crate::engine::EngineError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What one poll cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Challenges accepted
    pub accepted: Vec<String>,

    /// Challenges declined, with the reason key sent
    pub declined: Vec<(String, &'static str)>,

    /// Sessions started
    pub spawned: Vec<String>,

    /// Sessions stopped because their game left the playing list
    pub removed: Vec<String>,

    /// Whether the playing list was fetched and reconciled
    pub reconciled: bool,
}

impl CycleReport {
    /// Whether the cycle changed nothing
    pub fn is_quiet(&self) -> bool {
        self.accepted.is_empty()
            && self.declined.is_empty()
            && self.spawned.is_empty()
            && self.removed.is_empty()
    }
}

/// Top-level loop of the agent
pub struct SessionPoller {
    ctx: Arc<SessionContext>,
    registry: Arc<SessionRegistry>,
    criteria: Arc<AcceptanceCriteria>,
    schedule: PollSchedule,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    fatal_rx: mpsc::UnboundedReceiver<EngineError>,
}

impl SessionPoller {
    /// Create a new poller
    ///
    /// # Arguments
    ///
    /// * `ctx` - Collaborators handed to every session
    /// * `registry` - Session registry
    /// * `criteria` - Challenge acceptance criteria
    /// * `schedule` - Delay range between cycles
    /// * `fatal_rx` - Receiving end of `ctx.fatal`
    pub fn new(
        ctx: Arc<SessionContext>,
        registry: Arc<SessionRegistry>,
        criteria: Arc<AcceptanceCriteria>,
        schedule: PollSchedule,
        fatal_rx: mpsc::UnboundedReceiver<EngineError>,
    ) -> Self {
        Self {
            ctx,
            registry,
            criteria,
            schedule,
            clock: Arc::new(TokioClock),
            rng: StdRng::from_os_rng(),
            fatal_rx,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a fixed RNG for the poll jitter
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Run one cycle: filter challenges, then reconcile sessions
    pub async fn poll_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let challenges = match self.ctx.api.pending_challenges().await {
            Ok(challenges) => challenges,
            Err(e) => {
                log::warn!("Failed to fetch challenges: {}", e);
                Vec::new()
            }
        };

        for record in challenges {
            self.handle_challenge(record, &mut report).await;
        }

        match self.ctx.api.playing_games().await {
            Ok(playing) => {
                let ctx = self.ctx.clone();
                let registry = self.registry.clone();
                let reconciled = self
                    .registry
                    .reconcile(&playing, |game, seq| {
                        let session = GameSession::new(game, ctx.clone());
                        tokio::spawn(session.run(registry.clone(), seq))
                    })
                    .await;
                report.spawned = reconciled.spawned;
                report.removed = reconciled.removed;
                report.reconciled = true;
            }
            Err(e) => log::warn!("Failed to fetch playing games, keeping sessions: {}", e),
        }

        report
    }

    async fn handle_challenge(&self, record: Value, report: &mut CycleReport) {
        let Some(id) = record.get("id").and_then(Value::as_str).map(str::to_string) else {
            log::warn!("Skipping challenge without an id");
            return;
        };

        match evaluate_raw(record, &self.criteria) {
            ChallengeDecision::Accept(reason) => {
                log::info!("Accepting challenge {}: {}", id, reason);
                match self.ctx.api.accept_challenge(&id).await {
                    Ok(()) => report.accepted.push(id),
                    Err(e) => log::warn!("Failed to accept challenge {}: {}", id, e),
                }
            }
            ChallengeDecision::Deny(reason) => {
                log::info!("Declining challenge {}: {}", id, reason);
                let key = reason.decline_key();
                match self.ctx.api.decline_challenge(&id, key).await {
                    Ok(()) => report.declined.push((id, key)),
                    Err(e) => log::warn!("Failed to decline challenge {}: {}", id, e),
                }
            }
        }
    }

    /// Poll forever at jittered intervals.
    ///
    /// Returns only when a session reports an engine that cannot be
    /// restarted.
    pub async fn run(mut self) -> Result<(), AgentError> {
        log::info!(
            "Polling every {:?} to {:?}",
            self.schedule.min_delay,
            self.schedule.max_delay
        );

        loop {
            if let Ok(err) = self.fatal_rx.try_recv() {
                self.registry.shutdown().await;
                return Err(AgentError::Engine(err));
            }

            let report = self.poll_once().await;
            if !report.is_quiet() {
                log::info!(
                    "Cycle: {} accepted, {} declined, {} started, {} stopped",
                    report.accepted.len(),
                    report.declined.len(),
                    report.spawned.len(),
                    report.removed.len()
                );
            }

            let delay = self.schedule.next_delay(&mut self.rng);
            tokio::select! {
                Some(err) = self.fatal_rx.recv() => {
                    self.registry.shutdown().await;
                    return Err(AgentError::Engine(err));
                }
                _ = self.clock.sleep(delay) => {}
            }
        }
    }
}
