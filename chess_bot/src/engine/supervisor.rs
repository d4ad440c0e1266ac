//! Engine supervisor: serialized, supervised access to one engine process.

use super::errors::{ComputeError, EngineError};
use super::models::{EngineParams, MoveRequest};
use super::uci::{EngineLauncher, EngineProcess, parse_uci_move};
use crate::clock::{Clock, TokioClock};
use chess::{Board, ChessMove};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Default pause between quitting an engine and launching the next one
pub const DEFAULT_RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Consecutive timeouts after which the engine is treated as dead
pub const UNRESPONSIVE_AFTER: u32 = 3;

/// Supervisor owning the shared engine process
pub struct EngineSupervisor {
    /// Starts fresh processes
    launcher: Arc<dyn EngineLauncher>,

    /// Parameters applied after every launch
    params: EngineParams,

    /// Current process; the mutex is the single-slot search queue
    process: Mutex<Option<Box<dyn EngineProcess>>>,

    /// Incremented on every successful launch
    generation: AtomicU64,

    /// Timeouts since the last answered search
    consecutive_timeouts: AtomicU32,

    /// Pause before relaunching
    restart_pause: Duration,

    /// Sleeps the restart pause
    clock: Arc<dyn Clock>,
}

impl EngineSupervisor {
    /// Launch and configure the engine.
    ///
    /// # Arguments
    ///
    /// * `launcher` - Starts engine processes
    /// * `params` - Strength parameters
    ///
    /// # Returns
    ///
    /// * `Result<EngineSupervisor, EngineError>` - Running supervisor, or the launch failure
    pub async fn start(
        launcher: Arc<dyn EngineLauncher>,
        params: EngineParams,
    ) -> Result<Self, EngineError> {
        let mut process = launcher.launch().await?;
        process.configure(&params).await?;
        log::info!("Engine started and configured: {:?}", params);

        Ok(Self {
            launcher,
            params,
            process: Mutex::new(Some(process)),
            generation: AtomicU64::new(1),
            consecutive_timeouts: AtomicU32::new(0),
            restart_pause: DEFAULT_RESTART_PAUSE,
            clock: Arc::new(TokioClock),
        })
    }

    pub fn with_restart_pause(mut self, pause: Duration) -> Self {
        self.restart_pause = pause;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Generation of the running process
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Re-apply the strength parameters to the running process
    pub async fn configure(&self) -> Result<(), EngineError> {
        let mut guard = self.process.lock().await;
        match guard.as_mut() {
            Some(process) => process.configure(&self.params).await,
            None => Err(EngineError::Terminated),
        }
    }

    /// Compute a move for `board` within the request's budget.
    ///
    /// The timeout covers waiting for other sessions' searches as well as
    /// this one. The returned move is legal in `board`.
    pub async fn compute_move(
        &self,
        board: &Board,
        request: MoveRequest,
    ) -> Result<ChessMove, ComputeError> {
        let fen = board.to_string();
        let observed = self.generation();

        let search = async {
            let mut guard = self.process.lock().await;
            let generation = self.generation();
            let Some(process) = guard.as_mut() else {
                return Err(ComputeError::EngineDead {
                    generation,
                    reason: "no engine process".to_string(),
                });
            };

            match process.best_move(&fen, request.think_time).await {
                Ok(Some(uci)) => Ok(uci),
                Ok(None) => Err(ComputeError::NoMove),
                Err(e) => Err(ComputeError::EngineDead {
                    generation,
                    reason: e.to_string(),
                }),
            }
        };

        let uci = match tokio::time::timeout(request.timeout, search).await {
            Ok(result) => {
                self.consecutive_timeouts.store(0, Ordering::SeqCst);
                result?
            }
            Err(_) => {
                let timeouts = self.consecutive_timeouts.fetch_add(1, Ordering::SeqCst) + 1;
                if timeouts >= UNRESPONSIVE_AFTER {
                    return Err(ComputeError::EngineDead {
                        generation: observed,
                        reason: format!("{} consecutive timeouts", timeouts),
                    });
                }
                return Err(ComputeError::Timeout(request.timeout));
            }
        };

        match parse_uci_move(&uci) {
            Some(mv) if board.legal(mv) => Ok(mv),
            _ => Err(ComputeError::IllegalMove(uci)),
        }
    }

    /// Quit the current process, pause, launch and configure a new one.
    ///
    /// A launch failure leaves the supervisor without a process and is
    /// returned to the caller.
    pub async fn restart(&self) -> Result<(), EngineError> {
        let mut guard = self.process.lock().await;
        self.restart_locked(&mut guard).await
    }

    /// Restart only if `generation` is still the running one.
    ///
    /// Returns whether this call performed the restart.
    pub async fn recover(&self, generation: u64) -> Result<bool, EngineError> {
        let mut guard = self.process.lock().await;
        if self.generation() != generation && guard.is_some() {
            log::debug!(
                "Engine generation {} already replaced by {}",
                generation,
                self.generation()
            );
            return Ok(false);
        }
        self.restart_locked(&mut guard).await?;
        Ok(true)
    }

    async fn restart_locked(
        &self,
        slot: &mut Option<Box<dyn EngineProcess>>,
    ) -> Result<(), EngineError> {
        log::warn!("Restarting engine generation {}", self.generation());

        if let Some(mut old) = slot.take() {
            if let Err(e) = old.quit().await {
                log::warn!("Old engine did not quit cleanly: {}", e);
            }
        }

        self.clock.sleep(self.restart_pause).await;

        let mut process = self.launcher.launch().await?;
        process.configure(&self.params).await?;
        *slot = Some(process);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.consecutive_timeouts.store(0, Ordering::SeqCst);
        log::info!("Engine restarted as generation {}", generation);
        Ok(())
    }

    /// Quit the engine on agent exit
    pub async fn shutdown(&self) {
        let mut guard = self.process.lock().await;
        if let Some(mut process) = guard.take() {
            match process.quit().await {
                Ok(()) => log::info!("Engine stopped"),
                Err(e) => log::warn!("Engine shutdown failed: {}", e),
            }
        }
    }
}

impl std::fmt::Debug for EngineSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSupervisor")
            .field("params", &self.params)
            .field("generation", &self.generation())
            .field("restart_pause", &self.restart_pause)
            .finish_non_exhaustive()
    }
}
