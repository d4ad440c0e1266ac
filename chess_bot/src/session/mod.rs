//! Game sessions and everything that keeps them running.
//!
//! This module implements:
//! - LocalBoard: the board replica kept in step with the server's move list
//! - GameSession: one task per game, driven by the game's event stream
//! - MoveSubmitter: bounded retries for move submission
//! - SessionRegistry: the map of running sessions, one per game ID
//! - SessionPoller: the discovery loop feeding the registry
//!
//! ## Lifecycle
//!
//! The poller sees a game in the playing list and spawns a session under
//! the registry lock. The session opens the game stream, waits for
//! `gameFull`, then follows `gameState` events until the game ends, the
//! stream closes, or the poller aborts it because the game left the list.

pub mod board;
pub mod game;
pub mod poller;
pub mod registry;
pub mod submitter;

pub use board::{LocalBoard, SyncOutcome};
pub use game::{GameSession, SessionState, TurnOutcome};
pub use poller::{CycleReport, SessionPoller};
pub use registry::{ReconcileReport, SessionRegistry};
pub use submitter::{MoveSubmitter, SubmitOutcome};

use crate::engine::{EngineError, EngineSupervisor, MoveRequest};
use crate::net::GameApi;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while handling a game
#[derive(Debug, Error)]
pub enum SessionError {
    /// Position string could not be parsed
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    /// Move is malformed or not legal in the current position
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    /// Engine could not be restarted
    #[error("Fatal engine failure: {0}")]
    Fatal(#[from] EngineError),
}

/// Errors that stop the agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Engine restart failed in some session
    #[error("Engine failure: {0}")]
    Engine(#[from] EngineError),
}

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionContext {
    /// Remote API
    pub api: Arc<dyn GameApi>,

    /// Shared engine
    pub engine: Arc<EngineSupervisor>,

    /// Move submission with retries
    pub submitter: Arc<MoveSubmitter>,

    /// Budget of each move computation
    pub move_request: MoveRequest,

    /// Account ID of the bot, used to find its color in `gameFull`
    pub account_id: Option<String>,

    /// Unrecoverable engine failures, consumed by the poller
    pub fatal: mpsc::UnboundedSender<EngineError>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("engine", &self.engine)
            .field("move_request", &self.move_request)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}
