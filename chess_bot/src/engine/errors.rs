//! Engine error types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the engine process itself
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configured executable does not exist
    #[error("Engine executable not found at {}", .0.display())]
    NotFound(PathBuf),

    /// Process could not be started
    #[error("Failed to launch engine: {0}")]
    Launch(String),

    /// Process exited or closed its pipes
    #[error("Engine process terminated")]
    Terminated,

    /// Process answered something unexpected
    #[error("Engine protocol error: {0}")]
    Protocol(String),

    /// Process did not answer a command in time
    #[error("Engine did not answer '{command}' within {timeout:?}")]
    Unresponsive { command: String, timeout: Duration },
}

/// Why a move computation produced no move
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    /// Wall-clock budget exceeded
    #[error("Move computation timed out after {0:?}")]
    Timeout(Duration),

    /// Engine of the given generation is gone and needs a restart
    #[error("Engine generation {generation} is dead: {reason}")]
    EngineDead { generation: u64, reason: String },

    /// Engine proposed a move that is not legal in the position
    #[error("Engine proposed illegal move {0}")]
    IllegalMove(String),

    /// Engine reported no move
    #[error("Engine returned no move")]
    NoMove,
}

impl ComputeError {
    /// Generation to restart, when the engine needs one
    pub fn dead_generation(&self) -> Option<u64> {
        match self {
            ComputeError::EngineDead { generation, .. } => Some(*generation),
            _ => None,
        }
    }
}
