//! Move-computation engine.
//!
//! One external UCI process is shared by every game session. The
//! [`EngineSupervisor`] owns it, serializes searches through an async mutex
//! and relaunches the process when it dies or stops answering.

pub mod errors;
pub mod models;
pub mod supervisor;
pub mod uci;

pub use errors::{ComputeError, EngineError};
pub use models::{EngineParams, MoveRequest};
pub use supervisor::{DEFAULT_RESTART_PAUSE, EngineSupervisor, UNRESPONSIVE_AFTER};
pub use uci::{
    EngineLauncher, EngineProcess, UciEngine, UciLauncher, parse_best_move, parse_uci_move,
};
