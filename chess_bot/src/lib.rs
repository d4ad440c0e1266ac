//! # Chess Bot
//!
//! A concurrent game-session manager for a chess bot account on a remote game
//! server that speaks the Lichess Bot API.
//!
//! The agent filters incoming challenges, follows every game the server
//! reports as being played, keeps a local board replica in step with the
//! server's move history, asks a UCI engine for moves and submits them.
//!
//! ## Architecture
//!
//! - **Challenge filtering**: a pure rule table deciding accept/decline
//! - **Session poller**: discovers challenges and games at jittered intervals
//! - **Session registry**: the single map of running game sessions
//! - **Game session**: one task per game, driven by the game's event stream
//! - **Engine supervisor**: serialized access to one shared engine process,
//!   with supervised restarts
//! - **Move submitter**: bounded retries for move submission
//!
//! ## Core Modules
//!
//! - [`challenge`]: acceptance criteria and the challenge filter
//! - [`engine`]: the UCI engine process and its supervisor
//! - [`net`]: remote API client, wire types and the event stream parser
//! - [`session`]: board sync, game sessions, registry, poller, submitter
//! - [`clock`]: injectable sleeping, poll jitter and retry policy
//!
//! ## Example
//!
//! ```
//! use chess_bot::challenge::{AcceptanceCriteria, evaluate_raw};
//!
//! let criteria = AcceptanceCriteria::default();
//! let decision = evaluate_raw(
//!     serde_json::json!({
//!         "id": "x1",
//!         "challenger": { "id": "alice", "name": "Alice", "rating": 1600 },
//!         "rated": false,
//!         "variant": { "key": "standard" },
//!         "timeControl": { "type": "clock", "limit": 180, "increment": 2 }
//!     }),
//!     &criteria,
//! );
//! assert!(decision.is_accept());
//! ```

/// Challenge records, acceptance criteria and the challenge filter.
pub mod challenge;

/// Injectable time source, poll schedule and retry policy.
pub mod clock;

/// UCI engine process and the engine supervisor.
pub mod engine;

/// Remote API client, wire types and event stream decoding.
pub mod net;

/// Game sessions, board synchronization, registry and poller.
pub mod session;

pub use challenge::{AcceptanceCriteria, ChallengeDecision, ChallengeRecord, TimeControlRule};
pub use clock::{Clock, PollSchedule, RetryPolicy, TokioClock};
pub use engine::{EngineParams, EngineSupervisor, MoveRequest, UciLauncher};
pub use net::{ApiError, GameApi, HttpApiClient};
pub use session::{
    AgentError, GameSession, MoveSubmitter, SessionContext, SessionPoller, SessionRegistry,
};
