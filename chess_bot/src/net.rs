//! Networking layer for talking to the game server.
//!
//! This module provides the remote API client (bearer-authenticated HTTP via
//! `reqwest`), the wire types it exchanges, and the decoder that turns a
//! game's NDJSON event stream into typed events.

/// HTTP client for the game server and the `GameApi` trait.
pub mod client;

/// Error types for remote API calls.
pub mod errors;

/// Wire types for requests, responses and stream events.
pub mod messages;

/// Newline-delimited JSON stream decoding.
pub mod stream;

pub use client::{GameApi, HttpApiClient};
pub use errors::{ApiError, Result};
pub use messages::{
    Account, ChatRoom, GameEvent, GameFull, GameSnapshot, GameState, PlayerColor, PlayingGame,
};
pub use stream::{EventStream, LineDecoder, decode_events, decode_records};
