//! Challenge module deciding which incoming challenges the bot plays.
//!
//! This module implements:
//! - ChallengeRecord: the challenge as reported by the server
//! - AcceptanceCriteria: the static rule table, loaded once at startup
//! - The filter: a pure function from (record, criteria) to a decision
//!
//! ## Rules
//!
//! Evaluated in order, the first failing rule decides:
//!
//! 1. Rematches skip variant, rating and time checks
//! 2. Bots are denied when `deny_bots` is set
//! 3. The variant must be allowed
//! 4. The requested rated flag must match
//! 5. The time control type must be clock, correspondence or unlimited
//! 6. The rating, when present, must be in range
//! 7. The main time must match an allowed entry whose minimum increment is met

pub mod filter;
pub mod models;

pub use filter::{AcceptReason, ChallengeDecision, DenyReason, evaluate, evaluate_raw};
pub use models::{
    AcceptanceCriteria, ChallengeRecord, Challenger, TimeControl, TimeControlRule, Variant,
};
