//! Challenge filter: a pure decision over a challenge and the criteria.

use super::models::{AcceptanceCriteria, ChallengeRecord, TimeControl};
use serde_json::Value;

/// Why a challenge was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    Rematch,
    Challenge,
}

impl std::fmt::Display for AcceptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptReason::Rematch => write!(f, "Rematch accepted"),
            AcceptReason::Challenge => write!(f, "Challenge accepted"),
        }
    }
}

/// Why a challenge was declined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// Rematches are switched off
    RematchesDisabled,

    /// Challenger is a bot and bots are denied
    Bot { rematch: bool },

    /// Variant not in the allowed set
    Variant(Option<String>),

    /// Requested rated flag differs from the required one
    RatedMismatch { requested: bool },

    /// Time control type is not clock, correspondence or unlimited
    TimeControlType,

    /// Challenger rating outside the configured range
    RatingOutOfRange(u32),

    /// No allowed time control admits the requested one
    TimeControl { main_seconds: u64, increment_seconds: u64 },

    /// Record could not be evaluated
    ProcessingError,
}

impl DenyReason {
    /// Decline reason key understood by the server
    pub fn decline_key(&self) -> &'static str {
        match self {
            DenyReason::RematchesDisabled => "generic",
            DenyReason::Bot { .. } => "noBot",
            DenyReason::Variant(_) => "variant",
            DenyReason::RatedMismatch { requested: true } => "casual",
            DenyReason::RatedMismatch { requested: false } => "rated",
            DenyReason::TimeControlType => "timeControl",
            DenyReason::RatingOutOfRange(_) => "generic",
            DenyReason::TimeControl { .. } => "timeControl",
            DenyReason::ProcessingError => "generic",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::RematchesDisabled => write!(f, "Rematches are disabled"),
            DenyReason::Bot { rematch: true } => write!(f, "Rematch from a bot declined"),
            DenyReason::Bot { rematch: false } => write!(f, "Challenge from a bot declined"),
            DenyReason::Variant(Some(key)) => write!(f, "Unsupported variant {key}"),
            DenyReason::Variant(None) => write!(f, "Missing variant"),
            DenyReason::RatedMismatch { requested } => {
                write!(f, "Unsupported mode rated={requested}")
            }
            DenyReason::TimeControlType => write!(f, "Unsupported time control type"),
            DenyReason::RatingOutOfRange(rating) => write!(f, "Rating {rating} out of range"),
            DenyReason::TimeControl {
                main_seconds,
                increment_seconds,
            } => write!(
                f,
                "Time control {main_seconds}+{increment_seconds} not allowed"
            ),
            DenyReason::ProcessingError => write!(f, "Processing error"),
        }
    }
}

/// Outcome of filtering one challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeDecision {
    Accept(AcceptReason),
    Deny(DenyReason),
}

impl ChallengeDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, ChallengeDecision::Accept(_))
    }

    /// Human-readable reason
    pub fn reason(&self) -> String {
        match self {
            ChallengeDecision::Accept(reason) => reason.to_string(),
            ChallengeDecision::Deny(reason) => reason.to_string(),
        }
    }

    /// Server decline key, `None` when accepted
    pub fn decline_key(&self) -> Option<&'static str> {
        match self {
            ChallengeDecision::Accept(_) => None,
            ChallengeDecision::Deny(reason) => Some(reason.decline_key()),
        }
    }
}

/// Decide whether to accept a challenge.
///
/// # Arguments
///
/// * `challenge` - Challenge as listed by the server
/// * `criteria` - Static acceptance criteria
///
/// # Returns
///
/// * `ChallengeDecision` - Accept or deny, with the first rule that decided
pub fn evaluate(challenge: &ChallengeRecord, criteria: &AcceptanceCriteria) -> ChallengeDecision {
    use ChallengeDecision::{Accept, Deny};

    let challenger = &challenge.challenger;

    if challenge.is_rematch() {
        if !criteria.allow_rematches {
            return Deny(DenyReason::RematchesDisabled);
        }
        if criteria.deny_bots && challenger.is_bot() {
            return Deny(DenyReason::Bot { rematch: true });
        }
        return Accept(AcceptReason::Rematch);
    }

    if criteria.deny_bots && challenger.is_bot() {
        return Deny(DenyReason::Bot { rematch: false });
    }

    match challenge.variant_key() {
        Some(key) if criteria.allows_variant(key) => {}
        other => return Deny(DenyReason::Variant(other.map(str::to_string))),
    }

    if challenge.rated != criteria.rated {
        return Deny(DenyReason::RatedMismatch {
            requested: challenge.rated,
        });
    }

    let time_control = match &challenge.time_control {
        Some(tc) if *tc != TimeControl::Unsupported => tc,
        _ => return Deny(DenyReason::TimeControlType),
    };

    let Some((main_seconds, increment_seconds)) = time_control.normalized() else {
        log::error!(
            "Failed to normalize time control {:?} of challenge {}",
            time_control,
            challenge.id
        );
        return Deny(DenyReason::ProcessingError);
    };

    if let Some(rating) = challenger.rating.filter(|r| !criteria.rating_in_range(*r)) {
        return Deny(DenyReason::RatingOutOfRange(rating));
    }

    if !criteria.allows_time_control(main_seconds, increment_seconds) {
        return Deny(DenyReason::TimeControl {
            main_seconds,
            increment_seconds,
        });
    }

    Accept(AcceptReason::Challenge)
}

/// Decode a raw challenge record and evaluate it.
///
/// A record that does not decode is denied with [`DenyReason::ProcessingError`].
pub fn evaluate_raw(record: Value, criteria: &AcceptanceCriteria) -> ChallengeDecision {
    match serde_json::from_value::<ChallengeRecord>(record) {
        Ok(challenge) => evaluate(&challenge, criteria),
        Err(e) => {
            log::error!("Failed to process challenge: {}", e);
            ChallengeDecision::Deny(DenyReason::ProcessingError)
        }
    }
}
