//! Challenge records and acceptance criteria.

use serde::Deserialize;
use std::str::FromStr;

/// Seconds in one correspondence day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Title the server gives to bot accounts
pub const BOT_TITLE: &str = "BOT";

/// Incoming challenge as listed by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    /// Challenge ID
    pub id: String,

    /// Player who sent the challenge
    #[serde(default)]
    pub challenger: Challenger,

    /// Whether the challenger asked for a rated game
    #[serde(default)]
    pub rated: bool,

    /// Requested variant
    #[serde(default)]
    pub variant: Option<Variant>,

    /// Requested time control
    #[serde(default)]
    pub time_control: Option<TimeControl>,

    /// Rematch flag
    #[serde(default)]
    pub rematch: bool,

    /// Game this challenge is a rematch of
    #[serde(default)]
    pub rematch_of: Option<String>,
}

impl ChallengeRecord {
    /// Whether this challenge asks for a rematch
    pub fn is_rematch(&self) -> bool {
        self.rematch || self.rematch_of.is_some()
    }

    /// Variant key, if the server sent one
    pub fn variant_key(&self) -> Option<&str> {
        self.variant.as_ref().map(|v| v.key.as_str())
    }
}

/// Challenger identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Challenger {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rating: Option<u32>,
}

impl Challenger {
    /// Whether the account carries the bot title
    pub fn is_bot(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|title| title.eq_ignore_ascii_case(BOT_TITLE))
    }
}

/// Variant descriptor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Variant {
    pub key: String,
}

/// Time control descriptor, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimeControl {
    /// Real-time clock with increment, both in seconds
    Clock {
        #[serde(default)]
        limit: u64,
        #[serde(default)]
        increment: u64,
    },
    /// Days per move
    Correspondence {
        #[serde(default, rename = "daysPerTurn")]
        days_per_turn: Option<u64>,
    },
    /// No clock
    Unlimited,
    /// Any other declared type
    #[serde(other)]
    Unsupported,
}

impl TimeControl {
    /// Normalize to `(main_seconds, increment_seconds)`.
    ///
    /// Returns `None` for unsupported types and for correspondence values
    /// that overflow when converted to seconds.
    pub fn normalized(&self) -> Option<(u64, u64)> {
        match self {
            TimeControl::Unlimited => Some((0, 0)),
            TimeControl::Correspondence { days_per_turn } => days_per_turn
                .unwrap_or(1)
                .checked_mul(SECONDS_PER_DAY)
                .map(|main| (main, 0)),
            TimeControl::Clock { limit, increment } => Some((*limit, *increment)),
            TimeControl::Unsupported => None,
        }
    }
}

/// One allowed time control: exact main time, minimum increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeControlRule {
    /// Main time in seconds, matched exactly
    pub main_seconds: u64,
    /// Smallest accepted increment in seconds
    pub min_increment_seconds: u64,
}

impl TimeControlRule {
    pub fn new(main_seconds: u64, min_increment_seconds: u64) -> Self {
        Self {
            main_seconds,
            min_increment_seconds,
        }
    }

    /// Whether a normalized `(main, increment)` pair satisfies this rule
    pub fn admits(&self, main_seconds: u64, increment_seconds: u64) -> bool {
        main_seconds == self.main_seconds && increment_seconds >= self.min_increment_seconds
    }

    /// Parse a comma-separated list such as `"180+0,180+2,300+5"`
    pub fn parse_list(list: &str) -> Result<Vec<Self>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for TimeControlRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (main, increment) = s
            .split_once('+')
            .ok_or_else(|| format!("Time control '{s}' must look like MAIN+INCREMENT"))?;
        let main_seconds = main
            .trim()
            .parse()
            .map_err(|_| format!("Invalid main time in '{s}'"))?;
        let min_increment_seconds = increment
            .trim()
            .parse()
            .map_err(|_| format!("Invalid increment in '{s}'"))?;
        Ok(Self::new(main_seconds, min_increment_seconds))
    }
}

impl std::fmt::Display for TimeControlRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.main_seconds, self.min_increment_seconds)
    }
}

/// Static rule table for incoming challenges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceCriteria {
    /// Lowest accepted challenger rating (inclusive)
    pub min_rating: u32,

    /// Highest accepted challenger rating (inclusive)
    pub max_rating: u32,

    /// Allowed time controls
    pub time_controls: Vec<TimeControlRule>,

    /// Allowed variant keys
    pub variants: Vec<String>,

    /// Required rated flag
    pub rated: bool,

    /// Whether rematches are accepted
    pub allow_rematches: bool,

    /// Whether challenges from bot accounts are declined
    pub deny_bots: bool,
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self {
            min_rating: 1500,
            max_rating: 3000,
            time_controls: vec![
                TimeControlRule::new(60, 0),
                TimeControlRule::new(180, 0),
                TimeControlRule::new(180, 2),
                TimeControlRule::new(300, 0),
                TimeControlRule::new(300, 5),
                TimeControlRule::new(600, 0),
                TimeControlRule::new(600, 10),
            ],
            variants: vec!["standard".to_string()],
            rated: false,
            allow_rematches: true,
            deny_bots: true,
        }
    }
}

impl AcceptanceCriteria {
    /// Validate criteria
    pub fn validate(&self) -> Result<(), String> {
        if self.min_rating > self.max_rating {
            return Err(format!(
                "Min rating {} is above max rating {}",
                self.min_rating, self.max_rating
            ));
        }

        if self.variants.is_empty() {
            return Err("At least one variant must be allowed".to_string());
        }

        if self.time_controls.is_empty() {
            return Err("At least one time control must be allowed".to_string());
        }

        Ok(())
    }

    /// Whether the variant key is allowed
    pub fn allows_variant(&self, key: &str) -> bool {
        self.variants.iter().any(|v| v == key)
    }

    /// Whether the rating lies in `[min_rating, max_rating]`
    pub fn rating_in_range(&self, rating: u32) -> bool {
        (self.min_rating..=self.max_rating).contains(&rating)
    }

    /// Whether some allowed time control admits the normalized pair
    pub fn allows_time_control(&self, main_seconds: u64, increment_seconds: u64) -> bool {
        self.time_controls
            .iter()
            .any(|rule| rule.admits(main_seconds, increment_seconds))
    }
}
