//! Engine configuration and per-call budgets.

use std::time::Duration;

/// Default thinking time per move
pub const DEFAULT_THINK_TIME: Duration = Duration::from_millis(50);

/// Default wall-clock budget per move computation
pub const DEFAULT_MOVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Strength parameters applied after every launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    /// Search threads
    pub threads: u32,

    /// Hash table size in MB
    pub hash_mb: u32,

    /// Skill level (0-20)
    pub skill_level: u8,

    /// Whether to cap playing strength at `elo`
    pub limit_strength: bool,

    /// Target rating when strength is limited
    pub elo: u32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 2048,
            skill_level: 1,
            limit_strength: true,
            elo: 1350,
        }
    }
}

impl EngineParams {
    /// UCI `setoption` pairs, in the order they are sent
    pub fn uci_options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Threads", self.threads.to_string()),
            ("Hash", self.hash_mb.to_string()),
            ("Skill Level", self.skill_level.to_string()),
            ("UCI_LimitStrength", self.limit_strength.to_string()),
            ("UCI_Elo", self.elo.to_string()),
        ]
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err("Engine threads must be at least 1".to_string());
        }
        if self.hash_mb == 0 {
            return Err("Engine hash must be at least 1 MB".to_string());
        }
        if self.skill_level > 20 {
            return Err(format!(
                "Skill level {} is outside 0-20",
                self.skill_level
            ));
        }
        Ok(())
    }
}

/// Budget of one move computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    /// `go movetime` value
    pub think_time: Duration,

    /// Total wall-clock bound, including the wait for the engine
    pub timeout: Duration,
}

impl Default for MoveRequest {
    fn default() -> Self {
        Self {
            think_time: DEFAULT_THINK_TIME,
            timeout: DEFAULT_MOVE_TIMEOUT,
        }
    }
}
