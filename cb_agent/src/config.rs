//! Agent configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chess_bot::{
    AcceptanceCriteria, EngineParams, MoveRequest, PollSchedule, RetryPolicy, TimeControlRule,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://lichess.org";
const DEFAULT_ENGINE_PATH: &str = "./stockfish";
const DEFAULT_HEALTH_BIND: &str = "0.0.0.0:8080";
const DEFAULT_TIME_CONTROLS: &str = "60+0,180+0,180+2,300+0,300+5,600+0,600+10";

/// Complete agent configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// API token of the bot account (required)
    pub token: String,
    /// Base URL of the game server
    pub base_url: String,
    /// Path of the UCI engine executable
    pub engine_path: PathBuf,
    /// Health endpoint bind address
    pub health_bind: SocketAddr,
    /// Poller configuration
    pub poll: PollConfig,
    /// Move submission configuration
    pub moves: MoveConfig,
    /// Engine configuration
    pub engine: EngineConfig,
    /// Challenge acceptance rules
    pub challenges: AcceptanceCriteria,
}

/// Delay range between poll cycles
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub delay_min_secs: u64,
    pub delay_max_secs: u64,
}

/// Move submission retries
#[derive(Debug, Clone)]
pub struct MoveConfig {
    /// Total attempts per move
    pub max_attempts: u32,
    /// Pause between attempts
    pub retry_backoff_ms: u64,
    /// Timeout of a single request
    pub request_timeout_ms: u64,
}

/// Engine strength and budgets
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock budget per move computation
    pub move_timeout_ms: u64,
    /// Thinking time passed to `go movetime`
    pub think_ms: u64,
    /// Pause before relaunching a dead engine
    pub restart_pause_ms: u64,
    /// UCI options applied after every launch
    pub params: EngineParams,
}

/// Command line overrides, applied on top of the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub engine_path: Option<PathBuf>,
    pub health_bind: Option<SocketAddr>,
    pub base_url: Option<String>,
}

impl AgentConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values given on the command line
    /// * `lookup` - Returns the value of a variable, if set
    ///
    /// # Returns
    ///
    /// * `Result<AgentConfig, ConfigError>` - Loaded configuration or error
    pub fn from_lookup<F>(overrides: Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "BOT_TOKEN".to_string(),
                hint: "Create a token with the bot:play scope in the account settings"
                    .to_string(),
            })?;

        let base_url = overrides
            .base_url
            .or_else(|| lookup("API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let engine_path = overrides
            .engine_path
            .or_else(|| lookup("ENGINE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_PATH));

        let health_bind = match overrides.health_bind {
            Some(bind) => bind,
            None => parse_required_or(&lookup, "HEALTH_BIND", DEFAULT_HEALTH_BIND)?,
        };

        let poll = PollConfig {
            delay_min_secs: parse_env_or(&lookup, "POLL_DELAY_MIN_SECS", 3),
            delay_max_secs: parse_env_or(&lookup, "POLL_DELAY_MAX_SECS", 7),
        };

        let moves = MoveConfig {
            max_attempts: parse_env_or(&lookup, "MOVE_MAX_ATTEMPTS", 3),
            retry_backoff_ms: parse_env_or(&lookup, "MOVE_RETRY_BACKOFF_MS", 1000),
            request_timeout_ms: parse_env_or(&lookup, "MOVE_REQUEST_TIMEOUT_MS", 5000),
        };

        let defaults = EngineParams::default();
        let engine = EngineConfig {
            move_timeout_ms: parse_env_or(&lookup, "ENGINE_MOVE_TIMEOUT_MS", 5000),
            think_ms: parse_env_or(&lookup, "ENGINE_THINK_MS", 50),
            restart_pause_ms: parse_env_or(&lookup, "ENGINE_RESTART_PAUSE_MS", 1000),
            params: EngineParams {
                threads: parse_env_or(&lookup, "ENGINE_THREADS", defaults.threads),
                hash_mb: parse_env_or(&lookup, "ENGINE_HASH_MB", defaults.hash_mb),
                skill_level: parse_env_or(&lookup, "ENGINE_SKILL_LEVEL", defaults.skill_level),
                limit_strength: parse_env_or(
                    &lookup,
                    "ENGINE_LIMIT_STRENGTH",
                    defaults.limit_strength,
                ),
                elo: parse_env_or(&lookup, "ENGINE_ELO", defaults.elo),
            },
        };

        let time_controls = TimeControlRule::parse_list(
            &lookup("CHALLENGE_TIME_CONTROLS").unwrap_or_else(|| DEFAULT_TIME_CONTROLS.to_string()),
        )
        .map_err(|reason| ConfigError::Invalid {
            var: "CHALLENGE_TIME_CONTROLS".to_string(),
            reason,
        })?;

        let variants = lookup("CHALLENGE_VARIANTS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["standard".to_string()]);

        let rule_defaults = AcceptanceCriteria::default();
        let challenges = AcceptanceCriteria {
            min_rating: parse_env_or(&lookup, "CHALLENGE_MIN_RATING", rule_defaults.min_rating),
            max_rating: parse_env_or(&lookup, "CHALLENGE_MAX_RATING", rule_defaults.max_rating),
            time_controls,
            variants,
            rated: parse_env_or(&lookup, "CHALLENGE_RATED", rule_defaults.rated),
            allow_rematches: parse_env_or(
                &lookup,
                "CHALLENGE_ALLOW_REMATCHES",
                rule_defaults.allow_rematches,
            ),
            deny_bots: parse_env_or(&lookup, "CHALLENGE_DENY_BOTS", rule_defaults.deny_bots),
        };

        Ok(AgentConfig {
            token,
            base_url,
            engine_path,
            health_bind,
            poll,
            moves,
            engine,
            challenges,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "API_BASE_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        if self.poll.delay_min_secs > self.poll.delay_max_secs {
            return Err(ConfigError::Invalid {
                var: "POLL_DELAY_MAX_SECS".to_string(),
                reason: format!(
                    "Must be at least the min delay ({})",
                    self.poll.delay_min_secs
                ),
            });
        }

        if self.moves.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "MOVE_MAX_ATTEMPTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.engine.think_ms >= self.engine.move_timeout_ms {
            return Err(ConfigError::Invalid {
                var: "ENGINE_THINK_MS".to_string(),
                reason: format!(
                    "Must be below the move timeout ({} ms)",
                    self.engine.move_timeout_ms
                ),
            });
        }

        self.engine
            .params
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "ENGINE_*".to_string(),
                reason,
            })?;

        self.challenges
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "CHALLENGE_*".to_string(),
                reason,
            })?;

        Ok(())
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule::new(
            Duration::from_secs(self.poll.delay_min_secs),
            Duration::from_secs(self.poll.delay_max_secs),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.moves.max_attempts,
            backoff: Duration::from_millis(self.moves.retry_backoff_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.moves.request_timeout_ms)
    }

    pub fn move_request(&self) -> MoveRequest {
        MoveRequest {
            think_time: Duration::from_millis(self.engine.think_ms),
            timeout: Duration::from_millis(self.engine.move_timeout_ms),
        }
    }

    pub fn restart_pause(&self) -> Duration {
        Duration::from_millis(self.engine.restart_pause_ms)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env_or`], but a set value that does not parse is an error
fn parse_required_or<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("Cannot parse '{}'", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        load_with(Overrides::default(), vars)
    }

    fn load_with(overrides: Overrides, vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(overrides, |key| env.get(key).cloned())
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "BOT_TOKEN".to_string(),
            hint: "Create one".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("BOT_TOKEN"));
        assert!(msg.contains("Create one"));
    }

    #[test]
    fn test_token_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "BOT_TOKEN"));

        let err = load(&[("BOT_TOKEN", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BOT_TOKEN", "lip_secret")]).unwrap();
        config.validate().unwrap();

        assert_eq!(config.token, "lip_secret");
        assert_eq!(config.base_url, "https://lichess.org");
        assert_eq!(config.engine_path, PathBuf::from("./stockfish"));
        assert_eq!(config.health_bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.poll_schedule(), PollSchedule::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.move_request(), MoveRequest::default());
        assert_eq!(config.restart_pause(), Duration::from_secs(1));
        assert_eq!(config.engine.params, EngineParams::default());
        assert_eq!(config.challenges, AcceptanceCriteria::default());
    }

    #[test]
    fn test_environment_values() {
        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("API_BASE_URL", "http://localhost:9663"),
            ("POLL_DELAY_MIN_SECS", "1"),
            ("POLL_DELAY_MAX_SECS", "2"),
            ("MOVE_MAX_ATTEMPTS", "5"),
            ("ENGINE_ELO", "2000"),
            ("ENGINE_LIMIT_STRENGTH", "false"),
            ("CHALLENGE_TIME_CONTROLS", "30+0, 900+15"),
            ("CHALLENGE_VARIANTS", "standard, chess960"),
            ("CHALLENGE_RATED", "true"),
        ])
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.base_url, "http://localhost:9663");
        assert_eq!(config.poll.delay_min_secs, 1);
        assert_eq!(config.poll.delay_max_secs, 2);
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.engine.params.elo, 2000);
        assert!(!config.engine.params.limit_strength);
        assert_eq!(
            config.challenges.time_controls,
            vec![TimeControlRule::new(30, 0), TimeControlRule::new(900, 15)]
        );
        assert_eq!(config.challenges.variants, vec!["standard", "chess960"]);
        assert!(config.challenges.rated);
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let config = load(&[("BOT_TOKEN", "t"), ("ENGINE_THINK_MS", "fast")]).unwrap();
        assert_eq!(config.engine.think_ms, 50);
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            engine_path: Some(PathBuf::from("/usr/games/stockfish")),
            health_bind: Some("127.0.0.1:9000".parse().unwrap()),
            base_url: Some("http://127.0.0.1:8000".to_string()),
        };
        let config = load_with(
            overrides,
            &[
                ("BOT_TOKEN", "t"),
                ("ENGINE_PATH", "/opt/engine"),
                ("HEALTH_BIND", "not an address"),
            ],
        )
        .unwrap();

        assert_eq!(config.engine_path, PathBuf::from("/usr/games/stockfish"));
        assert_eq!(config.health_bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = load(&[("BOT_TOKEN", "t"), ("HEALTH_BIND", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "HEALTH_BIND"));

        let err = load(&[("BOT_TOKEN", "t"), ("CHALLENGE_TIME_CONTROLS", "blitz")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validation() {
        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("POLL_DELAY_MIN_SECS", "9"),
            ("POLL_DELAY_MAX_SECS", "2"),
        ])
        .unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { .. }
        ));

        let config = load(&[("BOT_TOKEN", "t"), ("MOVE_MAX_ATTEMPTS", "0")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("BOT_TOKEN", "t"), ("ENGINE_THINK_MS", "6000")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("BOT_TOKEN", "t"), ("API_BASE_URL", "lichess.org")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[
            ("BOT_TOKEN", "t"),
            ("CHALLENGE_MIN_RATING", "2500"),
            ("CHALLENGE_MAX_RATING", "2000"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }
}
