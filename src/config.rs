//! Game and registry tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Round wins needed to take the match.
pub const WIN_THRESHOLD: u32 = 5;

/// Seconds both players have to agree after a round before the game ends.
pub const POST_ROUND_TIMEOUT_SECS: u64 = 60;

/// Seconds shown on the advisory countdown after an answer.
pub const ANSWER_COUNTDOWN_SECS: u64 = 10;

/// Seconds without activity before a session is reclaimed (2 hours).
pub const IDLE_TIMEOUT_SECS: u64 = 2 * 60 * 60;

/// Seconds between staleness sweeps (10 minutes).
pub const SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// Maximum display-name length, in characters.
pub const MAX_NAME_LEN: usize = 20;

/// Errors raised while loading or validating a [`GameConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Tuning shared by every session of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Round wins that end the match.
    pub win_threshold: u32,
    /// How long players have to agree on what happens after a round.
    pub post_round_timeout_secs: u64,
    /// Length of the advisory countdown started by an answer.
    pub answer_countdown_secs: u64,
    /// Inactivity after which a session counts as stale.
    pub idle_timeout_secs: u64,
    /// Pause between background staleness sweeps.
    pub sweep_interval_secs: u64,
    /// Cap on display names, in characters.
    pub max_name_len: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            win_threshold: WIN_THRESHOLD,
            post_round_timeout_secs: POST_ROUND_TIMEOUT_SECS,
            answer_countdown_secs: ANSWER_COUNTDOWN_SECS,
            idle_timeout_secs: IDLE_TIMEOUT_SECS,
            sweep_interval_secs: SWEEP_INTERVAL_SECS,
            max_name_len: MAX_NAME_LEN,
        }
    }
}

impl GameConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 6] = [
            ("win_threshold", self.win_threshold > 0),
            ("post_round_timeout_secs", self.post_round_timeout_secs > 0),
            ("answer_countdown_secs", self.answer_countdown_secs > 0),
            ("idle_timeout_secs", self.idle_timeout_secs > 0),
            ("sweep_interval_secs", self.sweep_interval_secs > 0),
            ("max_name_len", self.max_name_len > 0),
        ];
        for (field, ok) in checks {
            if !ok {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(())
    }

    pub fn post_round_timeout(&self) -> Duration {
        Duration::from_secs(self.post_round_timeout_secs)
    }

    pub fn answer_countdown(&self) -> Duration {
        Duration::from_secs(self.answer_countdown_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
