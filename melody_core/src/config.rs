use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::gameplay::difficulty::AdaptiveConfig;
use crate::gameplay::score::ScoreConfig;
use crate::gameplay::spawner::DEFAULT_LOOK_AHEAD_MS;
use crate::gameplay::windows::TimingWindows;
use crate::time::clock::DEFAULT_DRIFT_THRESHOLD_MS;
use crate::time::DEFAULT_MAX_FRAME_DELTA_MS;

pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 3;

/// Tunables for one session. Every field has a default, so a JSON file
/// only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spawn look-ahead at note speed 1.0.
    pub look_ahead_ms: f64,
    pub max_frame_delta_ms: f64,
    pub drift_threshold_ms: f64,
    pub countdown_seconds: u32,
    /// Windows at timing multiplier 1.0; the difficulty tier scales them.
    pub windows: TimingWindows,
    pub score: ScoreConfig,
    pub adaptive: AdaptiveConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            look_ahead_ms: DEFAULT_LOOK_AHEAD_MS,
            max_frame_delta_ms: DEFAULT_MAX_FRAME_DELTA_MS,
            drift_threshold_ms: DEFAULT_DRIFT_THRESHOLD_MS,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            windows: TimingWindows::kids(),
            score: ScoreConfig::for_kids(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("look_ahead_ms", self.look_ahead_ms),
            ("max_frame_delta_ms", self.max_frame_delta_ms),
            ("drift_threshold_ms", self.drift_threshold_ms),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(EngineError::InvalidConfig(format!("{name} must be > 0 (got {value})")));
        }
        self.windows.validate()?;
        self.score.validate()?;
        self.adaptive.validate()?;
        Ok(())
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        if let Err(err) = config.validate() {
            warn!(%err, "rejected engine config");
            return Err(err);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameplay::difficulty::DifficultyLevel;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"countdown_seconds": 5, "adaptive": {"enabled": false}}"#).unwrap();
        assert_eq!(config.countdown_seconds, 5);
        assert!(!config.adaptive.enabled);
        assert_eq!(config.adaptive.window_size, 20);
        assert_eq!(config.windows, TimingWindows::kids());
    }

    #[test]
    fn inconsistent_config_is_rejected() {
        let inverted = r#"{"adaptive": {"min_level": "hard", "max_level": "easy"}}"#;
        assert_eq!(
            EngineConfig::from_json_str(inverted),
            Err(EngineError::InvertedBounds {
                min: DifficultyLevel::Hard,
                max: DifficultyLevel::Easy,
            })
        );

        let windows = r#"{"windows": {"perfect_ms": 90, "good_ms": 80, "ok_ms": 100, "miss_ms": 120}}"#;
        assert!(EngineConfig::from_json_str(windows).is_err());
        assert!(EngineConfig::from_json_str(r#"{"look_ahead_ms": 0}"#).is_err());
    }
}
