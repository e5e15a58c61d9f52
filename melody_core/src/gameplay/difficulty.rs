use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chart::Quality;
use crate::error::{EngineError, Result};

/// Difficulty tiers, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    VeryEasy,
    #[default]
    Easy,
    Medium,
    Hard,
    VeryHard,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 5] = [
        DifficultyLevel::VeryEasy,
        DifficultyLevel::Easy,
        DifficultyLevel::Medium,
        DifficultyLevel::Hard,
        DifficultyLevel::VeryHard,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DifficultyLevel::VeryEasy => "Super Easy",
            DifficultyLevel::Easy => "Easy",
            DifficultyLevel::Medium => "Medium",
            DifficultyLevel::Hard => "Hard",
            DifficultyLevel::VeryHard => "Super Hard",
        }
    }

    pub fn config(self) -> DifficultyConfig {
        let (note_speed, timing_multiplier, lane_count, max_notes_per_beat, show_hints, look_ahead_ms, assist_level) =
            match self {
                DifficultyLevel::VeryEasy => (0.6, 1.5, 2, 1, true, 3000.0, 2),
                DifficultyLevel::Easy => (0.8, 1.3, 3, 1, true, 2500.0, 1),
                DifficultyLevel::Medium => (1.0, 1.0, 4, 2, false, 2000.0, 0),
                DifficultyLevel::Hard => (1.2, 0.8, 5, 2, false, 1500.0, 0),
                DifficultyLevel::VeryHard => (1.5, 0.6, 5, 3, false, 1200.0, 0),
            };
        DifficultyConfig {
            level: self,
            note_speed,
            timing_multiplier,
            lane_count,
            max_notes_per_beat,
            show_hints,
            look_ahead_ms,
            assist_level,
        }
    }

    pub fn harder(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn easier(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn for_age(age: u32) -> Self {
        match age {
            0..=5 => DifficultyLevel::VeryEasy,
            6..=7 => DifficultyLevel::Easy,
            8..=9 => DifficultyLevel::Medium,
            _ => DifficultyLevel::Hard,
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Fixed gameplay parameters for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub level: DifficultyLevel,
    pub note_speed: f64,
    /// Applied to the base timing windows: above 1 widens, below 1 narrows.
    pub timing_multiplier: f64,
    pub lane_count: u8,
    pub max_notes_per_beat: u8,
    pub show_hints: bool,
    /// Preview time a renderer may use for note travel. The spawner derives
    /// its own look-ahead from `note_speed`.
    pub look_ahead_ms: f64,
    pub assist_level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub enabled: bool,
    pub window_size: usize,
    pub raise_accuracy: f64,
    pub lower_accuracy: f64,
    pub raise_perfect_streak: u32,
    pub lower_miss_streak: u32,
    pub initial_level: DifficultyLevel,
    pub min_level: DifficultyLevel,
    pub max_level: DifficultyLevel,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size: 20,
            raise_accuracy: 0.85,
            lower_accuracy: 0.50,
            raise_perfect_streak: 5,
            lower_miss_streak: 3,
            initial_level: DifficultyLevel::Easy,
            min_level: DifficultyLevel::VeryEasy,
            max_level: DifficultyLevel::VeryHard,
        }
    }
}

impl AdaptiveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_level > self.max_level {
            return Err(EngineError::InvertedBounds {
                min: self.min_level,
                max: self.max_level,
            });
        }
        if self.window_size == 0 {
            return Err(EngineError::InvalidConfig("adaptive window size must be > 0".to_string()));
        }
        if self.lower_accuracy > self.raise_accuracy {
            return Err(EngineError::InvalidConfig(format!(
                "lower accuracy {} is above raise accuracy {}",
                self.lower_accuracy, self.raise_accuracy
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Raise,
    Lower,
    Hold,
}

/// Rolling performance as seen by the adjustment policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub samples: usize,
    pub accuracy: f64,
    pub perfect_streak: u32,
    pub miss_streak: u32,
}

/// Pure hysteresis policy: raising and lowering need distinct accuracy
/// thresholds and streaks, and nothing moves until the window is half full.
pub fn evaluate(
    config: &AdaptiveConfig,
    level: DifficultyLevel,
    perf: &Performance,
) -> Adjustment {
    if perf.samples < config.window_size / 2 {
        return Adjustment::Hold;
    }
    if perf.accuracy >= config.raise_accuracy
        && perf.perfect_streak >= config.raise_perfect_streak
        && level < config.max_level
    {
        Adjustment::Raise
    } else if perf.accuracy <= config.lower_accuracy
        && perf.miss_streak >= config.lower_miss_streak
        && level > config.min_level
    {
        Adjustment::Lower
    } else {
        Adjustment::Hold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyChange {
    pub from: DifficultyLevel,
    pub to: DifficultyLevel,
    pub config: DifficultyConfig,
}

#[derive(Debug, Clone)]
pub struct DifficultyManager {
    adaptive: AdaptiveConfig,
    level: DifficultyLevel,
    window: VecDeque<f64>,
    perfect_streak: u32,
    miss_streak: u32,
}

impl Default for DifficultyManager {
    fn default() -> Self {
        Self {
            level: DifficultyLevel::Easy,
            window: VecDeque::with_capacity(20),
            adaptive: AdaptiveConfig::default(),
            perfect_streak: 0,
            miss_streak: 0,
        }
    }
}

impl DifficultyManager {
    pub fn new(adaptive: AdaptiveConfig) -> Result<Self> {
        adaptive.validate()?;
        let level = adaptive
            .initial_level
            .clamp(adaptive.min_level, adaptive.max_level);
        Ok(Self {
            level,
            window: VecDeque::with_capacity(adaptive.window_size),
            adaptive,
            perfect_streak: 0,
            miss_streak: 0,
        })
    }

    pub fn level(&self) -> DifficultyLevel {
        self.level
    }

    pub fn config(&self) -> DifficultyConfig {
        self.level.config()
    }

    pub fn adaptive(&self) -> &AdaptiveConfig {
        &self.adaptive
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive.enabled
    }

    pub fn set_adaptive_enabled(&mut self, enabled: bool) {
        self.adaptive.enabled = enabled;
    }

    pub fn bounds(&self) -> (DifficultyLevel, DifficultyLevel) {
        (self.adaptive.min_level, self.adaptive.max_level)
    }

    /// Tightens or loosens the tier bounds, clamping the current level into
    /// them. Inverted bounds are rejected and the old bounds kept.
    pub fn set_bounds(
        &mut self,
        min: DifficultyLevel,
        max: DifficultyLevel,
    ) -> Result<Option<DifficultyChange>> {
        if min > max {
            warn!(?min, ?max, "rejected inverted difficulty bounds");
            return Err(EngineError::InvertedBounds { min, max });
        }
        self.adaptive.min_level = min;
        self.adaptive.max_level = max;
        Ok(self.change_to(self.level.clamp(min, max)))
    }

    pub fn record_judgment(&mut self, quality: Quality) -> Option<DifficultyChange> {
        if self.window.len() >= self.adaptive.window_size {
            self.window.pop_front();
        }
        self.window.push_back(quality.accuracy());

        match quality {
            Quality::Perfect => {
                self.perfect_streak += 1;
                self.miss_streak = 0;
            }
            Quality::Miss => {
                self.miss_streak += 1;
                self.perfect_streak = 0;
            }
            Quality::Good | Quality::Ok => {
                self.perfect_streak = 0;
                self.miss_streak = 0;
            }
        }

        if !self.adaptive.enabled {
            return None;
        }
        match evaluate(&self.adaptive, self.level, &self.performance()) {
            Adjustment::Raise => self.level.harder().and_then(|next| self.change_to(next)),
            Adjustment::Lower => self.level.easier().and_then(|next| self.change_to(next)),
            Adjustment::Hold => None,
        }
    }

    /// Explicit selection; clamped into the configured bounds.
    pub fn set_level(&mut self, level: DifficultyLevel) -> Option<DifficultyChange> {
        let level = level.clamp(self.adaptive.min_level, self.adaptive.max_level);
        self.change_to(level)
    }

    pub fn increase(&mut self) -> Option<DifficultyChange> {
        self.level.harder().and_then(|next| self.set_level(next))
    }

    pub fn decrease(&mut self) -> Option<DifficultyChange> {
        self.level.easier().and_then(|next| self.set_level(next))
    }

    pub fn configure_for_age(&mut self, age: u32) -> Option<DifficultyChange> {
        self.set_level(DifficultyLevel::for_age(age))
    }

    fn change_to(&mut self, level: DifficultyLevel) -> Option<DifficultyChange> {
        if level == self.level {
            return None;
        }
        let from = self.level;
        self.level = level;
        self.perfect_streak = 0;
        self.miss_streak = 0;
        info!(%from, to = %level, "difficulty changed");
        Some(DifficultyChange {
            from,
            to: level,
            config: level.config(),
        })
    }

    pub fn performance(&self) -> Performance {
        Performance {
            samples: self.window.len(),
            accuracy: self.rolling_accuracy(),
            perfect_streak: self.perfect_streak,
            miss_streak: self.miss_streak,
        }
    }

    /// Mean of the rolling window; 0.5 before anything was recorded.
    pub fn rolling_accuracy(&self) -> f64 {
        if self.window.is_empty() {
            return 0.5;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn perfect_streak(&self) -> u32 {
        self.perfect_streak
    }

    pub fn miss_streak(&self) -> u32 {
        self.miss_streak
    }

    /// Clears performance history, keeping the level.
    pub fn reset(&mut self) {
        self.window.clear();
        self.perfect_streak = 0;
        self.miss_streak = 0;
    }

    /// Clears history and returns to the initial level.
    pub fn full_reset(&mut self) -> Option<DifficultyChange> {
        self.reset();
        let initial = self
            .adaptive
            .initial_level
            .clamp(self.adaptive.min_level, self.adaptive.max_level);
        self.change_to(initial)
    }
}
