use serde::{Deserialize, Serialize};

use crate::chart::Quality;
use crate::error::{EngineError, Result};

pub const COMBO_MILESTONES: [u32; 4] = [5, 10, 20, 50];
pub const SCORE_MILESTONES: [u32; 3] = [1000, 5000, 10000];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub perfect_points: u32,
    pub good_points: u32,
    pub ok_points: u32,
    pub miss_points: u32,

    pub combo_bonus_5: u32,
    pub combo_bonus_10: u32,
    pub combo_bonus_20: u32,

    pub max_multiplier: f64,

    /// Fractions of the max possible score for one, two and three stars.
    pub star_thresholds: [f64; 3],
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self::for_kids()
    }
}

impl ScoreConfig {
    pub fn standard() -> Self {
        Self {
            perfect_points: 100,
            good_points: 75,
            ok_points: 50,
            miss_points: 0,
            combo_bonus_5: 10,
            combo_bonus_10: 25,
            combo_bonus_20: 50,
            max_multiplier: 4.0,
            star_thresholds: [0.50, 0.70, 0.90],
        }
    }

    pub fn for_kids() -> Self {
        Self {
            ok_points: 60,
            star_thresholds: [0.40, 0.60, 0.80],
            ..Self::standard()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let [one, two, three] = self.star_thresholds;
        if !(0.0 <= one && one <= two && two <= three) {
            return Err(EngineError::InvalidConfig(format!(
                "star thresholds must be ascending (got {one}, {two}, {three})"
            )));
        }
        if !(self.max_multiplier.is_finite() && self.max_multiplier >= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "max multiplier must be >= 1 (got {})",
                self.max_multiplier
            )));
        }
        Ok(())
    }

    pub fn base_points(&self, quality: Quality) -> u32 {
        match quality {
            Quality::Perfect => self.perfect_points,
            Quality::Good => self.good_points,
            Quality::Ok => self.ok_points,
            Quality::Miss => self.miss_points,
        }
    }

    /// Combo tier multiplier, never above `max_multiplier`.
    pub fn multiplier(&self, combo: u32) -> f64 {
        let tier = match combo {
            0..=4 => 1.0,
            5..=9 => 1.2,
            10..=19 => 1.5,
            20..=49 => 2.0,
            50..=99 => 3.0,
            _ => self.max_multiplier,
        };
        tier.min(self.max_multiplier)
    }

    pub fn combo_bonus(&self, combo: u32) -> u32 {
        match combo {
            5 => self.combo_bonus_5,
            10 => self.combo_bonus_10,
            20 => self.combo_bonus_20,
            100 => 200,
            c if c > 0 && c % 50 == 0 => 100,
            _ => 0,
        }
    }

    /// Multiplied base points truncate toward zero before the bonus.
    pub fn points_for(&self, quality: Quality, combo: u32) -> u32 {
        let base = self.base_points(quality) as f64 * self.multiplier(combo);
        (base.trunc() as u32).saturating_add(self.combo_bonus(combo))
    }

    /// Score of an all-perfect run over `note_count` notes.
    pub fn max_possible_score(&self, note_count: usize) -> u32 {
        let notes = u32::try_from(note_count).unwrap_or(u32::MAX);
        (1..=notes)
            .map(|combo| self.points_for(Quality::Perfect, combo))
            .fold(0, u32::saturating_add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    Combo(u32),
    Score(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoreEvent {
    ScoreChanged { score: u32, added: u32 },
    ComboChanged(u32),
    ComboBroken { lost: u32 },
    MultiplierChanged(f64),
    Milestone(Milestone),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreUpdate {
    pub points: u32,
    pub events: Vec<ScoreEvent>,
}

/// Final tally handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub score: u32,
    pub max_possible_score: u32,
    pub max_combo: u32,
    pub stars: u8,
    pub perfect: u32,
    pub good: u32,
    pub ok: u32,
    pub miss: u32,
    pub accuracy: f64,
    pub full_combo: bool,
    pub perfect_play: bool,
}

impl Summary {
    pub fn total_hits(&self) -> u32 {
        self.perfect + self.good + self.ok
    }

    pub fn total_notes(&self) -> u32 {
        self.total_hits() + self.miss
    }
}

#[derive(Debug, Clone)]
pub struct ScoreLedger {
    config: ScoreConfig,
    score: u32,
    combo: u32,
    max_combo: u32,
    multiplier: f64,
    counts: [u32; 4],
    total_notes: usize,
    max_possible_score: u32,
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new(ScoreConfig::default())
    }
}

impl ScoreLedger {
    pub fn new(config: ScoreConfig) -> Self {
        Self {
            config,
            score: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1.0,
            counts: [0; 4],
            total_notes: 0,
            max_possible_score: 0,
        }
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ScoreConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        if self.total_notes > 0 {
            self.max_possible_score = self.config.max_possible_score(self.total_notes);
        }
        Ok(())
    }

    /// Resets the tally for a new song of `total_notes` notes.
    pub fn initialize(&mut self, total_notes: usize) {
        self.reset();
        self.total_notes = total_notes;
        self.max_possible_score = self.config.max_possible_score(total_notes);
    }

    pub fn record(&mut self, quality: Quality) -> ScoreUpdate {
        match quality {
            Quality::Miss => self.on_miss(),
            hit => self.on_hit(hit),
        }
    }

    pub fn on_hit(&mut self, quality: Quality) -> ScoreUpdate {
        if quality == Quality::Miss {
            return self.on_miss();
        }

        let old_score = self.score;
        let old_combo = self.combo;
        let old_multiplier = self.multiplier;

        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
        self.counts[quality as usize] += 1;
        self.multiplier = self.config.multiplier(self.combo);

        let points = self.config.points_for(quality, self.combo);
        self.score = self.score.saturating_add(points);

        let mut events = vec![
            ScoreEvent::ScoreChanged {
                score: self.score,
                added: points,
            },
            ScoreEvent::ComboChanged(self.combo),
        ];
        if self.multiplier != old_multiplier {
            events.push(ScoreEvent::MultiplierChanged(self.multiplier));
        }
        events.extend(crossed(&COMBO_MILESTONES, old_combo, self.combo).map(Milestone::Combo).map(ScoreEvent::Milestone));
        events.extend(crossed(&SCORE_MILESTONES, old_score, self.score).map(Milestone::Score).map(ScoreEvent::Milestone));

        ScoreUpdate { points, events }
    }

    pub fn on_miss(&mut self) -> ScoreUpdate {
        self.counts[Quality::Miss as usize] += 1;
        let lost = self.combo;
        let old_multiplier = self.multiplier;
        self.combo = 0;
        self.multiplier = 1.0;

        let mut events = Vec::new();
        if lost > 0 {
            events.push(ScoreEvent::ComboBroken { lost });
            events.push(ScoreEvent::ComboChanged(0));
        }
        if old_multiplier != 1.0 {
            events.push(ScoreEvent::MultiplierChanged(1.0));
        }
        ScoreUpdate { points: 0, events }
    }

    /// 0 to 3 stars from the share of the max possible score.
    pub fn stars(&self) -> u8 {
        let Some(pct) = self.score_fraction() else {
            return 0;
        };
        self.config
            .star_thresholds
            .iter()
            .take_while(|t| pct >= **t)
            .count() as u8
    }

    pub fn progress_to_next_star(&self) -> f64 {
        let Some(pct) = self.score_fraction() else {
            return 0.0;
        };
        let [one, two, three] = self.config.star_thresholds;
        let span = |lo: f64, hi: f64| if hi > lo { (pct - lo) / (hi - lo) } else { 1.0 };
        if pct >= three {
            1.0
        } else if pct >= two {
            span(two, three)
        } else if pct >= one {
            span(one, two)
        } else {
            span(0.0, one)
        }
    }

    fn score_fraction(&self) -> Option<f64> {
        (self.max_possible_score > 0).then(|| self.score as f64 / self.max_possible_score as f64)
    }

    /// Weighted accuracy: perfect 100, good 75, ok 50, miss 0.
    pub fn accuracy_percent(&self) -> f64 {
        let judged: u32 = self.counts.iter().sum();
        if judged == 0 {
            return 100.0;
        }
        let weighted: f64 = Quality::ALL
            .iter()
            .map(|q| self.counts[*q as usize] as f64 * q.accuracy() * 100.0)
            .sum();
        weighted / judged as f64
    }

    pub fn completion_percent(&self) -> f64 {
        if self.total_notes == 0 {
            return 0.0;
        }
        let judged: u32 = self.counts.iter().sum();
        judged as f64 / self.total_notes as f64 * 100.0
    }

    pub fn score_percent(&self) -> f64 {
        self.score_fraction().map_or(0.0, |f| f * 100.0)
    }

    pub fn summary(&self) -> Summary {
        let [perfect, good, ok, miss] = self.counts;
        Summary {
            score: self.score,
            max_possible_score: self.max_possible_score,
            max_combo: self.max_combo,
            stars: self.stars(),
            perfect,
            good,
            ok,
            miss,
            accuracy: self.accuracy_percent(),
            full_combo: miss == 0,
            perfect_play: miss == 0 && ok == 0 && good == 0,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn count(&self, quality: Quality) -> u32 {
        self.counts[quality as usize]
    }

    pub fn max_possible_score(&self) -> u32 {
        self.max_possible_score
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.multiplier = 1.0;
        self.counts = [0; 4];
        self.total_notes = 0;
        self.max_possible_score = 0;
    }
}

/// Thresholds passed when moving from `old` to `new`.
fn crossed(thresholds: &[u32], old: u32, new: u32) -> impl Iterator<Item = u32> + '_ {
    thresholds.iter().copied().filter(move |t| old < *t && new >= *t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_tiers() {
        let config = ScoreConfig::standard();
        assert_eq!(config.multiplier(1), 1.0);
        assert_eq!(config.multiplier(5), 1.2);
        assert_eq!(config.multiplier(19), 1.5);
        assert_eq!(config.multiplier(20), 2.0);
        assert_eq!(config.multiplier(99), 3.0);
        assert_eq!(config.multiplier(250), 4.0);
    }

    #[test]
    fn combo_bonus_lookup() {
        let config = ScoreConfig::standard();
        let bonuses: Vec<u32> = [1, 5, 10, 20, 49, 50, 100, 150, 200]
            .iter()
            .map(|c| config.combo_bonus(*c))
            .collect();
        assert_eq!(bonuses, vec![0, 10, 25, 50, 0, 100, 200, 100, 100]);
    }

    #[test]
    fn crossing_detection() {
        let hits: Vec<u32> = crossed(&SCORE_MILESTONES, 900, 5200).collect();
        assert_eq!(hits, vec![1000, 5000]);
        assert_eq!(crossed(&SCORE_MILESTONES, 1000, 1200).count(), 0);
    }

    #[test]
    fn rejects_descending_star_thresholds() {
        let mut ledger = ScoreLedger::default();
        let bad = ScoreConfig {
            star_thresholds: [0.9, 0.5, 0.7],
            ..ScoreConfig::standard()
        };
        assert!(ledger.set_config(bad).is_err());
        assert_eq!(ledger.config(), &ScoreConfig::for_kids());
    }

    #[test]
    fn multiplied_points_truncate() {
        let config = ScoreConfig::for_kids();
        // 75 * 1.5 = 112.5
        assert_eq!(config.points_for(Quality::Good, 11), 112);
        // combo 10 adds its bonus on top: 112 + 25
        assert_eq!(config.points_for(Quality::Good, 10), 137);
        assert_eq!(config.points_for(Quality::Ok, 12), 90);
    }

    #[test]
    fn low_max_multiplier_caps_every_tier() {
        let config = ScoreConfig {
            max_multiplier: 1.5,
            ..ScoreConfig::standard()
        };
        let tiers: Vec<f64> = [1, 5, 10, 20, 50, 100].iter().map(|c| config.multiplier(*c)).collect();
        assert_eq!(tiers, vec![1.0, 1.2, 1.5, 1.5, 1.5, 1.5]);
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn huge_point_values_saturate() {
        let config = ScoreConfig {
            perfect_points: u32::MAX,
            ..ScoreConfig::standard()
        };
        assert_eq!(config.points_for(Quality::Perfect, 5), u32::MAX);
        assert_eq!(config.max_possible_score(3), u32::MAX);

        let mut ledger = ScoreLedger::new(config);
        ledger.initialize(3);
        ledger.on_hit(Quality::Perfect);
        ledger.on_hit(Quality::Perfect);
        assert_eq!(ledger.score(), u32::MAX);
        assert_eq!(ledger.stars(), 3);
    }
}
