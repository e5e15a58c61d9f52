use std::collections::{HashMap, HashSet};

use lesson_schema::NoteKind;
use serde::{Deserialize, Serialize};

use crate::chart::{Quality, SpawnedNote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Basic,
    Special,
    Legendary,
}

impl Rarity {
    pub fn bonus(self) -> u32 {
        match self {
            Rarity::Basic => 25,
            Rarity::Special => 100,
            Rarity::Legendary => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedWord {
    pub word: String,
    pub pitch: Option<String>,
    pub rarity: Rarity,
    pub lesson_id: String,
    pub world_id: Option<String>,
    pub quality: Quality,
}

impl CollectedWord {
    pub fn is_perfect(&self) -> bool {
        self.quality == Quality::Perfect
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordStats {
    pub perfect: u32,
    pub good: u32,
    pub ok: u32,
    pub miss: u32,
}

impl WordStats {
    fn record(&mut self, quality: Quality) {
        match quality {
            Quality::Perfect => self.perfect += 1,
            Quality::Good => self.good += 1,
            Quality::Ok => self.ok += 1,
            Quality::Miss => self.miss += 1,
        }
    }

    /// 0..=1, weighting perfect 3, good 2, ok 1, miss 0.
    pub fn average_quality(&self) -> f64 {
        let total = self.perfect + self.good + self.ok + self.miss;
        if total == 0 {
            return 0.0;
        }
        let weighted = self.perfect * 3 + self.good * 2 + self.ok;
        weighted as f64 / (total * 3) as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total: usize,
    pub basic: usize,
    pub special: usize,
    pub legendary: usize,
    pub perfect: usize,
    pub bonus: u32,
}

/// Collects the vocabulary words carried by hit notes, once per word per
/// session (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct WordCollector {
    lesson_id: String,
    world_id: Option<String>,
    collected: Vec<CollectedWord>,
    keys: HashSet<String>,
    stats: HashMap<String, WordStats>,
}

impl WordCollector {
    pub fn initialize(&mut self, lesson_id: impl Into<String>, world_id: Option<String>) {
        self.lesson_id = lesson_id.into();
        self.world_id = world_id;
        self.collected.clear();
        self.keys.clear();
        self.stats.clear();
    }

    /// Records the judgment and returns the word if this hit collected it.
    pub fn process_hit(&mut self, note: &SpawnedNote, quality: Quality) -> Option<CollectedWord> {
        let word = note.word().filter(|w| !w.is_empty())?;
        let key = word.to_lowercase();
        let stats = self.stats.entry(key.clone()).or_default();
        stats.record(quality);
        let perfect_hits = stats.perfect;

        if !quality.is_hit() || self.keys.contains(&key) {
            return None;
        }

        let rarity = match note.kind() {
            NoteKind::Golden => Rarity::Legendary,
            NoteKind::Special => Rarity::Special,
            NoteKind::Basic if perfect_hits >= 3 => Rarity::Special,
            NoteKind::Basic => Rarity::Basic,
        };
        let collected = CollectedWord {
            word: word.to_string(),
            pitch: note.event.pitch.clone(),
            rarity,
            lesson_id: self.lesson_id.clone(),
            world_id: self.world_id.clone(),
            quality,
        };
        self.keys.insert(key);
        self.collected.push(collected.clone());
        Some(collected)
    }

    pub fn record_miss(&mut self, note: &SpawnedNote) {
        if let Some(word) = note.word().filter(|w| !w.is_empty()) {
            self.stats.entry(word.to_lowercase()).or_default().record(Quality::Miss);
        }
    }

    pub fn collected(&self) -> &[CollectedWord] {
        &self.collected
    }

    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }

    pub fn count_by_rarity(&self, rarity: Rarity) -> usize {
        self.collected.iter().filter(|w| w.rarity == rarity).count()
    }

    pub fn stats(&self, word: &str) -> Option<WordStats> {
        self.stats.get(&word.to_lowercase()).copied()
    }

    pub fn is_collected(&self, word: &str) -> bool {
        self.keys.contains(&word.to_lowercase())
    }

    /// Rarity bonus per word plus 25 for each word collected on a perfect.
    pub fn collection_bonus(&self) -> u32 {
        self.collected
            .iter()
            .map(|w| w.rarity.bonus() + if w.is_perfect() { 25 } else { 0 })
            .sum()
    }

    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            total: self.collected.len(),
            basic: self.count_by_rarity(Rarity::Basic),
            special: self.count_by_rarity(Rarity::Special),
            legendary: self.count_by_rarity(Rarity::Legendary),
            perfect: self.collected.iter().filter(|w| w.is_perfect()).count(),
            bonus: self.collection_bonus(),
        }
    }
}
