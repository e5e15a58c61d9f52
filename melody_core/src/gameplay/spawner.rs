use std::sync::Arc;

use lesson_schema::NoteEvent;
use tracing::debug;

use crate::chart::{NoteId, SpawnedNote};
use crate::error::{EngineError, Result};

pub const DEFAULT_LOOK_AHEAD_MS: f64 = 2000.0;

/// Notes that entered the look-ahead window during one update.
#[derive(Debug, Default)]
pub struct SpawnBatch {
    pub notes: Vec<SpawnedNote>,
    /// Set exactly once, on the update that spawns the last note.
    pub all_spawned: bool,
}

/// Walks the note sequence in target-time order and spawns each note
/// `look_ahead_ms` before it is due.
#[derive(Debug, Clone)]
pub struct NoteSpawner {
    sequence: Vec<Arc<NoteEvent>>,
    cursor: usize,
    next_id: u64,
    base_look_ahead_ms: f64,
    look_ahead_ms: f64,
    speed: f64,
    active: bool,
}

impl Default for NoteSpawner {
    fn default() -> Self {
        Self::new(DEFAULT_LOOK_AHEAD_MS)
    }
}

impl NoteSpawner {
    pub fn new(base_look_ahead_ms: f64) -> Self {
        Self {
            sequence: Vec::new(),
            cursor: 0,
            next_id: 0,
            base_look_ahead_ms,
            look_ahead_ms: base_look_ahead_ms,
            speed: 1.0,
            active: false,
        }
    }

    pub fn load(&mut self, notes: impl IntoIterator<Item = Arc<NoteEvent>>) {
        self.sequence = notes.into_iter().collect();
        self.sequence.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        self.cursor = 0;
        self.next_id = 0;
        self.active = !self.sequence.is_empty();
    }

    /// Look-ahead shrinks as speed grows: `base / speed`.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(EngineError::InvalidConfig(format!("note speed must be > 0 (got {speed})")));
        }
        self.speed = speed;
        self.look_ahead_ms = self.base_look_ahead_ms / speed;
        Ok(())
    }

    pub fn update(&mut self, song_time_ms: f64) -> SpawnBatch {
        let mut batch = SpawnBatch::default();
        if !self.active {
            return batch;
        }

        let horizon = song_time_ms + self.look_ahead_ms;
        while let Some(event) = self.sequence.get(self.cursor) {
            if event.time_ms > horizon {
                break;
            }
            let note = SpawnedNote::new(NoteId(self.next_id), Arc::clone(event), song_time_ms);
            debug!(id = %note.id, lane = note.lane(), target_ms = note.target_time_ms(), "spawn");
            batch.notes.push(note);
            self.next_id += 1;
            self.cursor += 1;
        }

        if self.cursor >= self.sequence.len() {
            self.active = false;
            batch.all_spawned = true;
        }
        batch
    }

    pub fn total(&self) -> usize {
        self.sequence.len()
    }

    pub fn spawned_count(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.sequence.len() - self.cursor
    }

    pub fn has_more(&self) -> bool {
        self.cursor < self.sequence.len()
    }

    pub fn progress(&self) -> f64 {
        if self.sequence.is_empty() {
            return 1.0;
        }
        self.cursor as f64 / self.sequence.len() as f64
    }

    pub fn look_ahead_ms(&self) -> f64 {
        self.look_ahead_ms
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.next_id = 0;
        self.active = !self.sequence.is_empty();
    }

    pub fn clear(&mut self) {
        self.sequence.clear();
        self.cursor = 0;
        self.next_id = 0;
        self.active = false;
    }
}
