use std::fmt;
use std::sync::Arc;

use lesson_schema::{Lesson, NoteEvent, NoteKind};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Judgment quality, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Perfect,
    Good,
    Ok,
    Miss,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Perfect, Quality::Good, Quality::Ok, Quality::Miss];

    /// Weight used by the rolling accuracy metric.
    pub fn accuracy(self) -> f64 {
        match self {
            Quality::Perfect => 1.0,
            Quality::Good => 0.75,
            Quality::Ok => 0.5,
            Quality::Miss => 0.0,
        }
    }

    pub fn is_hit(self) -> bool {
        self != Quality::Miss
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Perfect => "PERFECT!",
            Quality::Good => "GOOD!",
            Quality::Ok => "OK",
            Quality::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Pending,
    Hit,
    Missed,
}

/// A note that has entered the look-ahead window and can be judged.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedNote {
    pub id: NoteId,
    pub event: Arc<NoteEvent>,
    pub spawn_time_ms: f64,
    state: NoteState,
}

impl SpawnedNote {
    pub fn new(id: NoteId, event: Arc<NoteEvent>, spawn_time_ms: f64) -> Self {
        Self {
            id,
            event,
            spawn_time_ms,
            state: NoteState::Pending,
        }
    }

    pub fn lane(&self) -> u8 {
        self.event.lane
    }

    pub fn target_time_ms(&self) -> f64 {
        self.event.time_ms
    }

    pub fn kind(&self) -> NoteKind {
        self.event.kind
    }

    pub fn word(&self) -> Option<&str> {
        self.event.word.as_deref()
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == NoteState::Pending
    }

    pub(crate) fn mark_hit(&mut self) {
        self.state = NoteState::Hit;
    }

    pub(crate) fn mark_missed(&mut self) {
        self.state = NoteState::Missed;
    }

    /// Signed offset of `time_ms` from the target: negative is early.
    pub fn timing_offset(&self, time_ms: f64) -> f64 {
        time_ms - self.event.time_ms
    }

    /// Travel progress from spawn (0) to the hit line (1).
    pub fn progress(&self, now_ms: f64, travel_time_ms: f64) -> f64 {
        if travel_time_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.spawn_time_ms) / travel_time_ms).min(1.0)
    }
}

/// A validated lesson ready for play: notes sorted by target time.
#[derive(Debug, Clone)]
pub struct Chart {
    pub lesson_id: String,
    pub world_id: Option<String>,
    pub bpm: f64,
    pub notes: Vec<Arc<NoteEvent>>,
}

impl Chart {
    pub fn from_lesson(lesson: &Lesson) -> Result<Self> {
        if !(lesson.bpm.is_finite() && lesson.bpm > 0.0) {
            return Err(EngineError::InvalidLesson(format!(
                "bpm must be a finite value > 0 (got {})",
                lesson.bpm
            )));
        }
        if lesson.notes.is_empty() {
            return Err(EngineError::InvalidLesson(format!(
                "lesson {} has no notes",
                lesson.meta.lesson_id
            )));
        }
        if let Some((index, note)) = lesson
            .notes
            .iter()
            .enumerate()
            .find(|(_, n)| !(n.time_ms.is_finite() && n.time_ms >= 0.0))
        {
            return Err(EngineError::InvalidLesson(format!(
                "note {index} has invalid time_ms {}",
                note.time_ms
            )));
        }

        let mut notes: Vec<Arc<NoteEvent>> = lesson.notes.iter().cloned().map(Arc::new).collect();
        notes.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

        Ok(Chart {
            lesson_id: lesson.meta.lesson_id.clone(),
            world_id: lesson.meta.world_id.clone(),
            bpm: lesson.bpm,
            notes,
        })
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}
