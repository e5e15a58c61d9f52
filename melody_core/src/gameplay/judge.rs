use tracing::debug;

use crate::chart::{NoteId, Quality, SpawnedNote};
use crate::error::Result;
use crate::gameplay::windows::TimingWindows;

#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentResult {
    pub note: SpawnedNote,
    pub quality: Quality,
    /// Signed tap offset: negative is early, positive is late.
    pub offset_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissResult {
    pub note: SpawnedNote,
    pub late_by_ms: f64,
}

/// Owns the live (spawned, unresolved) notes and resolves them against
/// taps and the passage of time. A note leaves the live set the moment it
/// is resolved, so it can never be judged twice.
#[derive(Debug, Clone, Default)]
pub struct JudgeMachine {
    live: Vec<SpawnedNote>,
    windows: TimingWindows,
}

impl JudgeMachine {
    pub fn new(windows: TimingWindows) -> Result<Self> {
        windows.validate()?;
        Ok(Self {
            live: Vec::new(),
            windows,
        })
    }

    pub fn windows(&self) -> &TimingWindows {
        &self.windows
    }

    /// Swaps the tolerance bands. Rejected windows leave the current ones
    /// in place.
    pub fn set_windows(&mut self, windows: TimingWindows) -> Result<()> {
        windows.validate()?;
        self.windows = windows;
        Ok(())
    }

    pub fn register_spawn(&mut self, note: SpawnedNote) {
        self.live.push(note);
    }

    pub fn unregister(&mut self, id: NoteId) -> Option<SpawnedNote> {
        let index = self.live.iter().position(|n| n.id == id)?;
        Some(self.live.remove(index))
    }

    /// Resolves a tap on `lane` at song time `timestamp_ms` against the
    /// nearest live note in that lane. Returns `None` for an empty tap.
    pub fn judge(&mut self, lane: u8, timestamp_ms: f64) -> Option<JudgmentResult> {
        let mut best: Option<(usize, f64)> = None;
        for (index, note) in self.live.iter().enumerate() {
            if note.lane() != lane || !note.is_pending() {
                continue;
            }
            let abs = note.timing_offset(timestamp_ms).abs();
            if !self.windows.contains(abs) {
                continue;
            }
            if best.map_or(true, |(_, best_abs)| abs < best_abs) {
                best = Some((index, abs));
            }
        }

        let Some((index, _)) = best else {
            debug!(lane, timestamp_ms, "empty tap");
            return None;
        };

        let mut note = self.live.remove(index);
        let offset_ms = note.timing_offset(timestamp_ms);
        let quality = self.windows.grade(offset_ms);
        note.mark_hit();
        debug!(id = %note.id, lane, offset_ms, ?quality, "judged");

        Some(JudgmentResult {
            note,
            quality,
            offset_ms,
        })
    }

    /// Resolves every live note whose miss window has fully elapsed.
    pub fn sweep_misses(&mut self, now_ms: f64) -> Vec<MissResult> {
        let miss_ms = self.windows.miss_ms;
        let mut misses = Vec::new();

        self.live.retain_mut(|note| {
            let late_by_ms = note.timing_offset(now_ms);
            if late_by_ms > miss_ms {
                note.mark_missed();
                misses.push(MissResult {
                    note: note.clone(),
                    late_by_ms,
                });
                false
            } else {
                true
            }
        });

        for miss in &misses {
            debug!(id = %miss.note.id, late_by_ms = miss.late_by_ms, "missed");
        }
        misses
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_notes(&self) -> &[SpawnedNote] {
        &self.live
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}
