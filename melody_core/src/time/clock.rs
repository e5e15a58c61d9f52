use tracing::debug;

use crate::error::{EngineError, Result};

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_DRIFT_THRESHOLD_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Ready,
    Running,
    Paused,
    Stopped,
}

/// Beat-grid crossings reported by [`BeatClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatEdge {
    Beat(i64),
    /// The off-beat halfway through `beat`.
    HalfBeat(i64),
    QuarterBeat { beat: i64, quarter: u8 },
}

/// Song-time clock driven by an external frame source.
///
/// All wall-clock instants are passed in by the caller (milliseconds on any
/// monotonic timeline). Song time is `now - origin - accumulated_pause`.
#[derive(Debug, Clone)]
pub struct BeatClock {
    state: ClockState,
    bpm: f64,
    beat_duration_ms: f64,
    drift_threshold_ms: f64,

    origin_ms: f64,
    pause_started_ms: f64,
    accumulated_pause_ms: f64,

    song_time_ms: f64,
    beat: f64,
    beat_number: i64,
    beat_progress: f64,

    last_beat: i64,
    last_half_beat: i64,
    last_quarter: i64,
}

impl Default for BeatClock {
    fn default() -> Self {
        Self {
            state: ClockState::Idle,
            bpm: DEFAULT_BPM,
            beat_duration_ms: 60_000.0 / DEFAULT_BPM,
            drift_threshold_ms: DEFAULT_DRIFT_THRESHOLD_MS,
            origin_ms: 0.0,
            pause_started_ms: 0.0,
            accumulated_pause_ms: 0.0,
            song_time_ms: 0.0,
            beat: 0.0,
            beat_number: 0,
            beat_progress: 0.0,
            last_beat: -1,
            last_half_beat: -1,
            last_quarter: -1,
        }
    }
}

impl BeatClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drift_threshold(mut self, threshold_ms: f64) -> Self {
        self.drift_threshold_ms = threshold_ms;
        self
    }

    /// Sets the tempo and resets all derived counters. A rejected bpm keeps
    /// the previous tempo and state.
    pub fn prepare(&mut self, bpm: f64) -> Result<()> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(EngineError::InvalidBpm(bpm));
        }
        self.bpm = bpm;
        self.beat_duration_ms = 60_000.0 / bpm;
        self.state = ClockState::Ready;
        self.reset_derived();
        Ok(())
    }

    /// Begins timing, or resumes it when paused. Without a prior `prepare`
    /// the last known bpm is used. Starting a running clock does nothing.
    pub fn start(&mut self, now_ms: f64) {
        match self.state {
            ClockState::Running => return,
            ClockState::Paused => {
                self.accumulated_pause_ms += now_ms - self.pause_started_ms;
            }
            ClockState::Ready => self.fresh_start(now_ms),
            ClockState::Idle | ClockState::Stopped => {
                self.state = ClockState::Ready;
                self.reset_derived();
                self.fresh_start(now_ms);
            }
        }
        self.state = ClockState::Running;
        debug!(bpm = self.bpm, song_time_ms = self.song_time_ms, "clock running");
    }

    fn fresh_start(&mut self, now_ms: f64) {
        self.origin_ms = now_ms;
        self.accumulated_pause_ms = 0.0;
        self.reset_derived();
    }

    pub fn pause(&mut self, now_ms: f64) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.pause_started_ms = now_ms;
        self.state = ClockState::Paused;
        true
    }

    pub fn resume(&mut self, now_ms: f64) -> bool {
        if self.state != ClockState::Paused {
            return false;
        }
        self.start(now_ms);
        true
    }

    /// Holds song time back by `ms` of wall-clock time, used to swallow
    /// the unclamped part of a stalled frame.
    pub fn absorb_stall(&mut self, ms: f64) {
        if self.state == ClockState::Running && ms > 0.0 {
            self.accumulated_pause_ms += ms;
        }
    }

    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
    }

    pub fn reset(&mut self) {
        self.state = ClockState::Idle;
        self.origin_ms = 0.0;
        self.pause_started_ms = 0.0;
        self.accumulated_pause_ms = 0.0;
        self.reset_derived();
    }

    fn reset_derived(&mut self) {
        self.song_time_ms = 0.0;
        self.beat = 0.0;
        self.beat_number = 0;
        self.beat_progress = 0.0;
        self.last_beat = -1;
        self.last_half_beat = -1;
        self.last_quarter = -1;
    }

    /// Recomputes song time and beat position. Returns the beat-grid edges
    /// crossed for the first time since the previous tick. No-op unless running.
    pub fn tick(&mut self, now_ms: f64) -> Vec<BeatEdge> {
        if self.state != ClockState::Running {
            return Vec::new();
        }
        self.song_time_ms = now_ms - self.origin_ms - self.accumulated_pause_ms;
        self.update_derived();
        self.collect_edges()
    }

    fn update_derived(&mut self) {
        self.beat = self.song_time_ms / self.beat_duration_ms;
        let floor = self.beat.floor();
        self.beat_number = floor as i64;
        self.beat_progress = self.beat - floor;
    }

    fn collect_edges(&mut self) -> Vec<BeatEdge> {
        let mut edges = Vec::new();

        if self.beat_number > self.last_beat {
            self.last_beat = self.beat_number;
            edges.push(BeatEdge::Beat(self.beat_number));
        }

        let half = (self.beat * 2.0).floor() as i64;
        if half > self.last_half_beat {
            self.last_half_beat = half;
            if half.rem_euclid(2) == 1 {
                edges.push(BeatEdge::HalfBeat(self.beat_number));
            }
        }

        let quarter = (self.beat * 4.0).floor() as i64;
        if quarter > self.last_quarter {
            self.last_quarter = quarter;
            edges.push(BeatEdge::QuarterBeat {
                beat: self.beat_number,
                quarter: quarter.rem_euclid(4) as u8,
            });
        }

        edges
    }

    /// Pulls song time toward an external reference (usually the audio
    /// position). Drift within the threshold is ignored; beyond it the whole
    /// drift is absorbed into the accumulated pause time. Returns the applied
    /// correction.
    pub fn sync_to_external_time(&mut self, external_ms: f64) -> Option<f64> {
        if self.state != ClockState::Running {
            return None;
        }
        let drift = self.song_time_ms - external_ms;
        if drift.abs() <= self.drift_threshold_ms {
            return None;
        }
        self.accumulated_pause_ms += drift;
        self.song_time_ms = external_ms;
        self.update_derived();
        debug!(drift_ms = drift, "clock resynced to reference");
        Some(drift)
    }

    /// Song time the clock would report at `now_ms`, without ticking.
    pub fn song_time_at(&self, now_ms: f64) -> f64 {
        match self.state {
            ClockState::Running => now_ms - self.origin_ms - self.accumulated_pause_ms,
            ClockState::Paused => self.pause_started_ms - self.origin_ms - self.accumulated_pause_ms,
            _ => self.song_time_ms,
        }
    }

    pub fn beat_to_ms(&self, beat: f64) -> f64 {
        beat * self.beat_duration_ms
    }

    pub fn ms_to_beat(&self, ms: f64) -> f64 {
        ms / self.beat_duration_ms
    }

    pub fn time_until_next_beat(&self) -> f64 {
        (1.0 - self.beat_progress) * self.beat_duration_ms
    }

    pub fn time_since_last_beat(&self) -> f64 {
        self.beat_progress * self.beat_duration_ms
    }

    pub fn is_on_beat(&self, tolerance_ms: f64) -> bool {
        self.time_since_last_beat() < tolerance_ms || self.time_until_next_beat() < tolerance_ms
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beat_duration_ms(&self) -> f64 {
        self.beat_duration_ms
    }

    pub fn song_time_ms(&self) -> f64 {
        self.song_time_ms
    }

    pub fn beat(&self) -> f64 {
        self.beat
    }

    pub fn beat_number(&self) -> i64 {
        self.beat_number
    }

    pub fn beat_progress(&self) -> f64 {
        self.beat_progress
    }

    pub fn accumulated_pause_ms(&self) -> f64 {
        self.accumulated_pause_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_bpm_keeps_previous_tempo() {
        let mut clock = BeatClock::new();
        clock.prepare(90.0).unwrap();
        assert!(clock.prepare(0.0).is_err());
        assert!(clock.prepare(f64::NAN).is_err());
        assert_eq!(clock.bpm(), 90.0);
        assert_eq!(clock.state(), ClockState::Ready);
    }

    #[test]
    fn quarter_edges_cycle_within_beat() {
        let mut clock = BeatClock::new();
        clock.prepare(60.0).unwrap();
        clock.start(0.0);

        assert_eq!(
            clock.tick(0.0),
            vec![BeatEdge::Beat(0), BeatEdge::QuarterBeat { beat: 0, quarter: 0 }]
        );
        assert_eq!(clock.tick(260.0), vec![BeatEdge::QuarterBeat { beat: 0, quarter: 1 }]);
        assert_eq!(
            clock.tick(510.0),
            vec![BeatEdge::HalfBeat(0), BeatEdge::QuarterBeat { beat: 0, quarter: 2 }]
        );
        assert!(clock.tick(520.0).is_empty());
    }

    #[test]
    fn on_beat_tolerance() {
        let mut clock = BeatClock::new();
        clock.prepare(120.0).unwrap();
        clock.start(0.0);
        clock.tick(1010.0);
        assert!(clock.is_on_beat(20.0));
        clock.tick(1250.0);
        assert!(!clock.is_on_beat(20.0));
        assert_eq!(clock.time_until_next_beat(), 250.0);
    }
}
