pub mod clock;
pub mod conductor;

pub use clock::{BeatClock, BeatEdge, ClockState};
pub use conductor::{AudioPosition, Conductor};

pub const DEFAULT_MAX_FRAME_DELTA_MS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    pub delta_ms: f64,
    /// Wall-clock time beyond the clamp that the frame did not get.
    pub stalled_ms: f64,
}

/// Measures the delta between driver ticks, clamped so a stalled frame
/// does not turn into one huge step.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_ms: Option<f64>,
    max_delta_ms: f64,
}

impl FrameTimer {
    pub fn new(max_delta_ms: f64) -> Self {
        Self {
            last_ms: None,
            max_delta_ms,
        }
    }

    pub fn advance(&mut self, now_ms: f64) -> FrameStep {
        let raw = self.last_ms.map_or(0.0, |last| (now_ms - last).max(0.0));
        self.last_ms = Some(now_ms);
        let delta_ms = raw.min(self.max_delta_ms);
        FrameStep {
            delta_ms,
            stalled_ms: raw - delta_ms,
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_DELTA_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_clamped_after_stall() {
        let mut timer = FrameTimer::new(50.0);
        assert_eq!(timer.advance(1000.0).delta_ms, 0.0);
        assert_eq!(timer.advance(1016.0).delta_ms, 16.0);
        assert_eq!(
            timer.advance(1500.0),
            FrameStep {
                delta_ms: 50.0,
                stalled_ms: 434.0
            }
        );
        assert_eq!(timer.advance(1490.0).delta_ms, 0.0);
    }
}
