use serde::{Deserialize, Serialize};

use crate::chart::Quality;
use crate::error::{EngineError, Result};

/// Nested tolerance bands around a note's target time, in milliseconds
/// (half-width).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingWindows {
    pub perfect_ms: f64,
    pub good_ms: f64,
    pub ok_ms: f64,
    pub miss_ms: f64,
}

impl Default for TimingWindows {
    fn default() -> Self {
        Self::kids()
    }
}

impl TimingWindows {
    pub fn new(perfect_ms: f64, good_ms: f64, ok_ms: f64, miss_ms: f64) -> Result<Self> {
        let windows = Self {
            perfect_ms,
            good_ms,
            ok_ms,
            miss_ms,
        };
        windows.validate()?;
        Ok(windows)
    }

    pub fn kids() -> Self {
        Self {
            perfect_ms: 80.0,
            good_ms: 150.0,
            ok_ms: 220.0,
            miss_ms: 300.0,
        }
    }

    pub fn normal() -> Self {
        Self {
            perfect_ms: 50.0,
            good_ms: 100.0,
            ok_ms: 150.0,
            miss_ms: 200.0,
        }
    }

    pub fn hard() -> Self {
        Self {
            perfect_ms: 30.0,
            good_ms: 60.0,
            ok_ms: 100.0,
            miss_ms: 150.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.perfect_ms, self.good_ms, self.ok_ms, self.miss_ms];
        let ascending = all.windows(2).all(|w| w[0] <= w[1]);
        if !ascending || all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::WindowsNotAscending {
                perfect: self.perfect_ms,
                good: self.good_ms,
                ok: self.ok_ms,
                miss: self.miss_ms,
            });
        }
        Ok(())
    }

    /// Every band widened (multiplier > 1) or narrowed (< 1) uniformly.
    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            perfect_ms: self.perfect_ms * multiplier,
            good_ms: self.good_ms * multiplier,
            ok_ms: self.ok_ms * multiplier,
            miss_ms: self.miss_ms * multiplier,
        }
    }

    /// Grade for a signed offset. Anything past `ok_ms` but inside `miss_ms`
    /// still counts as `Ok`; only offsets beyond `miss_ms` are a `Miss`.
    pub fn grade(&self, offset_ms: f64) -> Quality {
        let abs = offset_ms.abs();
        if abs <= self.perfect_ms {
            Quality::Perfect
        } else if abs <= self.good_ms {
            Quality::Good
        } else if abs <= self.miss_ms {
            Quality::Ok
        } else {
            Quality::Miss
        }
    }

    pub fn contains(&self, offset_ms: f64) -> bool {
        offset_ms.abs() <= self.miss_ms
    }

    pub fn is_successful_hit(&self, offset_ms: f64) -> bool {
        offset_ms.abs() <= self.ok_ms
    }

    /// Continuous accuracy: 100 inside perfect, falling linearly to 75 at
    /// the good edge, 50 at the ok edge and 0 at the miss edge.
    pub fn accuracy_percent(&self, offset_ms: f64) -> f64 {
        let abs = offset_ms.abs();
        let lerp = |from: f64, to: f64, lo: f64, hi: f64| {
            if hi <= lo {
                to
            } else {
                from + (to - from) * ((abs - lo) / (hi - lo))
            }
        };

        if abs <= self.perfect_ms {
            100.0
        } else if abs <= self.good_ms {
            lerp(100.0, 75.0, self.perfect_ms, self.good_ms)
        } else if abs <= self.ok_ms {
            lerp(75.0, 50.0, self.good_ms, self.ok_ms)
        } else {
            lerp(50.0, 0.0, self.ok_ms, self.miss_ms).max(0.0)
        }
    }
}
