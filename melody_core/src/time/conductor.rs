use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF64;

/// Write side of the shared audio position, owned by the audio thread.
#[derive(Debug, Clone, Default)]
pub struct AudioPosition(Arc<AtomicF64>);

impl AudioPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, position_ms: f64) {
        self.0.store(position_ms, Ordering::Release);
    }

    pub fn load(&self) -> f64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn conductor(&self) -> Conductor {
        Conductor::new(Arc::clone(&self.0))
    }
}

/// Reference clock that follows the audio playback position.
///
/// The audio thread publishes coarse positions; between publications the
/// conductor extrapolates with the frame clock so the reference stays smooth.
#[derive(Debug)]
pub struct Conductor {
    audio_time_source: Arc<AtomicF64>,
    output_latency_ms: f64,
    last_audio_time_ms: f64,
    last_update_ms: f64,
    anchored: bool,
}

impl Conductor {
    pub fn new(audio_time_source: Arc<AtomicF64>) -> Self {
        Self {
            audio_time_source,
            output_latency_ms: 0.0,
            last_audio_time_ms: 0.0,
            last_update_ms: 0.0,
            anchored: false,
        }
    }

    /// Audio reaches the speaker this much later than it is mixed.
    pub fn with_output_latency(mut self, latency_ms: f64) -> Self {
        self.output_latency_ms = latency_ms;
        self
    }

    /// Anchors the reference to the published position at `now_ms`.
    pub fn update(&mut self, now_ms: f64) {
        self.last_audio_time_ms = self.audio_time_source.load(Ordering::Acquire);
        self.last_update_ms = now_ms;
        self.anchored = true;
    }

    /// Re-anchors only when the audio thread has published a new position,
    /// so the reference keeps extrapolating between publications.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        let published = self.audio_time_source.load(Ordering::Acquire);
        if self.anchored && published == self.last_audio_time_ms {
            return false;
        }
        self.last_audio_time_ms = published;
        self.last_update_ms = now_ms;
        self.anchored = true;
        true
    }

    pub fn get_time(&self, now_ms: f64) -> f64 {
        let elapsed = now_ms - self.last_update_ms;
        self.last_audio_time_ms + elapsed - self.output_latency_ms
    }
}
