/// A discrete lane tap, already resolved from raw pointer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapEvent {
    pub lane: u8,
    /// Song time of the tap in milliseconds
    pub timestamp_ms: f64,
}

impl TapEvent {
    pub fn new(lane: u8, timestamp_ms: f64) -> Self {
        Self { lane, timestamp_ms }
    }
}
