pub mod events;

use self::events::TapEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Serializes taps from any number of input threads for the tick driver.
pub struct InputQueue {
    sender: Sender<TapEvent>,
    receiver: Receiver<TapEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, event: TapEvent) {
        let _ = self.sender.send(event);
    }

    /// Non-blocking. Returns None if the queue is empty.
    pub fn pop(&self) -> Option<TapEvent> {
        self.receiver.try_recv().ok()
    }

    /// Everything queued so far, in arrival order.
    pub fn drain(&self) -> impl Iterator<Item = TapEvent> + '_ {
        self.receiver.try_iter()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// A sender handle for an input thread.
    pub fn sender(&self) -> Sender<TapEvent> {
        self.sender.clone()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
