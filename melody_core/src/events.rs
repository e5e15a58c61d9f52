use crossbeam_channel::{unbounded, Receiver, Sender};
use lesson_schema::NoteKind;

use crate::chart::{NoteId, Quality};
use crate::gameplay::collect::CollectedWord;
use crate::gameplay::difficulty::{DifficultyChange, DifficultyConfig};
use crate::gameplay::score::ScoreEvent;
use crate::lifecycle::LifecycleEvent;
use crate::time::BeatEdge;

/// Everything a session reports to its renderer, audio and persistence
/// collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Lifecycle(LifecycleEvent),
    Beat(BeatEdge),
    NoteSpawned {
        id: NoteId,
        lane: u8,
        target_ms: f64,
        word: Option<String>,
        kind: NoteKind,
    },
    AllSpawned,
    Judged {
        id: NoteId,
        lane: u8,
        quality: Quality,
        offset_ms: f64,
    },
    Missed {
        id: NoteId,
        lane: u8,
    },
    EmptyTap {
        lane: u8,
        timestamp_ms: f64,
    },
    Score(ScoreEvent),
    /// Level moved; always followed by `DifficultyConfigUpdated`.
    DifficultyChanged(DifficultyChange),
    /// Spawner speed and judge windows were retuned to this config.
    DifficultyConfigUpdated(DifficultyConfig),
    WordCollected(CollectedWord),
}

/// Fan-out of session events to channel subscribers. Subscribers that
/// dropped their receiver are pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<GameEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<GameEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn publish(&mut self, event: GameEvent) {
        match self.subscribers.len() {
            0 => {}
            1 => {
                if self.subscribers[0].send(event).is_err() {
                    self.subscribers.clear();
                }
            }
            _ => self.subscribers.retain(|s| s.send(event.clone()).is_ok()),
        }
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
