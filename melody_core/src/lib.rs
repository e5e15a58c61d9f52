//! Rhythm gameplay engine: song clock, note spawning, hit judgment, scoring,
//! adaptive difficulty and the session lifecycle that sequences them.

pub mod chart;
pub mod config;
pub mod error;
pub mod events;
pub mod gameplay;
pub mod input;
pub mod lifecycle;
pub mod session;
pub mod time;

pub use chart::{Chart, NoteId, Quality, SpawnedNote};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use events::GameEvent;
pub use input::{events::TapEvent, InputQueue};
pub use lifecycle::{GameLifecycle, LifecycleEvent, LifecycleState};
pub use session::{GameSession, SessionHandle};
