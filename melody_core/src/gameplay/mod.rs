pub mod collect;
pub mod difficulty;
pub mod judge;
pub mod score;
pub mod spawner;
pub mod windows;

pub use collect::{CollectedWord, CollectionSummary, Rarity, WordCollector};
pub use difficulty::{
    AdaptiveConfig, Adjustment, DifficultyChange, DifficultyConfig, DifficultyLevel, DifficultyManager,
};
pub use judge::{JudgeMachine, JudgmentResult, MissResult};
pub use score::{Milestone, ScoreConfig, ScoreEvent, ScoreLedger, ScoreUpdate, Summary};
pub use spawner::{NoteSpawner, SpawnBatch};
pub use windows::TimingWindows;
