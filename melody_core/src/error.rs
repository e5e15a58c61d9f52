use thiserror::Error;

use crate::gameplay::difficulty::DifficultyLevel;
use crate::lifecycle::LifecycleState;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("bpm must be a finite value > 0 (got {0})")]
    InvalidBpm(f64),

    #[error("timing windows must be ascending (perfect={perfect}, good={good}, ok={ok}, miss={miss})")]
    WindowsNotAscending {
        perfect: f64,
        good: f64,
        ok: f64,
        miss: f64,
    },

    #[error("difficulty bounds inverted: min={min:?} > max={max:?}")]
    InvertedBounds {
        min: DifficultyLevel,
        max: DifficultyLevel,
    },

    #[error("invalid lesson: {0}")]
    InvalidLesson(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Rejections the caller can shrug off; the engine state is unchanged.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::InvalidLesson(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_message() {
        let err = EngineError::InvalidTransition {
            from: LifecycleState::Loading,
            to: LifecycleState::Playing,
        };
        assert_eq!(err.to_string(), "invalid transition: Loading -> Playing");
        assert!(err.is_recoverable());
    }

    #[test]
    fn lesson_error_is_not_recoverable() {
        let err = EngineError::InvalidLesson("no notes".to_string());
        assert_eq!(err.to_string(), "invalid lesson: no notes");
        assert!(!err.is_recoverable());
    }
}
