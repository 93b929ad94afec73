use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoundError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unable to load world {path}: {reason}")]
    WorldLoad { path: String, reason: String },

    #[error("Invalid scenario: {reason}")]
    InvalidScenario { reason: String },

    #[error("Unknown difficulty '{value}' (expected easy, medium or hard)")]
    UnknownDifficulty { value: String },

    #[error("Round not initialized")]
    RoundNotInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RoundResult<T> = Result<T, RoundError>;

/// An error raised by the external controller during one tick.
///
/// Never escalated to a `RoundError`: the round loop logs it, discards the
/// tick's commands and keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("controller fault after {elapsed:?}: {message}")]
pub struct ControllerFault {
    pub message: String,
    pub elapsed: Duration,
}

impl ControllerFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), elapsed: Duration::ZERO }
    }
}
