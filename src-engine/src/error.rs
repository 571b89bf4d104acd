//! Error kinds surfaced to callers of the engine
//!
//! Backends report their own `RemoteError`; `MoodHistoryStore` converts those
//! into the kinds below so nothing backend-specific reaches presentation code.
//! The breathing timer has no error type because it does no I/O.

use thiserror::Error;

use crate::mood::MoodScore;

#[derive(Debug, Error)]
pub enum MindhubError {
    /// The persisted session id could not be read or written
    #[error("session storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A mood entry insert failed or timed out. The day is not checked in.
    #[error("could not save mood check-in: {0}")]
    RemoteWriteFailure(String),

    /// A history or feed fetch failed or timed out
    #[error("could not load {what}: {reason}")]
    RemoteReadFailure { what: &'static str, reason: String },

    /// A same-day entry already exists for this session
    #[error("already checked in today (score {existing_score})")]
    ThrottleRejected { existing_score: MoodScore },

    #[error("mood score must be between 1 and 5, got {0}")]
    InvalidScore(i64),
}

impl MindhubError {
    /// Whether retrying the same operation later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MindhubError::RemoteWriteFailure(_) | MindhubError::RemoteReadFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MindhubError>;
