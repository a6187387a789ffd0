//! Stage errors and the tagged result every entry point returns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::InvalidEventId;

/// Failure category surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing credentials or parameters; not retried
    Configuration,

    /// The identifier has no artifact in the store
    NotFound,

    /// External API or network failure
    Transport,

    /// Persisted state could not be read back
    CorruptState,
}

/// Errors raised inside a stage, converted to [`StageOutcome`] at its boundary
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    CorruptState(String),
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::Configuration(_) => ErrorKind::Configuration,
            StageError::NotFound(_) => ErrorKind::NotFound,
            StageError::Transport(_) => ErrorKind::Transport,
            StageError::CorruptState(_) => ErrorKind::CorruptState,
        }
    }

    /// Wrap an `anyhow` error chain from an external call
    pub fn transport(err: anyhow::Error) -> Self {
        StageError::Transport(format!("{:#}", err))
    }
}

impl From<InvalidEventId> for StageError {
    fn from(err: InvalidEventId) -> Self {
        StageError::Configuration(err.to_string())
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// What a caller receives from any pipeline entry point.
///
/// Serializes as `{"status": "success", ...payload}` or
/// `{"status": "error", "kind": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    Success(T),
    Error { kind: ErrorKind, message: String },
}

impl<T> StageOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success(_))
    }

    /// The payload, if successful
    pub fn success(self) -> Option<T> {
        match self {
            StageOutcome::Success(value) => Some(value),
            StageOutcome::Error { .. } => None,
        }
    }

    /// The error kind, if failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            StageOutcome::Success(_) => None,
            StageOutcome::Error { kind, .. } => Some(*kind),
        }
    }

    pub fn into_result(self) -> StageResult<T> {
        match self {
            StageOutcome::Success(value) => Ok(value),
            StageOutcome::Error { kind, message } => Err(match kind {
                ErrorKind::Configuration => StageError::Configuration(message),
                ErrorKind::NotFound => StageError::NotFound(message),
                ErrorKind::Transport => StageError::Transport(message),
                ErrorKind::CorruptState => StageError::CorruptState(message),
            }),
        }
    }
}

impl<T> From<StageResult<T>> for StageOutcome<T> {
    fn from(result: StageResult<T>) -> Self {
        match result {
            Ok(value) => StageOutcome::Success(value),
            Err(err) => StageOutcome::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}
