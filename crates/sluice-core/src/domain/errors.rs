//! Errors - パイプラインのエラー分類
//!
//! | error | retry? | commit? |
//! |---|---|---|
//! | `DecodeError` | no | yes (poison) |
//! | `TaskError` | up to the retry budget | yes, after the last attempt |
//! | `QueueError::Fetch` | forever, with capped backoff | - |
//! | `QueueError::Commit` | no | logged only |

use std::time::Duration;

use thiserror::Error;

/// A payload that can never become a `Task`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed task payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("task payload has an empty ticker")]
    MissingTicker,
}

/// Failure of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

/// Errors surfaced by a queue client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("failed to fetch message: {0}")]
    Fetch(String),

    #[error("failed to commit message: {0}")]
    Commit(String),

    #[error("queue client is closed")]
    Closed,
}
