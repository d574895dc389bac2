//! TaskCodec - payload bytes から Task への変換
//!
//! A decode failure is terminal: the caller commits the message and moves on
//! (poison-message policy). Parsing has no side effects.

use crate::domain::{DecodeError, Task};

pub fn decode(payload: &[u8]) -> Result<Task, DecodeError> {
    let task: Task = serde_json::from_slice(payload)?;
    if task.ticker.trim().is_empty() {
        return Err(DecodeError::MissingTicker);
    }
    Ok(task)
}
