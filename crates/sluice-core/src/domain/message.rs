//! QueueMessage - ブローカーから受け取った生メッセージ

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a message inside the broker; this is what a commit acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageOffset {
    pub partition: i32,
    pub offset: i64,
}

impl MessageOffset {
    pub fn new(partition: i32, offset: i64) -> Self {
        Self { partition, offset }
    }
}

impl fmt::Display for MessageOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}

/// Opaque envelope handed out by a queue client.
///
/// The pipeline never looks inside `payload` except through the codec,
/// and commits the message through its `offset`.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    offset: MessageOffset,
    payload: Vec<u8>,
    timestamp: DateTime<Utc>,
}

impl QueueMessage {
    pub fn new(offset: MessageOffset, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn offset(&self) -> MessageOffset {
        self.offset
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// When the broker accepted the message.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Time spent in the queue as of `now`. Clock skew never yields a negative age.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.timestamp).max(TimeDelta::zero())
    }
}
