//! InMemoryQueueClient - 開発・テスト用のキュークライアント
//!
//! Behaves like a single-partition consumer group member: `fetch` hands out
//! messages in publish order, `commit` acknowledges them one by one, and
//! `rewind` re-queues everything fetched but not committed, which is what a
//! broker does for the next consumer after a crash.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use crate::domain::{MessageOffset, QueueError, QueueMessage};
use crate::ports::QueueClient;

const PARTITION: i32 = 0;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueMessage>,
    /// Fetched and not yet committed.
    inflight: BTreeMap<MessageOffset, QueueMessage>,
    commits: HashMap<MessageOffset, u32>,
    next_offset: i64,
    /// Fetches that will fail before the queue delivers again.
    failing_fetches: u32,
    closed: bool,
}

#[derive(Default)]
pub struct InMemoryQueueClient {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InMemoryQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current time and wake a waiting fetch.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> MessageOffset {
        let offset = {
            let mut state = self.state.lock().await;
            let offset = MessageOffset::new(PARTITION, state.next_offset);
            state.next_offset += 1;
            let message = QueueMessage::new(offset, payload).with_timestamp(Utc::now());
            state.pending.push_back(message);
            offset
        };
        self.notify.notify_one();
        offset
    }

    /// Make the next `count` fetches fail with `QueueError::Fetch`,
    /// as a broker outage would.
    pub async fn inject_fetch_failures(&self, count: u32) {
        self.state.lock().await.failing_fetches += count;
        self.notify.notify_one();
    }

    /// Put every fetched-but-uncommitted message back at the head of the queue.
    /// Returns how many were re-queued.
    pub async fn rewind(&self) -> usize {
        let count = {
            let mut state = self.state.lock().await;
            let inflight = std::mem::take(&mut state.inflight);
            let count = inflight.len();
            for (_, message) in inflight.into_iter().rev() {
                state.pending.push_front(message);
            }
            count
        };
        if count > 0 {
            self.notify.notify_one();
        }
        count
    }

    pub async fn commit_count(&self, offset: MessageOffset) -> u32 {
        self.state
            .lock()
            .await
            .commits
            .get(&offset)
            .copied()
            .unwrap_or(0)
    }

    pub async fn committed_offsets(&self) -> Vec<MessageOffset> {
        let state = self.state.lock().await;
        let mut offsets: Vec<_> = state.commits.keys().copied().collect();
        offsets.sort();
        offsets
    }

    pub async fn pending(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn inflight(&self) -> usize {
        self.state.lock().await.inflight.len()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn fetch(&self) -> Result<QueueMessage, QueueError> {
        loop {
            // 状態を見る前に登録しておかないと close/publish の通知を取りこぼす
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return Err(QueueError::Closed);
                }
                if state.failing_fetches > 0 {
                    state.failing_fetches -= 1;
                    return Err(QueueError::Fetch("broker unavailable".to_string()));
                }
                if let Some(message) = state.pending.pop_front() {
                    state.inflight.insert(message.offset(), message.clone());
                    return Ok(message);
                }
            }

            notified.await;
        }
    }

    async fn commit(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }
        let offset = message.offset();
        state.inflight.remove(&offset);
        *state.commits.entry(offset).or_default() += 1;
        Ok(())
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
        Ok(())
    }
}
