//! QueueClient port - 永続キュー（Kafka など）への入口
//!
//! The broker itself (replication, partitioning, storage) is out of scope;
//! the pipeline only needs blocking fetch and explicit commit.

use async_trait::async_trait;

use crate::domain::{QueueError, QueueMessage};

/// Durable, consumer-group message source.
///
/// # 設計原則
/// - `fetch` blocks until a message is available. Callers race it against
///   their own cancellation, so implementations need not watch for shutdown.
/// - `commit` is called concurrently from every worker and must be safe to do so.
/// - A message is committed at most once per terminal processing outcome.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn fetch(&self) -> Result<QueueMessage, QueueError>;

    async fn commit(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// After `close`, pending and future fetches fail with `QueueError::Closed`.
    async fn close(&self) -> Result<(), QueueError>;
}
