//! WorkerLoop - 共有チャネルからメッセージを取り出して処理する
//!
//! # フロー
//! 1. channel から 1 件受け取る（close + drain 済み、または shutdown なら終了）
//! 2. decode（失敗したら poison として即 commit）
//! 3. TaskExecutor で実行
//! 4. Cancelled 以外は commit

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::TaskExecutor;
use super::status::ProcessorStats;
use crate::codec;
use crate::domain::QueueMessage;
use crate::ports::QueueClient;

/// Everything a worker needs; shared read-only by all workers of one processor.
pub(crate) struct WorkerContext {
    pub queue: Arc<dyn QueueClient>,
    pub executor: Arc<TaskExecutor>,
    pub stats: Arc<ProcessorStats>,
    pub commit_timeout: Duration,
}

pub(crate) async fn worker_loop(
    worker_id: usize,
    messages: async_channel::Receiver<QueueMessage>,
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
) {
    debug!(worker = worker_id, "worker started");
    loop {
        // recv は待つ可能性があるので shutdown と競合させる
        let message = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = messages.recv() => match received {
                Ok(message) => message,
                // channel closed and drained
                Err(_) => break,
            },
        };

        process_message(worker_id, message, &ctx, &cancel).await;
    }
    debug!(worker = worker_id, "worker stopped");
}

async fn process_message(
    worker_id: usize,
    message: QueueMessage,
    ctx: &WorkerContext,
    cancel: &CancellationToken,
) {
    let offset = message.offset();
    ctx.stats.record_received();
    let age_ms = message.age(Utc::now()).num_milliseconds();
    debug!(worker = worker_id, %offset, age_ms, "message received");

    let task = match codec::decode(message.payload()) {
        Ok(task) => task,
        Err(err) => {
            warn!(worker = worker_id, %offset, error = %err, "poison message, committing without processing");
            ctx.stats.record_poison();
            commit(worker_id, &message, ctx).await;
            return;
        }
    };

    let outcome = ctx.executor.execute(&task, cancel).await;
    ctx.stats.record_outcome(&outcome);

    if outcome.should_commit() {
        commit(worker_id, &message, ctx).await;
    } else {
        info!(
            worker = worker_id,
            %offset,
            ticker = %task.ticker,
            "task interrupted by shutdown, leaving message uncommitted for redelivery"
        );
    }
}

async fn commit(worker_id: usize, message: &QueueMessage, ctx: &WorkerContext) {
    let offset = message.offset();
    let result = match tokio::time::timeout(ctx.commit_timeout, ctx.queue.commit(message)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(format!("timed out after {:?}", ctx.commit_timeout)),
    };

    match result {
        Ok(()) => ctx.stats.record_commit(true),
        Err(err) => {
            error!(worker = worker_id, %offset, error = %err, "failed to commit message");
            ctx.stats.record_commit(false);
        }
    }
}
