//! TaskProcessor - consumer loop と worker 群のライフサイクル
//!
//! `start` spawns one consumer loop and N workers under a child token of the
//! caller's token and returns immediately. `stop` cancels that token and
//! waits for every spawned task, racing the wait against a drain timeout.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::consumer_loop::consume_with_retry;
use super::executor::TaskExecutor;
use super::status::{ProcessorStats, StatsSnapshot};
use super::worker_loop::{WorkerContext, worker_loop};
use crate::ports::QueueClient;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("task processor is already running")]
    AlreadyStarted,
}

/// How `stop` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Every worker and the consumer loop exited before the deadline.
    Drained,

    /// The deadline elapsed first. `abandoned` tasks were aborted; their
    /// in-flight messages stay uncommitted and will be redelivered.
    TimedOut { abandoned: usize },
}

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub workers: usize,
    pub channel_capacity: usize,
    pub commit_timeout: Duration,
    pub reconnect_backoff: Duration,
    pub reconnect_backoff_max: Duration,
}

/// Handle of one running generation of the pipeline.
/// - `cancel` を cancel すると consumer と worker 全体が止まる
/// - `joins` で全タスクの終了を待てる
struct Running {
    cancel: CancellationToken,
    joins: Vec<JoinHandle<()>>,
}

/// Owns one pipeline generation at a time.
///
/// Dropping a running processor cancels its tasks without waiting for them;
/// call `stop` to drain.
pub struct TaskProcessor {
    queue: Arc<dyn QueueClient>,
    executor: Arc<TaskExecutor>,
    settings: ProcessorSettings,
    stats: Arc<ProcessorStats>,
    running: Option<Running>,
}

impl TaskProcessor {
    pub fn new(
        queue: Arc<dyn QueueClient>,
        executor: Arc<TaskExecutor>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            queue,
            executor,
            settings,
            stats: Arc::new(ProcessorStats::new()),
            running: None,
        }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Launch the consumer loop and the workers. Non-blocking.
    ///
    /// Cancelling `parent` has the same effect as the cancel half of `stop`.
    pub fn start(&mut self, parent: &CancellationToken) -> Result<(), ProcessorError> {
        if self.running.is_some() {
            return Err(ProcessorError::AlreadyStarted);
        }

        let cancel = parent.child_token();
        let (tx, rx) = async_channel::bounded(self.settings.channel_capacity.max(1));
        let mut joins = Vec::with_capacity(self.settings.workers + 1);

        joins.push(tokio::spawn(consume_with_retry(
            Arc::clone(&self.queue),
            tx,
            Arc::clone(&self.stats),
            self.settings.reconnect_backoff,
            self.settings.reconnect_backoff_max,
            cancel.clone(),
        )));

        let ctx = Arc::new(WorkerContext {
            queue: Arc::clone(&self.queue),
            executor: Arc::clone(&self.executor),
            stats: Arc::clone(&self.stats),
            commit_timeout: self.settings.commit_timeout,
        });
        for worker_id in 0..self.settings.workers {
            joins.push(tokio::spawn(worker_loop(
                worker_id,
                rx.clone(),
                Arc::clone(&ctx),
                cancel.clone(),
            )));
        }

        info!(
            workers = self.settings.workers,
            channel_capacity = self.settings.channel_capacity,
            "task processor started"
        );
        self.running = Some(Running { cancel, joins });
        Ok(())
    }

    /// Cancel everything, then wait for all tasks at most `drain_timeout`.
    ///
    /// Never hangs: on timeout the remaining tasks are aborted and left behind.
    pub async fn stop(&mut self, drain_timeout: Duration) -> StopOutcome {
        let Some(Running { cancel, mut joins }) = self.running.take() else {
            return StopOutcome::Drained;
        };

        cancel.cancel();

        let drained = tokio::time::timeout(drain_timeout, async {
            for join in joins.iter_mut() {
                if let Err(err) = join.await {
                    if err.is_panic() {
                        error!(error = %err, "pipeline task panicked");
                    }
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                info!("task processor stopped");
                StopOutcome::Drained
            }
            Err(_) => {
                let abandoned = joins.iter().filter(|join| !join.is_finished()).count();
                for join in &joins {
                    join.abort();
                }
                warn!(
                    abandoned,
                    timeout = ?drain_timeout,
                    "task processor stop timed out, forcing shutdown"
                );
                StopOutcome::TimedOut { abandoned }
            }
        }
    }
}

impl Drop for TaskProcessor {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            warn!("task processor dropped while running, cancelling without drain");
            running.cancel.cancel();
        }
    }
}
