//! TaskExecutor - task kind ごとの dispatch + retry/backoff
//!
//! # フロー
//! 1. `task.kind` から collaborator を選ぶ（未知の kind は即終了）
//! 2. attempt ごとに timeout を掛けて呼ぶ
//! 3. 失敗したら backoff して再試行（予算内のみ）
//! 4. shutdown はいつでも attempt と backoff を打ち切る

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{Task, TaskError, TaskKind, TaskOutcome};
use crate::ports::{ReportAnalyzer, ReportExtractor};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy)]
enum Operation {
    Analyze,
    Extract,
}

/// Runs one task to a terminal outcome.
pub struct TaskExecutor {
    analyzer: Arc<dyn ReportAnalyzer>,
    extractor: Arc<dyn ReportExtractor>,
    retry_policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl TaskExecutor {
    pub fn new(
        analyzer: Arc<dyn ReportAnalyzer>,
        extractor: Arc<dyn ReportExtractor>,
        retry_policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            analyzer,
            extractor,
            retry_policy,
            attempt_timeout,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Execute `task` until it succeeds, exhausts its retry budget, or `cancel` fires.
    ///
    /// Exhausted tasks are not re-queued: the caller commits them and the
    /// work is dropped after an error log.
    pub async fn execute(&self, task: &Task, cancel: &CancellationToken) -> TaskOutcome {
        let operation = match &task.kind {
            TaskKind::Analyze => Operation::Analyze,
            TaskKind::Extract => Operation::Extract,
            TaskKind::Unrecognized(kind) => {
                warn!(ticker = %task.ticker, kind = %kind, "unrecognized task kind, skipping");
                return TaskOutcome::Unrecognized { kind: kind.clone() };
            }
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(ticker = %task.ticker, kind = %task.kind, attempt, "attempt abandoned by shutdown");
                    return TaskOutcome::Cancelled { attempts: attempt };
                }
                result = tokio::time::timeout(self.attempt_timeout, self.call(operation, task)) => {
                    result.unwrap_or(Err(TaskError::TimedOut(self.attempt_timeout)))
                }
            };

            let err = match result {
                Ok(output) => {
                    info!(ticker = %task.ticker, kind = %task.kind, attempt, "task completed");
                    debug!(ticker = %task.ticker, output_len = output.len(), "collaborator output");
                    return TaskOutcome::Succeeded {
                        attempts: attempt,
                        output,
                    };
                }
                Err(err) => err,
            };

            if !self.retry_policy.allows_retry(attempt) {
                error!(
                    ticker = %task.ticker,
                    kind = %task.kind,
                    year = task.year,
                    period = %task.period,
                    attempts = attempt,
                    error = %err,
                    "task failed permanently, retries exhausted"
                );
                return TaskOutcome::Exhausted {
                    attempts: attempt,
                    last_error: err,
                };
            }

            let delay = self.retry_policy.next_delay(attempt);
            warn!(
                ticker = %task.ticker,
                kind = %task.kind,
                attempt,
                error = %err,
                retry_in = ?delay,
                "attempt failed, retrying"
            );

            // backoff 中でも shutdown を優先する
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(ticker = %task.ticker, attempt, "backoff interrupted by shutdown");
                    return TaskOutcome::Cancelled { attempts: attempt };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn call(&self, operation: Operation, task: &Task) -> Result<String, TaskError> {
        match operation {
            Operation::Analyze => {
                self.analyzer
                    .analyze_report(&task.ticker, &task.report_url, task.year, task.period)
                    .await
            }
            Operation::Extract => {
                self.extractor
                    .extract_data_from_report(&task.ticker, &task.report_url, task.year, task.period)
                    .await
            }
        }
    }
}
