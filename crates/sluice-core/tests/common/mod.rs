#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sluice_core::domain::{QueueError, QueueMessage, ReportPeriod, TaskError};
use sluice_core::impls::InMemoryQueueClient;
use sluice_core::ports::{QueueClient, ReportAnalyzer, ReportExtractor};
use sluice_core::{ProcessorBuilder, StatsSnapshot, TaskProcessor};
use tokio::time::Instant;

/// Shared, ordered record of what collaborators and the queue saw.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == event)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    FailFirst(u32),
    AlwaysFail,
    Hang,
}

pub struct ScriptedCollaborator {
    behavior: Behavior,
    remaining_failures: AtomicU32,
    calls: AtomicU32,
    log: EventLog,
}

impl ScriptedCollaborator {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_log(behavior, EventLog::default())
    }

    pub fn with_log(behavior: Behavior, log: EventLog) -> Arc<Self> {
        let failures = match behavior {
            Behavior::FailFirst(n) => n,
            _ => 0,
        };
        Arc::new(Self {
            behavior,
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            log,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, op: &str, ticker: &str) -> Result<String, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Hang => std::future::pending().await,
            Behavior::AlwaysFail => Err(TaskError::failed("collaborator unavailable")),
            Behavior::FailFirst(_) => {
                if let Ok(left) = self.remaining_failures.fetch_update(
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                    |n| n.checked_sub(1),
                ) {
                    return Err(TaskError::failed(format!("intentional failure (left={left})")));
                }
                self.log.push(format!("done:{ticker}"));
                Ok(format!("{op}:{ticker}"))
            }
            Behavior::Succeed => {
                self.log.push(format!("done:{ticker}"));
                Ok(format!("{op}:{ticker}"))
            }
        }
    }
}

#[async_trait]
impl ReportAnalyzer for ScriptedCollaborator {
    async fn analyze_report(
        &self,
        ticker: &str,
        _report_url: &str,
        _year: i32,
        _period: ReportPeriod,
    ) -> Result<String, TaskError> {
        self.respond("analyze", ticker).await
    }
}

#[async_trait]
impl ReportExtractor for ScriptedCollaborator {
    async fn extract_data_from_report(
        &self,
        ticker: &str,
        _report_url: &str,
        _year: i32,
        _period: ReportPeriod,
    ) -> Result<String, TaskError> {
        self.respond("extract", ticker).await
    }
}

/// Wraps the in-memory client to log commits, or to make them hang forever.
pub struct RecordingQueue {
    pub inner: Arc<InMemoryQueueClient>,
    log: EventLog,
    stuck_commits: bool,
}

impl RecordingQueue {
    pub fn new(inner: Arc<InMemoryQueueClient>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            inner,
            log,
            stuck_commits: false,
        })
    }

    pub fn with_stuck_commits(inner: Arc<InMemoryQueueClient>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            log: EventLog::default(),
            stuck_commits: true,
        })
    }
}

#[async_trait]
impl QueueClient for RecordingQueue {
    async fn fetch(&self) -> Result<QueueMessage, QueueError> {
        self.inner.fetch().await
    }

    async fn commit(&self, message: &QueueMessage) -> Result<(), QueueError> {
        if self.stuck_commits {
            std::future::pending::<()>().await;
        }
        self.log.push(format!("commit:{}", message.offset().offset));
        self.inner.commit(message).await
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.inner.close().await
    }
}

/// Fails commits for offsets below `failing_below`: even offsets get
/// `QueueError::Commit`, odd ones never answer. Later offsets pass through.
pub struct FlakyCommitQueue {
    pub inner: Arc<InMemoryQueueClient>,
    failing_below: i64,
}

impl FlakyCommitQueue {
    pub fn new(inner: Arc<InMemoryQueueClient>, failing_below: i64) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing_below,
        })
    }
}

#[async_trait]
impl QueueClient for FlakyCommitQueue {
    async fn fetch(&self) -> Result<QueueMessage, QueueError> {
        self.inner.fetch().await
    }

    async fn commit(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let offset = message.offset().offset;
        if offset < self.failing_below {
            if offset % 2 == 0 {
                return Err(QueueError::Commit(format!("offset {offset} rejected")));
            }
            std::future::pending::<()>().await;
        }
        self.inner.commit(message).await
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.inner.close().await
    }
}

pub fn task_json(ticker: &str, kind: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "ticker": ticker,
        "year": 2024,
        "period": "Q2",
        "report_url": format!("reports/{ticker}.pdf"),
        "type": kind,
    }))
    .unwrap()
}

pub fn processor(
    queue: Arc<dyn QueueClient>,
    collaborator: Arc<ScriptedCollaborator>,
    workers: usize,
) -> TaskProcessor {
    ProcessorBuilder::new(queue)
        .analyzer(collaborator.clone())
        .extractor(collaborator)
        .workers(workers)
        .build()
        .unwrap()
}

/// Poll `condition` on virtual time until it holds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3600);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_stats(processor: &TaskProcessor, condition: impl Fn(&StatsSnapshot) -> bool) {
    wait_for(|| condition(&processor.stats())).await;
}
