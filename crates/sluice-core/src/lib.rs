//! sluice-core
//!
//! Background pipeline that drains analysis/extraction tasks from a durable
//! queue and runs them against slow, failure-prone collaborators.
//!
//! # モジュール構成
//! - **domain**: Task, QueueMessage, TaskOutcome, errors
//! - **codec**: payload bytes → Task（poison 判定）
//! - **ports**: QueueClient, ReportAnalyzer, ReportExtractor
//! - **retry**: RetryPolicy（task 再試行）, Backoff（再接続）
//! - **app**: TaskExecutor, worker/consumer loops, TaskProcessor, ProcessorBuilder
//! - **impls**: InMemoryQueueClient
//! - **config**: PipelineConfig
//!
//! Data flow: `QueueClient → consumer loop → bounded channel → N workers →
//! TaskExecutor → collaborator → commit`.
//!
//! Delivery is at-least-once. A message is committed only after its task
//! reached a terminal outcome; tasks interrupted by shutdown stay uncommitted.

pub mod app;
pub mod codec;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod retry;

pub use app::{BuildError, ProcessorBuilder, StatsSnapshot, StopOutcome, TaskExecutor, TaskProcessor};
pub use config::{ConfigError, PipelineConfig};
pub use domain::{DecodeError, QueueError, QueueMessage, ReportPeriod, Task, TaskError, TaskKind, TaskOutcome};
