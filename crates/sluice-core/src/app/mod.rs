//! App - アプリケーション層
//!
//! ports を組み合わせてパイプラインを動かします。
//!
//! # 主要コンポーネント
//! - **ProcessorBuilder**: 構築とワイヤリング（fail-fast）
//! - **TaskProcessor**: start/stop と drain
//! - **TaskExecutor**: kind ごとの dispatch + retry/backoff
//! - **worker_loop**: channel → decode → execute → commit
//! - **consumer_loop**: fetch → channel（再接続 backoff 付き）
//! - **ProcessorStats**: カウンタ

pub mod builder;
pub mod executor;
pub mod processor;
pub mod status;

mod consumer_loop;
mod worker_loop;

pub use self::builder::{BuildError, ProcessorBuilder};
pub use self::executor::TaskExecutor;
pub use self::processor::{ProcessorError, ProcessorSettings, StopOutcome, TaskProcessor};
pub use self::status::{ProcessorStats, StatsSnapshot};
