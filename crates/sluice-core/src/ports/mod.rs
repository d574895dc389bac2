//! Ports - 外部システムとの境界
//!
//! Each trait is the interface of an external collaborator. The pipeline only
//! talks to these seams, so tests and the CLI can plug in their own doubles.

pub mod collaborator;
pub mod queue_client;

pub use self::collaborator::{ReportAnalyzer, ReportExtractor};
pub use self::queue_client::QueueClient;
