//! Domain model (task, message, outcome, errors).

pub mod errors;
pub mod message;
pub mod outcome;
pub mod task;

pub use self::errors::{DecodeError, QueueError, TaskError};
pub use self::message::{MessageOffset, QueueMessage};
pub use self::outcome::TaskOutcome;
pub use self::task::{ReportPeriod, Task, TaskKind};
