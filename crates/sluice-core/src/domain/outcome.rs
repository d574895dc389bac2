//! Outcome of running one task through the executor.

use super::errors::TaskError;

/// Terminal result of `TaskExecutor::execute`.
///
/// State machine per attempt:
/// `Pending -> Executing -> {Success | TransientFailure -> (backoff) -> Pending | TerminalFailure}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// A collaborator call returned `Ok`.
    ///
    /// `output` is the collaborator's summary. Persisting results is the
    /// collaborator's job; the pipeline only logs its size.
    Succeeded { attempts: u32, output: String },

    /// Every attempt in the retry budget failed. The task is dropped.
    Exhausted { attempts: u32, last_error: TaskError },

    /// The task kind has no collaborator. Nothing was called.
    Unrecognized { kind: String },

    /// Shutdown preempted an attempt or a backoff wait.
    Cancelled { attempts: u32 },
}

impl TaskOutcome {
    /// Whether the source message may be acknowledged.
    ///
    /// Cancelled tasks stay uncommitted so the broker redelivers them.
    pub fn should_commit(&self) -> bool {
        !matches!(self, TaskOutcome::Cancelled { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Succeeded { attempts, .. }
            | TaskOutcome::Exhausted { attempts, .. }
            | TaskOutcome::Cancelled { attempts } => *attempts,
            TaskOutcome::Unrecognized { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cancelled_outcomes_skip_commit() {
        let succeeded = TaskOutcome::Succeeded {
            attempts: 1,
            output: "ok".to_string(),
        };
        let exhausted = TaskOutcome::Exhausted {
            attempts: 3,
            last_error: TaskError::failed("boom"),
        };
        let unrecognized = TaskOutcome::Unrecognized {
            kind: "bogus".to_string(),
        };
        let cancelled = TaskOutcome::Cancelled { attempts: 2 };

        assert!(succeeded.should_commit());
        assert!(exhausted.should_commit());
        assert!(unrecognized.should_commit());
        assert!(!cancelled.should_commit());

        assert_eq!(unrecognized.attempts(), 0);
        assert_eq!(cancelled.attempts(), 2);
    }
}
