//! Per-task and per-batch results.

use std::time::Duration;

use thiserror::Error;

use crate::encode::EncodeError;
use crate::store::UploadError;

/// Why a single task did not produce a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    /// The worker panicked; the panic was contained to this task.
    #[error("Worker panicked: {0}")]
    Panicked(String),

    /// The batch was cancelled before this task reported.
    #[error("Cancelled before completion")]
    Cancelled,
}

impl TaskError {
    /// Short, stable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Encode(_) => "encode",
            TaskError::Upload(_) => "upload",
            TaskError::Panicked(_) => "panic",
            TaskError::Cancelled => "cancelled",
        }
    }
}

/// A variant that was encoded and accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Fully-qualified reference returned by the store.
    pub reference: String,
    /// Size of the encoded payload.
    pub encoded_len: usize,
    pub encode_elapsed: Duration,
    pub upload_elapsed: Duration,
}

/// Result of one task, tagged with its position in the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub index: usize,
    /// Object key derived for this task, whether or not the upload happened.
    pub key: String,
    pub result: Result<StoredObject, TaskError>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Stored reference, if the task succeeded.
    pub fn reference(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|stored| stored.reference.as_str())
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.result.as_ref().err()
    }
}

/// Everything a finished batch reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    outcomes: Vec<TaskOutcome>,
    elapsed: Duration,
}

impl BatchReport {
    /// `outcomes` must already be in submission order.
    pub(crate) fn new(outcomes: Vec<TaskOutcome>, elapsed: Duration) -> Self {
        debug_assert!(outcomes.iter().enumerate().all(|(i, o)| o.index == i));
        Self { outcomes, elapsed }
    }

    /// Outcomes in submission order.
    pub fn outcomes(&self) -> &[TaskOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<TaskOutcome> {
        self.outcomes
    }

    /// Wall-clock time of the whole batch.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Derived keys in submission order.
    pub fn keys(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.key.as_str()).collect()
    }

    /// Stored references in submission order; `None` for failed tasks.
    pub fn references(&self) -> Vec<Option<&str>> {
        self.outcomes.iter().map(TaskOutcome::reference).collect()
    }

    /// Failed outcomes, in submission order.
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_success)
    }
}
