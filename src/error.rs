use std::time::Duration;

use thiserror::Error;

use crate::task::{BoxError, TaskId};

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("invalid concurrency: max must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("task {task_id} failed: {source}")]
    TaskFailed {
        task_id: TaskId,
        #[source]
        source: BoxError,
    },

    #[error("task {task_id} timed out after {after:?}")]
    Timeout { task_id: TaskId, after: Duration },

    #[error("task {task_id} panicked: {message}")]
    TaskPanicked { task_id: TaskId, message: String },

    #[error("queue cancelled after {completed} task(s) completed")]
    Cancelled { completed: usize },

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl TaskError {
    /// The id of the task this error came from, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            TaskError::TaskFailed { task_id, .. }
            | TaskError::Timeout { task_id, .. }
            | TaskError::TaskPanicked { task_id, .. } => Some(*task_id),
            _ => None,
        }
    }
}
