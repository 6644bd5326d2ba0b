use std::{num::NonZeroUsize, time::Duration};

use crate::{error::TaskError, queue::TaskQueue};

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Order of the values returned by a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrder {
    /// Sorted by task id, so `results[i]` belongs to the i-th pushed task.
    #[default]
    Input,
    /// In the order tasks settled.
    Completion,
}

/// What the queue does after the first task failure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop dequeuing, let in-flight tasks settle, then return the error.
    #[default]
    StopDequeue,
    /// Keep running every remaining task, then return the first error.
    Continue,
    /// Abort in-flight tasks and return the error immediately.
    Abort,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct QueueConfig {
    pub(crate) max_concurrency: NonZeroUsize,
    pub(crate) result_order: ResultOrder,
    pub(crate) failure_mode: FailureMode,
    pub(crate) task_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskQueueBuilder {
    max_concurrency: usize,
    result_order: ResultOrder,
    failure_mode: FailureMode,
    task_timeout: Option<Duration>,
}

impl Default for TaskQueueBuilder {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            result_order: ResultOrder::default(),
            failure_mode: FailureMode::default(),
            task_timeout: None,
        }
    }
}

impl TaskQueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(&mut self, max: usize) -> &mut Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_result_order(&mut self, order: ResultOrder) -> &mut Self {
        self.result_order = order;
        self
    }

    pub fn with_failure_mode(&mut self, mode: FailureMode) -> &mut Self {
        self.failure_mode = mode;
        self
    }

    /// Fail any single task that runs longer than `timeout`.
    pub fn with_task_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn build<R: Send + 'static>(&self) -> Result<TaskQueue<R>, TaskError> {
        let max_concurrency = NonZeroUsize::new(self.max_concurrency)
            .ok_or(TaskError::InvalidConcurrency(self.max_concurrency))?;
        Ok(TaskQueue::with_config(QueueConfig {
            max_concurrency,
            result_order: self.result_order,
            failure_mode: self.failure_mode,
            task_timeout: self.task_timeout,
        }))
    }
}
