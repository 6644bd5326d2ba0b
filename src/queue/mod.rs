pub mod builder;
pub mod monitor;
pub mod state;
mod worker;

use std::{future::Future, sync::Arc};

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{
    error::TaskError,
    task::{BoxError, FnRunner, Task, TaskId, TaskRunner, task_fn},
};

pub use builder::{DEFAULT_MAX_CONCURRENCY, FailureMode, ResultOrder, TaskQueueBuilder};
pub use monitor::QueueMonitor;
pub use state::QueueState;

use builder::QueueConfig;
use worker::Settled;

/// A batch of tasks run with a hard cap on how many are in flight at once.
///
/// Tasks are dequeued in the order they were pushed. Each run spawns at most
/// `max_concurrency` workers on the current tokio runtime; every worker pulls
/// the next task as soon as its previous one settles.
pub struct TaskQueue<R> {
    tasks: Vec<Task<R>>,
    pub(crate) config: QueueConfig,
    monitor: QueueMonitor,
}

impl<R: Send + 'static> TaskQueue<R> {
    /// A queue with the given cap and default settings otherwise.
    pub fn new(max_concurrency: usize) -> Result<Self, TaskError> {
        TaskQueueBuilder::new()
            .with_max_concurrency(max_concurrency)
            .build()
    }

    pub(crate) fn with_config(config: QueueConfig) -> Self {
        Self {
            tasks: Vec::new(),
            config,
            monitor: QueueMonitor::default(),
        }
    }

    pub fn push<T: TaskRunner<Output = R>>(&mut self, runner: T) -> TaskId {
        let task_id = self.tasks.len();
        self.tasks.push(Task::new(task_id, runner));
        task_id
    }

    pub fn push_fn<F>(&mut self, f: F) -> TaskId
    where
        FnRunner<F>: TaskRunner<Output = R>,
    {
        self.push(task_fn(f))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn max_concurrency(&self) -> usize {
        self.config.max_concurrency.get()
    }

    /// A handle for watching, or cancelling, the run of this queue.
    pub fn monitor(&self) -> QueueMonitor {
        self.monitor.clone()
    }

    /// Run every task and collect the values.
    pub async fn run(self) -> Result<Vec<R>, TaskError> {
        let settled = self.run_indexed().await?;
        Ok(settled.into_iter().map(|(_, value)| value).collect())
    }

    /// Run every task and collect the values tagged with their task ids.
    pub async fn run_indexed(self) -> Result<Vec<(TaskId, R)>, TaskError> {
        let TaskQueue {
            tasks,
            config,
            monitor,
        } = self;
        let total = tasks.len();
        monitor.mark_running();

        if total == 0 {
            debug!("queue is empty, nothing to run");
            monitor.settle(QueueState::Completed);
            return Ok(Vec::new());
        }

        let (task_tx, task_rx) = async_channel::unbounded();
        for task in tasks {
            // Unbounded with a live receiver, so this cannot fail.
            let _ = task_tx.try_send(task);
        }
        task_tx.close();

        let (result_tx, result_rx) = async_channel::unbounded();
        let workers = config.max_concurrency.get().min(total);
        debug!(total, workers, "queue started");

        let mut join_set = JoinSet::new();
        for worker_id in 0..workers {
            join_set.spawn(worker::work(
                worker_id,
                task_rx.clone(),
                result_tx.clone(),
                monitor.clone(),
                config,
            ));
        }
        drop(task_rx);
        drop(result_tx);

        let mut values: Vec<(TaskId, R)> = Vec::with_capacity(total);
        let mut first_error: Option<TaskError> = None;
        while let Ok(Settled { task_id, outcome }) = result_rx.recv().await {
            match outcome {
                Ok(value) => values.push((task_id, value)),
                Err(err) if first_error.is_none() => {
                    first_error = Some(err);
                    if config.failure_mode == FailureMode::Abort {
                        debug!(task_id, "aborting in-flight tasks");
                        join_set.abort_all();
                        break;
                    }
                }
                Err(_) => {}
            }
        }

        let mut panicked = None;
        while let Some(joined) = join_set.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    warn!(error = %err, "worker panicked");
                    panicked.get_or_insert_with(|| err.to_string());
                }
            }
        }
        monitor.clear_in_flight();

        if let Some(message) = panicked {
            monitor.settle(QueueState::Failed);
            return Err(TaskError::WorkerPanicked(message));
        }
        if let Some(err) = first_error {
            monitor.settle(QueueState::Failed);
            return Err(err);
        }
        if values.len() < total {
            debug!(completed = values.len(), total, "queue cancelled");
            monitor.settle(QueueState::Cancelled);
            return Err(TaskError::Cancelled {
                completed: values.len(),
            });
        }

        if config.result_order == ResultOrder::Input {
            values.sort_unstable_by_key(|(task_id, _)| *task_id);
        }
        monitor.settle(QueueState::Completed);
        debug!(total, "queue completed");
        Ok(values)
    }
}

impl<R> std::fmt::Debug for TaskQueue<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("tasks", &self.tasks.len())
            .field("config", &self.config)
            .field("state", &self.monitor.state())
            .finish()
    }
}

impl<R, T> Extend<T> for TaskQueue<R>
where
    R: Send + 'static,
    T: TaskRunner<Output = R>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, runners: I) {
        for runner in runners {
            self.push(runner);
        }
    }
}

/// Run `tasks` with at most `max` in flight, returning values in input order.
pub async fn run<I, T>(tasks: I, max: usize) -> Result<Vec<T::Output>, TaskError>
where
    I: IntoIterator<Item = T>,
    T: TaskRunner,
{
    let mut queue = TaskQueue::new(max)?;
    queue.extend(tasks);
    queue.run().await
}

/// Apply `f` to every item with at most `max` calls in flight. The output keeps
/// the order of `items`.
pub async fn map_bounded<T, F, Fut, R, E>(
    items: Vec<T>,
    max: usize,
    f: F,
) -> Result<Vec<R>, TaskError>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    let f = Arc::new(f);
    let mut queue = TaskQueue::new(max)?;
    for item in items {
        let f = Arc::clone(&f);
        queue.push_fn(move || f(item.clone()));
    }
    queue.run().await
}
