use crate::task::{BoxError, TaskId, TaskRunner};

pub struct Task<R> {
    /// Position of the task in the input sequence.
    pub task_id: TaskId,
    /// The actual task runner that will be executed.
    pub(crate) runner: Box<dyn TaskRunner<Output = R>>,
}

impl<R: Send + 'static> Task<R> {
    pub fn new<T: TaskRunner<Output = R>>(task_id: TaskId, runner: T) -> Self {
        Self {
            task_id,
            runner: Box::new(runner),
        }
    }

    /// Consume the task and run it. A task can only be run once.
    pub async fn run(self) -> Result<R, BoxError> {
        self.runner.run().await
    }
}

impl<R> std::fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("task_id", &self.task_id).finish()
    }
}
