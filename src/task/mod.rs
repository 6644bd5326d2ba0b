pub mod runner;
pub mod task;

pub type TaskId = usize;

pub use runner::{BoxError, FnRunner, TaskRunner, task_fn};

pub use task::Task;
