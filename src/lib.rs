//! A mini bounded-concurrency task queue on the tokio runtime.
//!
//! Push any number of asynchronous tasks into a [`TaskQueue`] and run them with
//! at most `max_concurrency` in flight. The queue is meant for fanning out
//! requests against an API that throttles concurrent connections.
//!
//! ```no_run
//! use miniqueue::{BoxError, TaskQueue};
//!
//! # async fn demo() -> Result<(), miniqueue::TaskError> {
//! let mut queue = TaskQueue::new(5)?;
//! for page in 0..12usize {
//!     queue.push_fn(move || async move { Ok::<_, BoxError>(page * 20) });
//! }
//! let offsets = queue.run().await?;
//! assert_eq!(offsets.len(), 12);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pagination;
pub mod queue;
pub mod task;

pub use error::TaskError;
pub use pagination::{PageSource, PaginationConfig, collect_pages, fetch_all_pages};
pub use queue::{
    DEFAULT_MAX_CONCURRENCY, FailureMode, QueueMonitor, QueueState, ResultOrder, TaskQueue,
    TaskQueueBuilder, map_bounded, run,
};
pub use task::{BoxError, FnRunner, Task, TaskId, TaskRunner, task_fn};
