use std::{any::Any, panic::AssertUnwindSafe, time::Duration};

use async_channel::{Receiver, Sender};
use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::{
    error::TaskError,
    queue::{FailureMode, QueueMonitor, builder::QueueConfig},
    task::{Task, TaskId},
};

/// One settled task, as reported by a worker.
pub(crate) struct Settled<R> {
    pub(crate) task_id: TaskId,
    pub(crate) outcome: Result<R, TaskError>,
}

/// Pull tasks from the shared queue until it is drained or a stop is requested.
pub(crate) async fn work<R: Send + 'static>(
    worker_id: usize,
    tasks: Receiver<Task<R>>,
    results: Sender<Settled<R>>,
    monitor: QueueMonitor,
    config: QueueConfig,
) {
    debug!(worker_id, "worker started");
    loop {
        if monitor.should_stop() {
            debug!(worker_id, "stop requested, leaving queue");
            break;
        }
        // The queue is closed once preloaded, so an error means it is drained.
        let Ok(task) = tasks.recv().await else {
            break;
        };

        let task_id = task.task_id;
        monitor.begin(task_id);
        trace!(worker_id, task_id, "task started");

        let outcome = execute(task, config.task_timeout).await;
        monitor.end(task_id);

        match &outcome {
            Ok(_) => trace!(worker_id, task_id, "task finished"),
            Err(err) => {
                warn!(worker_id, task_id, error = %err, "task failed");
                if config.failure_mode != FailureMode::Continue {
                    monitor.request_stop();
                }
            }
        }

        if results.send(Settled { task_id, outcome }).await.is_err() {
            break;
        }
    }
    debug!(worker_id, "worker finished");
}

async fn execute<R: Send + 'static>(
    task: Task<R>,
    timeout: Option<Duration>,
) -> Result<R, TaskError> {
    let task_id = task.task_id;
    // A panic inside the task is caught here so it fails the task, not the worker.
    let run = AssertUnwindSafe(task.run()).catch_unwind();
    let caught = match timeout {
        Some(after) => match tokio::time::timeout(after, run).await {
            Ok(caught) => caught,
            Err(_) => return Err(TaskError::Timeout { task_id, after }),
        },
        None => run.await,
    };
    match caught {
        Ok(result) => result.map_err(|source| TaskError::TaskFailed { task_id, source }),
        Err(payload) => Err(TaskError::TaskPanicked {
            task_id,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{BoxError, task_fn};
    use std::num::NonZeroUsize;

    fn config(failure_mode: FailureMode) -> QueueConfig {
        QueueConfig {
            max_concurrency: NonZeroUsize::new(1).unwrap(),
            result_order: Default::default(),
            failure_mode,
            task_timeout: None,
        }
    }

    fn failing_at(task_id: TaskId, bad: TaskId) -> Task<TaskId> {
        Task::new(
            task_id,
            task_fn(move || async move {
                if task_id == bad {
                    Err::<TaskId, BoxError>("bad page".into())
                } else {
                    Ok(task_id)
                }
            }),
        )
    }

    async fn drive(
        mode: FailureMode,
        count: usize,
        bad: TaskId,
    ) -> (Vec<Settled<TaskId>>, QueueMonitor) {
        let (task_tx, task_rx) = async_channel::unbounded();
        for task_id in 0..count {
            task_tx.send(failing_at(task_id, bad)).await.unwrap();
        }
        drop(task_tx);

        let (result_tx, result_rx) = async_channel::unbounded();
        let monitor = QueueMonitor::default();
        work(0, task_rx, result_tx, monitor.clone(), config(mode)).await;

        let mut settled = Vec::new();
        while let Ok(item) = result_rx.recv().await {
            settled.push(item);
        }
        (settled, monitor)
    }

    #[tokio::test]
    async fn test_worker_drains_queue_in_fifo_order() {
        let (settled, monitor) = drive(FailureMode::StopDequeue, 4, usize::MAX).await;
        let ids: Vec<_> = settled.iter().map(|s| s.task_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert!(settled.iter().all(|s| s.outcome.is_ok()));
        assert_eq!(monitor.finished(), 4);
    }

    #[tokio::test]
    async fn test_worker_stops_after_failure() {
        let (settled, monitor) = drive(FailureMode::StopDequeue, 4, 1).await;
        assert_eq!(settled.len(), 2);
        assert!(matches!(
            settled[1].outcome,
            Err(TaskError::TaskFailed { task_id: 1, .. })
        ));
        assert_eq!(monitor.started(), 2);
    }

    #[tokio::test]
    async fn test_worker_continues_after_failure() {
        let (settled, monitor) = drive(FailureMode::Continue, 4, 1).await;
        assert_eq!(settled.len(), 4);
        assert_eq!(settled.iter().filter(|s| s.outcome.is_err()).count(), 1);
        assert_eq!(monitor.started(), 4);
    }

    #[tokio::test]
    async fn test_execute_catches_panic() {
        let task = Task::new(
            2,
            task_fn(|| async {
                if true {
                    panic!("page parser exploded");
                }
                Ok::<u8, BoxError>(0)
            }),
        );
        let err = execute(task, None).await.unwrap_err();
        match err {
            TaskError::TaskPanicked { task_id, message } => {
                assert_eq!(task_id, 2);
                assert_eq!(message, "page parser exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_execute_catches_formatted_panic() {
        let task = Task::new(
            4,
            task_fn(|| async {
                if true {
                    panic!("page {} missing", 3);
                }
                Ok::<u8, BoxError>(0)
            }),
        );
        let err = execute(task, Some(Duration::from_secs(1))).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::TaskPanicked { task_id: 4, ref message } if message == "page 3 missing"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_times_out() {
        let task = Task::new(
            6,
            task_fn(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, BoxError>(())
            }),
        );
        let err = execute(task, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::Timeout { task_id: 6, after } if after == Duration::from_millis(50)
        ));
    }
}
