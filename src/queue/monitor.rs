use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use tokio::time::Instant;

use crate::{queue::QueueState, task::TaskId};

#[derive(Debug)]
struct Inner {
    state: AtomicU8,
    running: AtomicUsize,
    peak_running: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
    /// Tasks currently executing, with the instant they were dequeued.
    in_flight: DashMap<TaskId, Instant>,
    cancelled: AtomicBool,
    /// Set on cancel or on a failure that stops dequeuing.
    stop: AtomicBool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(QueueState::Idle as u8),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            in_flight: DashMap::new(),
            cancelled: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        }
    }
}

/// Observer handle for one queue run. Cheap to clone; every clone sees the
/// same counters.
#[derive(Debug, Clone, Default)]
pub struct QueueMonitor {
    inner: Arc<Inner>,
}

impl QueueMonitor {
    pub fn state(&self) -> QueueState {
        QueueState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Number of tasks currently in flight.
    pub fn running(&self) -> usize {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Highest number of tasks that were in flight at the same time.
    pub fn peak_running(&self) -> usize {
        self.inner.peak_running.load(Ordering::Acquire)
    }

    /// Number of tasks dequeued so far.
    pub fn started(&self) -> usize {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Number of tasks that settled, successfully or not.
    pub fn finished(&self) -> usize {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Ids of the tasks currently in flight, ascending.
    pub fn in_flight(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .inner
            .in_flight
            .iter()
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The in-flight task that has been running the longest.
    pub fn oldest_in_flight(&self) -> Option<(TaskId, Duration)> {
        self.inner
            .in_flight
            .iter()
            .min_by_key(|entry| *entry.value())
            .map(|entry| (*entry.key(), entry.value().elapsed()))
    }

    /// Stop dequeuing new tasks. Tasks already in flight run to completion and
    /// the run then fails with [`TaskError::Cancelled`](crate::TaskError::Cancelled)
    /// unless every task had already been dequeued.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.stop.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    pub(crate) fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::Release);
    }

    pub(crate) fn mark_running(&self) {
        let _ = self.inner.state.compare_exchange(
            QueueState::Idle as u8,
            QueueState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Move a running queue into a settled state. Returns false if the queue
    /// was not running.
    pub(crate) fn settle(&self, to: QueueState) -> bool {
        debug_assert!(to.is_settled());
        self.inner
            .state
            .compare_exchange(
                QueueState::Running as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn begin(&self, task_id: TaskId) {
        self.inner.in_flight.insert(task_id, Instant::now());
        self.inner.started.fetch_add(1, Ordering::AcqRel);
        let now = self.inner.running.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.peak_running.fetch_max(now, Ordering::AcqRel);
    }

    pub(crate) fn end(&self, task_id: TaskId) {
        self.inner.in_flight.remove(&task_id);
        self.inner.running.fetch_sub(1, Ordering::AcqRel);
        self.inner.finished.fetch_add(1, Ordering::AcqRel);
    }

    /// Forget tasks whose worker was aborted or panicked before `end`.
    pub(crate) fn clear_in_flight(&self) {
        self.inner.in_flight.clear();
        self.inner.running.store(0, Ordering::Release);
    }
}
