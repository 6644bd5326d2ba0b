/// Lifecycle of a [`TaskQueue`](crate::queue::TaskQueue) run.
///
/// `Idle -> Running -> {Completed | Failed | Cancelled}`. A settled queue never
/// changes state again.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl QueueState {
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            QueueState::Completed | QueueState::Failed | QueueState::Cancelled
        )
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => QueueState::Idle,
            1 => QueueState::Running,
            2 => QueueState::Completed,
            3 => QueueState::Failed,
            _ => QueueState::Cancelled,
        }
    }
}
