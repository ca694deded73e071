//! Task state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of one load Task.
///
/// State transitions:
/// - Created -> Scheduled -> Running -> Succeeded
/// - Created -> Scheduled -> Running -> Failed
///
/// No cancellation and no retry: once Scheduled, a Task always reaches a
/// terminal state, and no state is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Built, not yet handed to the worker pool.
    Created,

    /// Waiting for a worker permit.
    Scheduled,

    /// Decode in progress on a worker.
    Running,

    /// Decode produced an image.
    Succeeded,

    /// Decode failed or produced nothing.
    Failed,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    /// The only legal moves are one step forward along the lifecycle.
    pub fn can_advance_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Created, TaskState::Scheduled)
                | (TaskState::Scheduled, TaskState::Running)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
        )
    }
}
