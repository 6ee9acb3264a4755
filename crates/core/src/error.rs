use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Heap is empty")]
    EmptyHeap,

    #[error("Task already pending: {0}")]
    DuplicateTask(TaskId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}
