use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally assigned task identifier. Unique among pending tasks.
pub type TaskId = i64;

/// Task priority. Higher values are dispatched first.
pub type Priority = i64;

/// A pending unit of work as seen by the scheduler.
///
/// Only `identifier` and `priority` are interpreted; everything else about a
/// task lives with the caller. `Task::default()` is the zero task `{0, 0}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    pub identifier: TaskId,
    pub priority: Priority,
}

impl Task {
    pub fn new(identifier: TaskId, priority: Priority) -> Self {
        Self {
            identifier,
            priority,
        }
    }

    /// True for the zero task returned by `get_next_or_default` on an empty scheduler.
    pub fn is_zero(&self) -> bool {
        self.identifier == 0 && self.priority == 0
    }
}

impl From<(TaskId, Priority)> for Task {
    fn from((identifier, priority): (TaskId, Priority)) -> Self {
        Self::new(identifier, priority)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{} (priority {})", self.identifier, self.priority)
    }
}
