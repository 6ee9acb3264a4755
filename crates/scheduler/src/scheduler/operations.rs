use taskq_core::{Priority, SchedulerError, Task, TaskId};
use tracing::debug;

use crate::heap::HeapHandle;

use super::Scheduler;

impl Scheduler {
    /// Register a pending task.
    ///
    /// A task whose identifier is already pending is ignored, leaving the
    /// existing task and its priority untouched. Returns whether it was added.
    pub fn add(&mut self, task: Task) -> bool {
        if self.registry.contains_key(&task.identifier) {
            debug!("Ignoring duplicate task {}", task.identifier);
            self.metrics.record_duplicate();
            return false;
        }

        let id = self.heap.push(HeapHandle::new(task));
        self.registry.insert(task.identifier, id);
        self.metrics.record_add(self.heap.len());
        debug!("Added {}", task);

        self.verify("add");
        true
    }

    /// Like [`add`](Self::add), but a duplicate identifier is an error.
    pub fn try_add(&mut self, task: Task) -> Result<(), SchedulerError> {
        if self.registry.contains_key(&task.identifier) {
            return Err(SchedulerError::DuplicateTask(task.identifier));
        }
        self.add(task);
        Ok(())
    }

    /// Move a pending task to a new priority in O(log n).
    ///
    /// Unknown identifiers are ignored. Returns whether a task was updated.
    pub fn change_priority(&mut self, identifier: TaskId, new_priority: Priority) -> bool {
        let Some(&id) = self.registry.get(&identifier) else {
            debug!("Ignoring priority change for unknown task {}", identifier);
            self.metrics.record_unknown();
            return false;
        };

        self.heap.update_priority(id, new_priority);
        self.metrics.record_priority_change();
        debug!("Task {} now has priority {}", identifier, new_priority);

        self.verify("change_priority");
        true
    }

    /// Like [`change_priority`](Self::change_priority), but an unknown identifier is an error.
    pub fn try_change_priority(
        &mut self,
        identifier: TaskId,
        new_priority: Priority,
    ) -> Result<(), SchedulerError> {
        if !self.registry.contains_key(&identifier) {
            return Err(SchedulerError::TaskNotFound(identifier));
        }
        self.change_priority(identifier, new_priority);
        Ok(())
    }

    /// Remove and return the highest-priority pending task.
    ///
    /// `None` when nothing is pending; the scheduler is left as it was.
    pub fn get_next(&mut self) -> Option<Task> {
        let handle = match self.heap.pop() {
            Ok(handle) => handle,
            Err(_) => {
                self.metrics.record_empty_poll();
                return None;
            }
        };

        let task = handle.into_task();
        self.registry.remove(&task.identifier);
        self.metrics.record_dispatch();
        debug!("Dispatching {}", task);

        self.verify("get_next");
        Some(task)
    }

    /// [`get_next`](Self::get_next) with the zero task standing in for "nothing pending".
    ///
    /// The zero task is indistinguishable from a real task `{0, 0}`; check
    /// [`is_empty`](Self::is_empty) first when that matters.
    pub fn get_next_or_default(&mut self) -> Task {
        self.get_next().unwrap_or_default()
    }

    /// Cancel a pending task, returning it. Unknown identifiers yield `None`.
    pub fn remove(&mut self, identifier: TaskId) -> Option<Task> {
        let id = *self.registry.get(&identifier)?;
        let task = self.heap.remove(id)?.into_task();
        self.registry.remove(&identifier);
        self.metrics.record_removal();
        debug!("Removed {}", task);

        self.verify("remove");
        Some(task)
    }

    /// Discard every pending task.
    pub fn clear(&mut self) {
        let discarded = self.heap.len();
        self.heap.clear();
        self.registry.clear();
        self.metrics.record_cleared(discarded);
        if discarded > 0 {
            debug!("Cleared {} pending tasks", discarded);
        }

        self.verify("clear");
    }

    /// Yield every pending task in priority order, emptying the scheduler.
    ///
    /// Tasks not consumed before the iterator is dropped are discarded.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { scheduler: self }
    }
}

/// Iterator returned by [`Scheduler::drain`].
#[derive(Debug)]
pub struct Drain<'a> {
    scheduler: &'a mut Scheduler,
}

impl Iterator for Drain<'_> {
    type Item = Task;

    fn next(&mut self) -> Option<Task> {
        if self.scheduler.is_empty() {
            return None;
        }
        self.scheduler.get_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.scheduler.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for Drain<'_> {}

impl Drop for Drain<'_> {
    fn drop(&mut self) {
        self.scheduler.clear();
    }
}

impl Extend<Task> for Scheduler {
    fn extend<I: IntoIterator<Item = Task>>(&mut self, iter: I) {
        for task in iter {
            self.add(task);
        }
    }
}

impl FromIterator<Task> for Scheduler {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.extend(iter);
        scheduler
    }
}
