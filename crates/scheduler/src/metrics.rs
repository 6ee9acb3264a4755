use serde::Serialize;

/// Operation counters for a single scheduler instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerMetrics {
    /// Tasks accepted by `add`.
    pub tasks_added: u64,
    /// `add` calls ignored because the identifier was already pending.
    pub duplicates_ignored: u64,
    /// Successful priority changes.
    pub priority_changes: u64,
    /// `change_priority` calls ignored for unknown identifiers.
    pub unknown_ignored: u64,
    /// Tasks handed out by `get_next`.
    pub tasks_dispatched: u64,
    /// `get_next` calls on an empty scheduler.
    pub empty_polls: u64,
    /// Tasks cancelled through `remove`.
    pub tasks_removed: u64,
    /// Largest number of simultaneously pending tasks seen.
    pub peak_pending: usize,
}

impl SchedulerMetrics {
    pub fn record_add(&mut self, pending: usize) {
        self.tasks_added += 1;
        self.peak_pending = self.peak_pending.max(pending);
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates_ignored += 1;
    }

    pub fn record_priority_change(&mut self) {
        self.priority_changes += 1;
    }

    pub fn record_unknown(&mut self) {
        self.unknown_ignored += 1;
    }

    pub fn record_dispatch(&mut self) {
        self.tasks_dispatched += 1;
    }

    pub fn record_empty_poll(&mut self) {
        self.empty_polls += 1;
    }

    pub fn record_removal(&mut self) {
        self.tasks_removed += 1;
    }

    /// Pending tasks discarded in bulk count as removals.
    pub fn record_cleared(&mut self, count: usize) {
        self.tasks_removed += count as u64;
    }

    /// Tasks accepted but neither dispatched nor removed yet.
    pub fn outstanding(&self) -> u64 {
        self.tasks_added
            .saturating_sub(self.tasks_dispatched)
            .saturating_sub(self.tasks_removed)
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "added": self.tasks_added,
            "dispatched": self.tasks_dispatched,
            "removed": self.tasks_removed,
            "outstanding": self.outstanding(),
            "priority_changes": self.priority_changes,
            "ignored": {
                "duplicates": self.duplicates_ignored,
                "unknown": self.unknown_ignored,
                "empty_polls": self.empty_polls,
            },
            "peak_pending": self.peak_pending,
        })
    }
}
