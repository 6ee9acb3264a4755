use std::collections::HashMap;

use taskq_core::config::{self, Config};
use taskq_core::{Priority, SchedulerConfig, SchedulerError, Task, TaskId};
use tracing::{debug, error};

use crate::heap::{HandleId, IndexedPriorityHeap};
use crate::metrics::SchedulerMetrics;

/// Holds pending tasks and hands out the highest-priority one on demand.
///
/// Every pending identifier maps to exactly one handle in the heap. The
/// scheduler is a plain single-threaded structure; callers that share it
/// across threads wrap the whole value in one lock.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Ordering of pending tasks.
    pub(super) heap: IndexedPriorityHeap,
    /// Identifier -> handle currently representing that task.
    pub(super) registry: HashMap<TaskId, HandleId>,
    pub(super) metrics: SchedulerMetrics,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create an empty scheduler with default config.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        debug!(
            "Scheduler created (initial_capacity={}, verify_invariants={})",
            config.initial_capacity, config.verify_invariants
        );
        Self {
            heap: IndexedPriorityHeap::with_capacity(config.initial_capacity),
            registry: HashMap::with_capacity(config.initial_capacity),
            metrics: SchedulerMetrics::default(),
            config,
        }
    }

    /// Build from `.env` and `TASKQ_PROFILE`-profiled `SCHEDULER_*` variables.
    pub fn from_env() -> Self {
        config::load_dotenv();
        Self::with_config(Config::from_env().scheduler)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, identifier: TaskId) -> bool {
        self.registry.contains_key(&identifier)
    }

    /// Current priority of a pending task.
    pub fn priority_of(&self, identifier: TaskId) -> Option<Priority> {
        let id = self.registry.get(&identifier)?;
        self.heap.handle(*id).map(|handle| handle.priority())
    }

    /// The task `get_next` would return, left in place.
    pub fn peek(&self) -> Option<&Task> {
        self.heap.peek()
    }

    /// Snapshot of pending tasks in no particular order.
    pub fn pending(&self) -> Vec<Task> {
        self.heap.iter().map(|(_, handle)| *handle.task()).collect()
    }

    /// Check the heap invariants and that the registry mirrors the heap exactly.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.heap.validate()?;

        if self.registry.len() != self.heap.len() {
            return Err(SchedulerError::InvariantViolation(format!(
                "registry has {} entries but heap has {} handles",
                self.registry.len(),
                self.heap.len()
            )));
        }

        for (id, handle) in self.heap.iter() {
            let identifier = handle.task().identifier;
            if self.registry.get(&identifier) != Some(&id) {
                return Err(SchedulerError::InvariantViolation(format!(
                    "heap handle for task {} is not the registered one",
                    identifier
                )));
            }
        }

        Ok(())
    }

    /// Run `validate` after a mutation when the config asks for it.
    ///
    /// Violations are logged, not raised. Returns false only for a logged violation.
    pub(super) fn verify(&self, operation: &str) -> bool {
        if !self.config.verify_invariants {
            return true;
        }
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                error!("Scheduler invariant broken after {}: {}", operation, e);
                false
            }
        }
    }
}
