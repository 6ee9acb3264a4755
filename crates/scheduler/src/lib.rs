//! Mutable-priority task scheduler.
//!
//! Pending tasks live in an [`IndexedPriorityHeap`] that caches every
//! handle's array position, so a task's priority can be raised or lowered in
//! place in O(log n). [`Scheduler`] layers identifier lookup on top.

pub mod heap;
pub mod metrics;
pub mod scheduler;

pub use heap::{HandleId, HeapHandle, IndexedPriorityHeap};
pub use metrics::SchedulerMetrics;
pub use scheduler::{Drain, Scheduler};
pub use taskq_core::{Priority, SchedulerConfig, SchedulerError, Task, TaskId};
