//! Indexed binary max-heap with in-place priority updates.
//!
//! Handles are owned by an arena; the heap itself is a dense `order` array of
//! arena keys. Each handle caches its current index in `order`, and every
//! swap, insertion and shrink rewrites that cache in the same step. This is
//! what lets a caller holding a [`HandleId`] change a priority and restore
//! the heap in O(log n) without searching.
//!
//! Invariants, checked by [`IndexedPriorityHeap::validate`]:
//! - `handles[order[i]].position == Some(i)` for every `i`
//! - `priority(order[(i - 1) / 2]) >= priority(order[i])` for every `i > 0`
//! - the arena holds exactly the handles referenced by `order`
//!
//! Comparisons are strict, so equal priorities come out in unspecified order.

mod arena;

use taskq_core::{Priority, SchedulerError, Task};

use self::arena::{Arena, ArenaKey};

/// Stable key of a handle stored in an [`IndexedPriorityHeap`].
///
/// Valid from `push` until the handle leaves the heap via `pop`, `remove` or
/// `clear`. Afterwards every lookup through it yields `None`, even once the
/// handle's slot holds a newer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(ArenaKey);

/// A task together with its live slot in the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapHandle {
    task: Task,
    /// Index in the heap's order array, `None` when not in a heap.
    position: Option<usize>,
}

impl HeapHandle {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            position: None,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn into_task(self) -> Task {
        self.task
    }

    pub fn priority(&self) -> Priority {
        self.task.priority
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

#[derive(Debug, Clone)]
pub struct IndexedPriorityHeap {
    handles: Arena<HeapHandle>,
    order: Vec<HandleId>,
}

impl Default for IndexedPriorityHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexedPriorityHeap {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Arena::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The highest-priority task, without removing it.
    pub fn peek(&self) -> Option<&Task> {
        let id = self.order.first()?;
        self.handles.get(id.0).map(HeapHandle::task)
    }

    pub fn handle(&self, id: HandleId) -> Option<&HeapHandle> {
        self.handles.get(id.0)
    }

    /// Resident handles in array order (not priority order).
    pub fn iter(&self) -> impl Iterator<Item = (HandleId, &HeapHandle)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.handles.get(id.0).map(|handle| (id, handle)))
    }

    /// Insert a handle and sift it up to its resting slot.
    pub fn push(&mut self, mut handle: HeapHandle) -> HandleId {
        let position = self.order.len();
        handle.position = Some(position);
        let id = HandleId(self.handles.insert(handle));
        self.order.push(id);
        self.sift_up(position);
        id
    }

    /// Remove and return the maximum. The returned handle has no position.
    pub fn pop(&mut self) -> Result<HeapHandle, SchedulerError> {
        self.remove_at(0).ok_or(SchedulerError::EmptyHeap)
    }

    /// Remove an arbitrary resident handle in O(log n).
    pub fn remove(&mut self, id: HandleId) -> Option<HeapHandle> {
        let position = self.handles.get(id.0)?.position?;
        self.remove_at(position)
    }

    /// Overwrite a resident task's priority and restore the heap around it.
    ///
    /// Returns the handle's new position, or `None` for an unknown handle.
    pub fn update_priority(&mut self, id: HandleId, priority: Priority) -> Option<usize> {
        let handle = self.handles.get_mut(id.0)?;
        handle.task.priority = priority;
        let position = handle.position?;
        self.fix_at(position)
    }

    /// Restore the heap after the priority at `position` changed.
    ///
    /// Tries sifting up first; if the element did not move, sifts down.
    /// Out-of-bounds positions are ignored and yield `None`.
    pub fn fix_at(&mut self, position: usize) -> Option<usize> {
        if position >= self.order.len() {
            return None;
        }
        let raised = self.sift_up(position);
        if raised != position {
            return Some(raised);
        }
        Some(self.sift_down(position))
    }

    pub fn clear(&mut self) {
        self.handles.clear();
        self.order.clear();
    }

    /// Full scan of the heap property and position synchrony.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.handles.len() != self.order.len() {
            return Err(SchedulerError::InvariantViolation(format!(
                "arena holds {} handles but heap order has {}",
                self.handles.len(),
                self.order.len()
            )));
        }

        for (slot, id) in self.order.iter().enumerate() {
            let handle = self.handles.get(id.0).ok_or_else(|| {
                SchedulerError::InvariantViolation(format!("slot {} references a vacant handle", slot))
            })?;

            if handle.position != Some(slot) {
                return Err(SchedulerError::InvariantViolation(format!(
                    "handle at slot {} records position {:?}",
                    slot, handle.position
                )));
            }

            if slot > 0 {
                let parent = (slot - 1) / 2;
                if self.outranks(slot, parent) {
                    return Err(SchedulerError::InvariantViolation(format!(
                        "slot {} (priority {}) outranks its parent at slot {}",
                        slot,
                        handle.priority(),
                        parent
                    )));
                }
            }
        }

        Ok(())
    }

    // ── Internals ────────────────────────────────────────────

    fn remove_at(&mut self, position: usize) -> Option<HeapHandle> {
        let last = self.order.len().checked_sub(1)?;
        if position > last {
            return None;
        }

        self.swap(position, last);
        let id = self.order.pop()?;
        let mut handle = self.handles.remove(id.0)?;
        handle.position = None;

        // The former last element now sits at `position` and may need to move either way.
        self.fix_at(position);
        Some(handle)
    }

    fn priority_at(&self, position: usize) -> Option<Priority> {
        let id = self.order.get(position)?;
        self.handles.get(id.0).map(HeapHandle::priority)
    }

    /// Strictly greater priority at slot `a` than at slot `b`.
    fn outranks(&self, a: usize, b: usize) -> bool {
        match (self.priority_at(a), self.priority_at(b)) {
            (Some(pa), Some(pb)) => pa > pb,
            _ => false,
        }
    }

    fn sift_up(&mut self, mut position: usize) -> usize {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.outranks(position, parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
        position
    }

    fn sift_down(&mut self, mut position: usize) -> usize {
        let len = self.order.len();
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut largest = position;

            if left < len && self.outranks(left, largest) {
                largest = left;
            }
            if right < len && self.outranks(right, largest) {
                largest = right;
            }
            if largest == position {
                break;
            }

            self.swap(position, largest);
            position = largest;
        }
        position
    }

    /// Swap two slots and rewrite both cached positions.
    fn swap(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
        for slot in [a, b] {
            let id = self.order[slot];
            if let Some(handle) = self.handles.get_mut(id.0) {
                handle.position = Some(slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap_of(priorities: &[Priority]) -> (IndexedPriorityHeap, Vec<HandleId>) {
        let mut heap = IndexedPriorityHeap::new();
        let ids = priorities
            .iter()
            .enumerate()
            .map(|(i, &p)| heap.push(HeapHandle::new(Task::new(i as i64, p))))
            .collect();
        (heap, ids)
    }

    fn drain_priorities(heap: &mut IndexedPriorityHeap) -> Vec<Priority> {
        let mut out = Vec::new();
        while let Ok(handle) = heap.pop() {
            heap.validate().unwrap();
            out.push(handle.priority());
        }
        out
    }

    #[test]
    fn push_keeps_max_at_root() {
        let (heap, _) = heap_of(&[3, 9, 1, 7, 5]);
        heap.validate().unwrap();
        assert_eq!(heap.len(), 5);
        assert_eq!(heap.peek().map(|t| t.priority), Some(9));
    }

    #[test]
    fn pop_yields_non_increasing_priorities() {
        let (mut heap, _) = heap_of(&[4, 8, 15, 16, 23, 42, 8, -1]);
        assert_eq!(drain_priorities(&mut heap), vec![42, 23, 16, 15, 8, 8, 4, -1]);
        assert!(heap.is_empty());
    }

    #[test]
    fn pop_empty_is_error() {
        let mut heap = IndexedPriorityHeap::new();
        assert_eq!(heap.pop(), Err(SchedulerError::EmptyHeap));
    }

    #[test]
    fn popped_handle_has_no_position() {
        let (mut heap, _) = heap_of(&[1, 2]);
        let handle = heap.pop().unwrap();
        assert_eq!(handle.position(), None);
        assert_eq!(handle.task(), &Task::new(1, 2));
    }

    #[test]
    fn positions_track_slots_after_push() {
        let (heap, ids) = heap_of(&[10, 20, 30, 40, 50]);
        for (slot, (id, handle)) in heap.iter().enumerate() {
            assert_eq!(handle.position(), Some(slot));
            assert!(ids.contains(&id));
        }
        // The last pushed (priority 50) bubbled to the root.
        assert_eq!(heap.handle(ids[4]).and_then(HeapHandle::position), Some(0));
    }

    #[test]
    fn update_priority_raises_to_root() {
        let (mut heap, ids) = heap_of(&[10, 20, 30, 40, 50]);
        let position = heap.update_priority(ids[0], 100);
        assert_eq!(position, Some(0));
        heap.validate().unwrap();
        assert_eq!(heap.peek(), Some(&Task::new(0, 100)));
    }

    #[test]
    fn update_priority_lowers_to_leaf() {
        let (mut heap, ids) = heap_of(&[10, 20, 30, 40, 50]);
        heap.update_priority(ids[4], 0);
        heap.validate().unwrap();
        assert_eq!(heap.peek().map(|t| t.priority), Some(40));
        assert_eq!(drain_priorities(&mut heap), vec![40, 30, 20, 10, 0]);
    }

    #[test]
    fn fix_at_after_direct_mutation() {
        let (mut heap, ids) = heap_of(&[5, 6, 7]);
        let position = heap.handle(ids[0]).and_then(HeapHandle::position).unwrap();
        if let Some(handle) = heap.handles.get_mut(ids[0].0) {
            handle.task.priority = 99;
        }
        assert!(heap.validate().is_err());

        assert_eq!(heap.fix_at(position), Some(0));
        heap.validate().unwrap();
    }

    #[test]
    fn fix_at_out_of_bounds_is_noop() {
        let (mut heap, _) = heap_of(&[1, 2, 3]);
        assert_eq!(heap.fix_at(3), None);
        assert_eq!(heap.fix_at(usize::MAX), None);
        assert_eq!(heap.len(), 3);
        heap.validate().unwrap();
    }

    #[test]
    fn fix_at_unchanged_priority_stays_put() {
        let (mut heap, _) = heap_of(&[9, 5, 7, 1]);
        for slot in 0..heap.len() {
            assert_eq!(heap.fix_at(slot), Some(slot));
        }
    }

    #[test]
    fn remove_interior_handle() {
        let (mut heap, ids) = heap_of(&[10, 20, 30, 40, 50, 60, 70]);
        let removed = heap.remove(ids[3]).unwrap();
        assert_eq!(removed.task(), &Task::new(3, 40));
        assert_eq!(removed.position(), None);
        assert!(heap.handle(ids[3]).is_none());
        heap.validate().unwrap();
        assert_eq!(drain_priorities(&mut heap), vec![70, 60, 50, 30, 20, 10]);
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut heap = IndexedPriorityHeap::new();
        let stale = heap.push(HeapHandle::new(Task::new(1, 10)));
        assert_eq!(heap.pop().map(HeapHandle::into_task), Ok(Task::new(1, 10)));

        let fresh = heap.push(HeapHandle::new(Task::new(2, 20)));
        assert_ne!(stale, fresh);
        assert!(heap.handle(stale).is_none());

        assert_eq!(heap.update_priority(stale, -999), None);
        assert_eq!(heap.peek(), Some(&Task::new(2, 20)));
        assert!(heap.remove(stale).is_none());
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.handle(fresh).map(HeapHandle::task), Some(&Task::new(2, 20)));
        heap.validate().unwrap();
    }

    #[test]
    fn cleared_handles_stay_stale() {
        let (mut heap, ids) = heap_of(&[1, 2]);
        heap.clear();
        heap.push(HeapHandle::new(Task::new(9, 9)));
        assert!(ids.iter().all(|&id| heap.handle(id).is_none()));
        assert_eq!(heap.update_priority(ids[0], 50), None);
        assert_eq!(heap.peek(), Some(&Task::new(9, 9)));
    }

    #[test]
    fn remove_last_slot_and_stale_id() {
        let (mut heap, ids) = heap_of(&[1]);
        assert!(heap.remove(ids[0]).is_some());
        assert!(heap.remove(ids[0]).is_none());
        assert!(heap.is_empty());
    }

    #[test]
    fn removal_can_require_sift_up() {
        // Removing from one subtree can pull a larger leaf from the other subtree.
        let (mut heap, ids) = heap_of(&[100, 50, 90, 10, 20, 80, 85]);
        heap.validate().unwrap();
        let target = heap
            .iter()
            .find(|(_, h)| h.priority() == 10)
            .map(|(id, _)| id)
            .unwrap();
        heap.remove(target);
        heap.validate().unwrap();
        assert_eq!(heap.len(), ids.len() - 1);
    }

    #[test]
    fn equal_priorities() {
        let (mut heap, _) = heap_of(&[5, 5, 5, 5]);
        heap.validate().unwrap();
        assert_eq!(drain_priorities(&mut heap), vec![5, 5, 5, 5]);
    }

    #[test]
    fn clear_resets() {
        let (mut heap, ids) = heap_of(&[1, 2, 3]);
        heap.clear();
        assert!(heap.is_empty());
        assert!(heap.peek().is_none());
        assert!(heap.handle(ids[0]).is_none());
        heap.validate().unwrap();
    }
}
