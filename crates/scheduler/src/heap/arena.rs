/// Key into an [`Arena`]: slot index plus the generation it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ArenaKey {
    index: usize,
    generation: u64,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u64,
    item: Option<T>,
}

/// Slot storage handing out stable keys whose slots are reused after removal.
///
/// Vacant slots sit on the free stack, so `insert` is O(1) and never moves an
/// occupied slot. A slot's generation is bumped whenever it is vacated, so a
/// key issued before the removal never matches the slot's next occupant.
#[derive(Debug, Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> ArenaKey {
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.item = Some(item);
                ArenaKey {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    item: Some(item),
                });
                ArenaKey {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    pub(crate) fn remove(&mut self, key: ArenaKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        let item = slot.item.take()?;
        slot.generation += 1;
        self.free.push(key.index);
        self.len -= 1;
        Some(item)
    }

    pub(crate) fn get(&self, key: ArenaKey) -> Option<&T> {
        let slot = self.slots.get(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.item.as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: ArenaKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.item.as_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Vacate every slot. Slots are kept so earlier keys stay stale.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.item.take().is_some() {
                slot.generation += 1;
            }
            self.free.push(index);
        }
        self.len = 0;
    }
}
