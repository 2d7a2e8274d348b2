// Entry arena - slab-backed storage for registry entries
//
// Each live registration owns exactly one slot in the slab. Slots are linked
// into a doubly-linked sequence through `prev`/`next` keys, so the sequence
// order is registration order while the storage itself is a flat, reusable
// pool. Removing an entry unlinks it and hands its slot back to the slab's
// free list; the next registration reuses it without allocating.
//
// The slab grows by doubling its backing Vec when the free list is empty.

use slab::Slab;

use crate::listener::Listener;

/// Identifier for an entry in an [`EntryList`].
///
/// A zero-cost wrapper around a slab key. Once the entry is unlinked the key
/// may be handed out again to a later registration, so holders must drop an
/// `EntryId` when the entry it names is removed.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EntryId(u32);

impl EntryId {
    fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Convert to usize for slab indexing
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One registration: the listener plus its links in the sequence.
#[derive(Debug)]
pub struct Entry {
    pub(crate) listener: Listener,
    prev: Option<EntryId>,
    next: Option<EntryId>,
}

/// Ordered sequence of entries stored in a slab.
#[derive(Debug)]
pub struct EntryList {
    slots: Slab<Entry>,
    head: Option<EntryId>,
    tail: Option<EntryId>,
}

impl EntryList {
    /// Create an empty list with room for `capacity` entries before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of entries the pool holds before it has to grow.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn first(&self) -> Option<EntryId> {
        self.head
    }

    pub fn last(&self) -> Option<EntryId> {
        self.tail
    }

    /// Successor of `id`, or None if `id` is the last entry or not live.
    pub fn next(&self, id: EntryId) -> Option<EntryId> {
        self.slots.get(id.index()).and_then(|entry| entry.next)
    }

    /// Predecessor of `id`, or None if `id` is the first entry or not live.
    pub fn prev(&self, id: EntryId) -> Option<EntryId> {
        self.slots.get(id.index()).and_then(|entry| entry.prev)
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.slots.get(id.index())
    }

    /// Append a new entry after the current tail.
    pub fn push_back(&mut self, listener: Listener) -> EntryId {
        if self.slots.len() == self.slots.capacity() {
            // Keep growth geometric even for a zero-capacity start.
            self.slots.reserve(self.slots.capacity().max(1));
        }
        let slot = self.slots.vacant_entry();
        let id = EntryId::new(slot.key());
        slot.insert(Entry {
            listener,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.slots[tail.index()].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// First entry, in sequence order, whose listener matches `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&Listener) -> bool) -> Option<EntryId> {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let entry = &self.slots[id.index()];
            if predicate(&entry.listener) {
                return Some(id);
            }
            cursor = entry.next;
        }
        None
    }

    /// Unlink `id` and release its slot. Returns the removed entry.
    pub fn unlink(&mut self, id: EntryId) -> Option<Entry> {
        let entry = self.slots.try_remove(id.index())?;

        match entry.prev {
            Some(prev) => self.slots[prev.index()].next = entry.next,
            None => self.head = entry.next,
        }
        match entry.next {
            Some(next) => self.slots[next.index()].prev = entry.prev,
            None => self.tail = entry.prev,
        }
        Some(entry)
    }
}
