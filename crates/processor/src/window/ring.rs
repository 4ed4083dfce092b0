//! Fixed-capacity trailing window

use std::mem;

/// Ring buffer retaining the last `capacity` items pushed.
///
/// Slots are allocated on demand up to `capacity`, so a large capacity over a
/// short stream costs only what the stream holds. Once full, every push
/// overwrites the oldest slot in place.
#[derive(Debug, Clone)]
pub struct TrailingWindow<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Index of the oldest item once the window is full
    head: usize,
}

impl<T> TrailingWindow<T> {
    /// Create a window keeping at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            head: 0,
        }
    }

    /// Push an item, returning the evicted oldest item when full.
    ///
    /// With capacity 0 the pushed item itself is returned immediately.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        if self.slots.len() < self.capacity {
            self.slots.push(item);
            return None;
        }

        let evicted = mem::replace(&mut self.slots[self.head], item);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Drain the window into a vector ordered oldest to newest
    pub fn into_vec(self) -> Vec<T> {
        let mut slots = self.slots;
        slots.rotate_left(self.head);
        slots
    }

    /// Drop every retained item
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}
