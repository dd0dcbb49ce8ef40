//! LRU List Module
//!
//! Recency-ordered list of cache entries stored in an index-addressed arena.

use crate::cache::CacheEntry;

// == Node ==
/// An arena slot holding one entry and its neighbours in recency order.
#[derive(Debug)]
struct Node {
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Doubly linked recency list backed by a `Vec` of slots.
///
/// Links are indices into the arena rather than pointers:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Vacated slots are recycled through a free list, so a slot index stays
/// valid for exactly as long as its entry is in the list.
#[derive(Debug, Default)]
pub struct LruList {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Inserts an entry at the head and returns its slot index.
    pub fn push_front(&mut self, entry: CacheEntry) -> usize {
        let node = Node {
            entry,
            prev: None,
            next: self.head,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
        idx
    }

    // == Move To Front ==
    /// Marks the entry at `idx` as most recently used.
    pub fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);

        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(old_head) => self.node_mut(old_head).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    // == Remove ==
    /// Removes the entry at `idx` and returns it, freeing the slot.
    ///
    /// Returns None if the slot is vacant.
    pub fn remove(&mut self, idx: usize) -> Option<CacheEntry> {
        if self.get(idx).is_none() {
            return None;
        }
        self.unlink(idx);

        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;
        Some(node.entry)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Accessors ==
    /// Returns the entry stored at `idx`.
    pub fn get(&self, idx: usize) -> Option<&CacheEntry> {
        self.slots.get(idx)?.as_ref().map(|node| &node.entry)
    }

    /// Returns a mutable reference to the entry stored at `idx`.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut CacheEntry> {
        self.slots.get_mut(idx)?.as_mut().map(|node| &mut node.entry)
    }

    /// Returns the least recently used entry without removing it.
    #[cfg(test)]
    pub fn back(&self) -> Option<&CacheEntry> {
        self.get(self.tail?)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    // == Internals ==
    /// Detaches the node at `idx` from its neighbours, fixing head and tail.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node_mut(idx);
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match self.slots[idx].as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }
}

// == Iterator ==
/// Front-to-back iterator over an [`LruList`].
pub struct Iter<'a> {
    list: &'a LruList,
    cursor: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CacheEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.slots.get(self.cursor?)?.as_ref()?;
        self.cursor = node.next;
        Some(&node.entry)
    }
}
