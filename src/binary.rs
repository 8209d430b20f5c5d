//! Indexed Binary Heap implementation
//!
//! A plain array binary min-heap whose entries know their own position.
//! Every entry shares a position cell with its handle, and every sift keeps
//! the cells current, so `decrease_key` finds its entry in O(1) and sifts it
//! up in O(log n) instead of searching the array.
//!
//! This is the reference engine: its behavior is easy to trust, which makes
//! it the oracle the other engines are compared against.
//!
//! # Time Complexity
//!
//! | Operation      | Complexity       |
//! |----------------|------------------|
//! | `insert`       | O(log n)         |
//! | `extract_min`  | O(log n)         |
//! | `find_min`     | O(1)             |
//! | `decrease_key` | O(log n)         |
//! | `merge`        | O(m log (n + m)) |
//!
//! # Example
//!
//! ```rust
//! use meldable_heaps::Heap;
//! use meldable_heaps::binary::IndexedBinaryHeap;
//!
//! let mut heap = IndexedBinaryHeap::new();
//! heap.push(3, "three");
//! let one = heap.insert(4, "one");
//! heap.push(2, "two");
//! heap.decrease_key(&one, 1).unwrap();
//!
//! assert_eq!(heap.peek(), Some((&1, &"one")));
//! assert_eq!(heap.pop(), Some((1, "one")));
//! assert_eq!(heap.pop(), Some((2, "two")));
//! assert_eq!(heap.pop(), Some((3, "three")));
//! assert_eq!(heap.pop(), None);
//! ```

use crate::traits::{Handle, Heap, HeapError};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Current array index of an entry, or `None` once it has been extracted
type Position = Rc<Cell<Option<usize>>>;

/// Handle to an element in an indexed binary heap
#[derive(Clone)]
pub struct IndexedHandle {
    position: Position,
}

impl PartialEq for IndexedHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.position, &other.position)
    }
}

impl Eq for IndexedHandle {}

impl fmt::Debug for IndexedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedHandle")
            .field("position", &self.position.get())
            .finish()
    }
}

impl Handle for IndexedHandle {}

struct Entry<T, P> {
    priority: P,
    item: T,
    position: Position,
}

/// A binary min-heap with position-tracking handles
pub struct IndexedBinaryHeap<T, P> {
    data: Vec<Entry<T, P>>,
}

impl<T, P: fmt::Debug> fmt::Debug for IndexedBinaryHeap<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedBinaryHeap")
            .field("len", &self.data.len())
            .field("min", &self.data.first().map(|e| &e.priority))
            .finish()
    }
}

impl<T, P: Ord> Default for IndexedBinaryHeap<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P: Ord> Heap<T, P> for IndexedBinaryHeap<T, P> {
    type Handle = IndexedHandle;

    fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn insert(&mut self, priority: P, item: T) -> Self::Handle {
        let position = Rc::new(Cell::new(None));
        self.push_entry(Entry {
            priority,
            item,
            position: Rc::clone(&position),
        });
        IndexedHandle { position }
    }

    fn find_min(&self) -> Result<(&P, &T), HeapError> {
        self.data
            .first()
            .map(|e| (&e.priority, &e.item))
            .ok_or(HeapError::EmptyHeap)
    }

    fn extract_min(&mut self) -> Result<(P, T), HeapError> {
        if self.data.is_empty() {
            return Err(HeapError::EmptyHeap);
        }

        let last = self.data.len() - 1;
        self.swap(0, last);
        let entry = self.data.pop().ok_or(HeapError::EmptyHeap)?;
        entry.position.set(None);

        if !self.data.is_empty() {
            self.sift_down(0);
        }
        Ok((entry.priority, entry.item))
    }

    fn decrease_key(&mut self, handle: &Self::Handle, new_priority: P) -> Result<(), HeapError> {
        let index = handle.position.get().ok_or(HeapError::InvalidHandle)?;
        let entry = self
            .data
            .get_mut(index)
            .filter(|e| Rc::ptr_eq(&e.position, &handle.position))
            .ok_or(HeapError::InvalidHandle)?;

        if new_priority >= entry.priority {
            return Err(HeapError::InvalidDecreaseKey);
        }
        entry.priority = new_priority;
        self.sift_up(index);
        Ok(())
    }

    fn merge(mut self, other: Self) -> Self {
        if self.data.len() < other.data.len() {
            return other.merge(self);
        }
        // Entries keep their position cells, so donor handles stay valid
        for entry in other.data {
            self.push_entry(entry);
        }
        self
    }
}

impl<T, P: Ord> IndexedBinaryHeap<T, P> {
    fn push_entry(&mut self, entry: Entry<T, P>) {
        let index = self.data.len();
        entry.position.set(Some(index));
        self.data.push(entry);
        self.sift_up(index);
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.data.swap(a, b);
        self.data[a].position.set(Some(a));
        self.data[b].position.set(Some(b));
    }

    /// Move element at index up to maintain heap property
    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.data[index].priority < self.data[parent].priority {
                self.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    /// Move element at index down to maintain heap property
    fn sift_down(&mut self, mut index: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut smallest = index;

            if left < len && self.data[left].priority < self.data[smallest].priority {
                smallest = left;
            }
            if right < len && self.data[right].priority < self.data[smallest].priority {
                smallest = right;
            }

            if smallest != index {
                self.swap(index, smallest);
                index = smallest;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl<T, P: Ord> IndexedBinaryHeap<T, P> {
        fn assert_valid(&self) {
            for (i, entry) in self.data.iter().enumerate() {
                assert_eq!(entry.position.get(), Some(i));
                if i > 0 {
                    assert!(self.data[(i - 1) / 2].priority <= entry.priority);
                }
            }
        }
    }

    #[test]
    fn test_basic_operations() {
        let mut heap = IndexedBinaryHeap::new();

        assert!(heap.is_empty());
        assert_eq!(heap.find_min(), Err(HeapError::EmptyHeap));

        heap.push(3, "three");
        heap.push(1, "one");
        heap.push(2, "two");

        assert_eq!(heap.len(), 3);
        assert_eq!(heap.peek(), Some((&1, &"one")));
        heap.assert_valid();

        assert_eq!(heap.pop(), Some((1, "one")));
        assert_eq!(heap.pop(), Some((2, "two")));
        assert_eq!(heap.pop(), Some((3, "three")));
        assert_eq!(heap.extract_min(), Err(HeapError::EmptyHeap));
    }

    #[test]
    fn test_decrease_key_tracks_positions() {
        let mut heap = IndexedBinaryHeap::new();
        let handles: Vec<_> = (0..50).map(|i| heap.insert(100 + i, i)).collect();

        for (i, h) in handles.iter().enumerate().rev() {
            heap.decrease_key(h, i as i32).unwrap();
            heap.assert_valid();
        }
        for i in 0..50 {
            assert_eq!(heap.extract_min(), Ok((i, i)));
            heap.assert_valid();
        }
    }

    #[test]
    fn test_stale_handle() {
        let mut heap = IndexedBinaryHeap::new();
        let h = heap.insert(1, "gone");
        heap.insert(2, "stays");
        heap.extract_min().unwrap();
        assert_eq!(heap.decrease_key(&h, 0), Err(HeapError::InvalidHandle));
        assert_eq!(heap.decrease_key(&h, 5), Err(HeapError::InvalidHandle));
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut heap1 = IndexedBinaryHeap::new();
        let mut heap2 = IndexedBinaryHeap::new();
        heap1.insert(1, ());
        let foreign = heap2.insert(5, ());
        assert_eq!(heap1.decrease_key(&foreign, 0), Err(HeapError::InvalidHandle));
    }

    #[test]
    fn test_merge_keeps_donor_handles() {
        let mut heap1 = IndexedBinaryHeap::new();
        heap1.insert(3, "three");
        heap1.insert(1, "one");

        let mut heap2 = IndexedBinaryHeap::new();
        heap2.insert(4, "four");
        let h = heap2.insert(2, "two");

        let mut merged = heap1.merge(heap2);
        assert_eq!(merged.len(), 4);
        merged.decrease_key(&h, 0).unwrap();
        merged.assert_valid();

        assert_eq!(merged.pop(), Some((0, "two")));
        assert_eq!(merged.pop(), Some((1, "one")));
        assert_eq!(merged.pop(), Some((3, "three")));
        assert_eq!(merged.pop(), Some((4, "four")));
    }
}
