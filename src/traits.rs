//! The operation contract shared by every heap engine
//!
//! All engines in this crate are mergeable priority queues with `decrease_key`.
//! They store (priority, item) pairs and order them by priority, smallest first.
//! Each engine can stand in for any other behind [`Heap`]:
//!
//! - `insert` returns a [`Handle`] identifying the stored item
//! - `find_min` / `extract_min` report [`HeapError::EmptyHeap`] on an empty heap
//! - `decrease_key` lowers a resident item's priority in place
//! - `merge` consumes two heaps and returns their union
//!
//! Equal priorities carry no ordering guarantee: either item may come out first.

use std::fmt;
use thiserror::Error;

/// Error type for heap operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// `find_min` or `extract_min` was called on a heap with no elements
    #[error("heap is empty")]
    EmptyHeap,
    /// The new priority is not strictly less than the current priority
    #[error("new priority is not less than current priority")]
    InvalidDecreaseKey,
    /// The handle's element has already been extracted, or it belongs to a
    /// different heap
    #[error("handle is no longer valid (element was removed)")]
    InvalidHandle,
}

/// A handle to an element in the heap, used for `decrease_key`
///
/// Handles are identity-based: two handles are equal only if they refer to
/// the same inserted element, regardless of priorities. A handle stays valid
/// across `merge` and every internal restructuring, until its element is
/// extracted. A handle presented to a heap that does not hold its element
/// (one it was never merged into) is rejected with
/// [`HeapError::InvalidHandle`] and leaves both heaps untouched.
pub trait Handle: Clone + PartialEq + Eq + fmt::Debug {}

/// Mergeable min-priority queue with `decrease_key`
///
/// # Example
///
/// ```rust
/// use meldable_heaps::{Heap, HeapError};
/// use meldable_heaps::fibonacci::FibonacciHeap;
///
/// let mut heap = FibonacciHeap::new();
/// let handle = heap.insert(10, "item");
/// heap.insert(7, "other");
///
/// heap.decrease_key(&handle, 5).unwrap();
/// assert_eq!(heap.find_min(), Ok((&5, &"item")));
/// assert_eq!(heap.decrease_key(&handle, 6), Err(HeapError::InvalidDecreaseKey));
///
/// assert_eq!(heap.extract_min(), Ok((5, "item")));
/// assert_eq!(heap.extract_min(), Ok((7, "other")));
/// assert_eq!(heap.extract_min(), Err(HeapError::EmptyHeap));
/// ```
pub trait Heap<T, P: Ord>: Sized {
    /// The handle type returned by `insert`
    type Handle: Handle;

    /// Creates a new empty heap
    fn new() -> Self;

    /// Returns the number of elements in the heap
    fn len(&self) -> usize;

    /// Returns true if the heap is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts an element with the given priority, returning a handle to it
    ///
    /// # Time Complexity
    /// O(1): amortized for Fibonacci and rank-pairing heaps, worst-case for
    /// the quake heap.
    fn insert(&mut self, priority: P, item: T) -> Self::Handle;

    /// Returns the minimum priority and its item without removing them
    ///
    /// # Errors
    /// [`HeapError::EmptyHeap`] if the heap has no elements.
    fn find_min(&self) -> Result<(&P, &T), HeapError>;

    /// Removes and returns the minimum priority and its item
    ///
    /// # Errors
    /// [`HeapError::EmptyHeap`] if the heap has no elements.
    ///
    /// # Time Complexity
    /// O(log n) amortized.
    fn extract_min(&mut self) -> Result<(P, T), HeapError>;

    /// Lowers the priority of the element identified by `handle`
    ///
    /// # Errors
    /// - [`HeapError::InvalidDecreaseKey`] if `new_priority` is not strictly
    ///   less than the current priority; the heap is left unchanged.
    /// - [`HeapError::InvalidHandle`] if the element was already extracted or
    ///   is held by a different heap.
    ///
    /// # Time Complexity
    /// - Fibonacci heap: O(1) amortized
    /// - Rank-pairing heap: O(1) amortized
    /// - Quake heap: O(1)
    /// - Indexed binary heap: O(log n)
    ///
    /// The ownership check adds a near-constant amortized lookup after
    /// chains of merges.
    fn decrease_key(&mut self, handle: &Self::Handle, new_priority: P) -> Result<(), HeapError>;

    /// Merges two heaps, consuming both
    ///
    /// Handles from either input remain valid in the result.
    ///
    /// # Time Complexity
    /// - Fibonacci heap: O(1)
    /// - Rank-pairing heap: O(1)
    /// - Quake heap: O(log n), for adding up the per-height node counts
    /// - Indexed binary heap: O(m log (n + m)) for the smaller heap's m entries
    fn merge(self, other: Self) -> Self;

    /// Inserts an element, discarding its handle
    fn push(&mut self, priority: P, item: T) {
        let _ = self.insert(priority, item);
    }

    /// Like [`find_min`](Heap::find_min), but `None` when empty
    fn peek(&self) -> Option<(&P, &T)> {
        self.find_min().ok()
    }

    /// Like [`extract_min`](Heap::extract_min), but `None` when empty
    fn pop(&mut self) -> Option<(P, T)> {
        self.extract_min().ok()
    }
}
