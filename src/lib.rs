//! Mergeable Priority Queues for Rust
//!
//! This crate provides heap/priority queue data structures with efficient
//! `decrease_key` and `merge`, the primitives that best-first and
//! shortest-path searches are built on. Every engine implements the same
//! [`Heap`] contract and can stand in for any other.
//!
//! # Features
//!
//! - **Fibonacci Heap**: O(1) amortized insert, decrease_key, and merge; O(log n) amortized extract-min
//! - **Rank-Pairing Heap**: O(1) amortized insert, decrease_key, and merge; O(log n) amortized extract-min
//! - **Quake Heap**: O(1) insert and decrease_key; O(log n) amortized extract-min; heights bounded by seismic rebuilds
//! - **Indexed Binary Heap**: O(log n) insert, decrease_key, and extract-min; the reference engine
//!
//! # Example
//!
//! ```rust
//! use meldable_heaps::fibonacci::FibonacciHeap;
//! use meldable_heaps::Heap;
//!
//! let mut heap = FibonacciHeap::new();
//! let handle1 = heap.insert(5, "item1");
//! let handle2 = heap.insert(3, "item2");
//! heap.decrease_key(&handle1, 1).unwrap();
//! assert_eq!(heap.find_min(), Ok((&1, &"item1")));
//! assert_eq!(heap.decrease_key(&handle2, 4), Err(meldable_heaps::HeapError::InvalidDecreaseKey));
//! ```
//!
//! # Logging
//!
//! The engines emit restructuring events through the [`log`] facade:
//! consolidation passes at `trace` level and quake seismic events at `debug`.

pub mod binary;
pub mod config;
pub mod fibonacci;
mod owner;
pub mod quake;
pub mod rank;
pub mod rank_pairing;
pub mod traits;

// Re-export the main trait for convenience
pub use traits::{Handle, Heap, HeapError};
