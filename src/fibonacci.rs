//! Fibonacci Heap implementation
//!
//! A Fibonacci heap is a data structure for priority queue operations with:
//! - O(1) amortized insert, decrease_key, and merge
//! - O(log n) amortized extract_min
//!
//! The structure consists of a collection of heap-ordered trees. Roots are linked
//! in a circular doubly linked list, and so are the children of every node. The
//! heap keeps a pointer to the minimum root.
//!
//! # Algorithm Overview
//!
//! - **Insert**: splice a singleton root into the root ring
//! - **Merge**: splice two root rings together, keep the smaller minimum
//! - **Extract-min**: promote the minimum's children to roots, then consolidate
//!   so that no two roots share a degree
//! - **Decrease-key**: cut the node if it now beats its parent, then cascade:
//!   every marked ancestor is cut too, the first unmarked one is marked
//!
//! The potential `trees + 2 · marked` pays for the cascading cuts, and the
//! marking rule keeps a degree-k subtree at least `F(k+2)` nodes large, which
//! bounds every degree by O(log n).
//!
//! # Representation
//!
//! Nodes live in `Rc<RefCell<_>>` cells. A ring owns its members through the
//! strong `next` links of [`rc_ring`]; a parent owns its child ring through
//! `child`; parent and `prev` links are weak. Handles are weak references, so a
//! handle whose element was extracted is reported as
//! [`HeapError::InvalidHandle`] instead of dangling.

use crate::owner::Owner;
use crate::rank::{checked_increment, saturating_decrement, Rank};
use crate::traits::{Handle, Heap, HeapError};
use rc_ring::{Linked, RingLink};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type NodeRef<T, P> = Rc<RefCell<Node<T, P>>>;
type WeakNodeRef<T, P> = Weak<RefCell<Node<T, P>>>;

/// Handle to an element in a Fibonacci heap
pub struct FibonacciHandle<T, P> {
    node: WeakNodeRef<T, P>,
}

impl<T, P> Clone for FibonacciHandle<T, P> {
    fn clone(&self) -> Self {
        FibonacciHandle {
            node: Weak::clone(&self.node),
        }
    }
}

impl<T, P> PartialEq for FibonacciHandle<T, P> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.node, &other.node)
    }
}

impl<T, P> Eq for FibonacciHandle<T, P> {}

impl<T, P> fmt::Debug for FibonacciHandle<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibonacciHandle")
            .field("node", &self.node.as_ptr())
            .finish()
    }
}

impl<T, P> Handle for FibonacciHandle<T, P> {}

struct Node<T, P> {
    item: T,
    priority: P,
    owner: Owner,
    parent: WeakNodeRef<T, P>,
    /// Any one child; the rest are reached through its sibling ring
    child: Option<NodeRef<T, P>>,
    siblings: RingLink<Node<T, P>>,
    degree: Rank,
    /// Lost a child since it last became a child
    marked: bool,
}

impl<T, P> Linked for Node<T, P> {
    fn link(&self) -> &RingLink<Self> {
        &self.siblings
    }

    fn link_mut(&mut self) -> &mut RingLink<Self> {
        &mut self.siblings
    }
}

/// Fibonacci Heap
///
/// # Example
///
/// ```rust
/// use meldable_heaps::fibonacci::FibonacciHeap;
/// use meldable_heaps::Heap;
///
/// let mut heap = FibonacciHeap::new();
/// let handle = heap.insert(5, "item");
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.find_min(), Ok((&1, &"item")));
/// ```
pub struct FibonacciHeap<T, P> {
    /// Minimum root; also the entry point into the root ring
    min: Option<NodeRef<T, P>>,
    len: usize,
    owner: Owner,
}

impl<T, P> Drop for FibonacciHeap<T, P> {
    fn drop(&mut self) {
        // Dissolve every ring iteratively so that neither reference cycles
        // nor deep recursive drops survive the heap.
        let Some(min) = self.min.take() else {
            return;
        };
        let mut pending = rc_ring::drain(&min);
        while let Some(node) = pending.pop() {
            let child = node.borrow_mut().child.take();
            if let Some(child) = child {
                pending.extend(rc_ring::drain(&child));
            }
        }
    }
}

impl<T, P: Ord> Default for FibonacciHeap<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> fmt::Debug for FibonacciHeap<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibonacciHeap").field("len", &self.len).finish()
    }
}

impl<T, P: Ord> Heap<T, P> for FibonacciHeap<T, P> {
    type Handle = FibonacciHandle<T, P>;

    fn new() -> Self {
        Self {
            min: None,
            len: 0,
            owner: Owner::new(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert(&mut self, priority: P, item: T) -> Self::Handle {
        let node = Rc::new(RefCell::new(Node {
            item,
            priority,
            owner: self.owner.clone(),
            parent: Weak::new(),
            child: None,
            siblings: RingLink::new(),
            degree: 0,
            marked: false,
        }));
        let handle = FibonacciHandle {
            node: Rc::downgrade(&node),
        };

        self.add_root(node);
        self.len += 1;
        handle
    }

    fn find_min(&self) -> Result<(&P, &T), HeapError> {
        let min = self.min.as_ref().ok_or(HeapError::EmptyHeap)?;
        // SAFETY: The node is kept alive by `self.min` for the lifetime of
        // `&self`. Every `borrow_mut` in this module is confined to a method
        // taking `&mut self` of the heap that owns the node: `decrease_key`
        // rejects handles whose owner token does not resolve to `self`. So no
        // mutable borrow can exist while the returned references do.
        let node = unsafe { &*min.as_ptr() };
        Ok((&node.priority, &node.item))
    }

    fn extract_min(&mut self) -> Result<(P, T), HeapError> {
        let min = self.min.take().ok_or(HeapError::EmptyHeap)?;

        // Children become roots: clear their parent link and mark, then splice
        // their whole ring into the root ring next to the old minimum.
        let first_child = min.borrow_mut().child.take();
        if let Some(first_child) = first_child {
            rc_ring::for_each(&first_child, |child| {
                let mut child = child.borrow_mut();
                child.parent = Weak::new();
                child.marked = false;
            });
            rc_ring::splice(Some(Rc::clone(&min)), Some(first_child));
        }

        let survivor = rc_ring::remove(&min);
        self.len -= 1;
        if let Some(start) = survivor {
            self.consolidate(start);
        }

        let node = Rc::try_unwrap(min)
            .ok()
            .expect("extracted node is unlinked from every ring")
            .into_inner();
        Ok((node.priority, node.item))
    }

    fn decrease_key(&mut self, handle: &Self::Handle, new_priority: P) -> Result<(), HeapError> {
        let node = handle.node.upgrade().ok_or(HeapError::InvalidHandle)?;
        if !self.owner.owns(&node.borrow().owner) {
            return Err(HeapError::InvalidHandle);
        }

        if new_priority >= node.borrow().priority {
            return Err(HeapError::InvalidDecreaseKey);
        }
        node.borrow_mut().priority = new_priority;

        let parent = node.borrow().parent.upgrade();
        match parent {
            Some(parent) => {
                // Heap order only breaks if the node now beats its parent
                let violated = node.borrow().priority < parent.borrow().priority;
                if violated {
                    self.cut(&node, &parent);
                    self.cascading_cut(parent);
                }
            }
            None => self.update_min(&node),
        }
        Ok(())
    }

    fn merge(mut self, mut other: Self) -> Self {
        self.owner.absorb(&other.owner);
        let Some(other_min) = other.min.take() else {
            return self;
        };
        self.len += std::mem::take(&mut other.len);

        self.min = match self.min.take() {
            None => Some(other_min),
            Some(min) => {
                rc_ring::splice(Some(Rc::clone(&min)), Some(Rc::clone(&other_min)));
                if other_min.borrow().priority < min.borrow().priority {
                    Some(other_min)
                } else {
                    Some(min)
                }
            }
        };
        self
    }
}

impl<T, P: Ord> FibonacciHeap<T, P> {
    /// Adds a detached node (unlinked or alone in its ring) to the root ring
    fn add_root(&mut self, node: NodeRef<T, P>) {
        let Some(min) = self.min.clone() else {
            rc_ring::make_circular(&node);
            self.min = Some(node);
            return;
        };

        rc_ring::insert_before(&min, &node);
        if node.borrow().priority < min.borrow().priority {
            self.min = Some(node);
        }
    }

    fn update_min(&mut self, node: &NodeRef<T, P>) {
        let smaller = match &self.min {
            Some(min) => node.borrow().priority < min.borrow().priority,
            None => true,
        };
        if smaller {
            self.min = Some(Rc::clone(node));
        }
    }

    /// Links trees of equal degree until every degree occurs at most once,
    /// then rebuilds the root ring and finds the new minimum
    fn consolidate(&mut self, start: NodeRef<T, P>) {
        let roots = rc_ring::drain(&start);
        let before = roots.len();

        // Indexed by degree; grows on demand, stays O(log n) long
        let mut by_degree: Vec<Option<NodeRef<T, P>>> = Vec::new();

        for root in roots {
            let mut x = root;
            loop {
                let degree = x.borrow().degree as usize;
                if degree >= by_degree.len() {
                    by_degree.resize(degree + 1, None);
                }
                match by_degree[degree].take() {
                    None => {
                        by_degree[degree] = Some(x);
                        break;
                    }
                    Some(mut y) => {
                        // Ensure x has the smaller priority
                        if y.borrow().priority < x.borrow().priority {
                            std::mem::swap(&mut x, &mut y);
                        }
                        Self::link(&x, y);
                    }
                }
            }
        }

        self.min = None;
        let mut after = 0;
        for root in by_degree.into_iter().flatten() {
            self.add_root(root);
            after += 1;
        }
        log::trace!("fibonacci consolidate: {before} roots -> {after}");
    }

    /// Makes the root `child` a child of the root `parent`
    fn link(parent: &NodeRef<T, P>, child: NodeRef<T, P>) {
        {
            let mut c = child.borrow_mut();
            c.parent = Rc::downgrade(parent);
            c.marked = false;
        }

        let first = parent.borrow().child.clone();
        match first {
            Some(first) => rc_ring::insert_before(&first, &child),
            None => {
                rc_ring::make_circular(&child);
                parent.borrow_mut().child = Some(child);
            }
        }

        let mut p = parent.borrow_mut();
        p.degree = checked_increment(p.degree);
    }

    /// Detaches `node` from `parent` and moves it to the root ring
    fn cut(&mut self, node: &NodeRef<T, P>, parent: &NodeRef<T, P>) {
        let survivor = rc_ring::remove(node);
        {
            let mut p = parent.borrow_mut();
            let was_first = p.child.as_ref().is_some_and(|c| Rc::ptr_eq(c, node));
            if was_first {
                p.child = survivor;
            }
            p.degree = saturating_decrement(p.degree);
        }
        {
            let mut n = node.borrow_mut();
            n.parent = Weak::new();
            n.marked = false;
        }
        self.add_root(Rc::clone(node));
    }

    /// Walks up from `node`, the parent of a freshly cut node: marked
    /// ancestors are cut, the first unmarked non-root ancestor is marked
    fn cascading_cut(&mut self, mut node: NodeRef<T, P>) {
        loop {
            let parent = node.borrow().parent.upgrade();
            // Roots are never marked
            let Some(parent) = parent else {
                break;
            };

            let marked = node.borrow().marked;
            if !marked {
                node.borrow_mut().marked = true;
                break;
            }

            self.cut(&node, &parent);
            node = parent;
        }
    }
}
