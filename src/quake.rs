//! Quake Heap implementation
//!
//! A quake heap is a forest of tournament trees:
//! - O(1) worst-case insert and merge-free decrease_key
//! - O(log n) amortized extract_min
//!
//! Every element ("vertex") enters as a leaf at height 0. Linking two trees of
//! equal height creates a new root one level up that repeats, or *clones*, the
//! smaller of the two root vertices, so a vertex appears as a path of clones
//! from its leaf up to its *highest clone*. Every internal node holds the
//! minimum of its subtree, so each tree root holds its tree's minimum.
//!
//! # Algorithm Overview
//!
//! - **Insert**: add a single leaf as a new tree
//! - **Merge**: splice the forests together and add up the level counts
//! - **Decrease-key**: update the shared vertex record, which every clone reads
//!   through, then cut the vertex's highest clone out of its tree
//! - **Extract-min**: delete the minimum's clone path, turning each sibling
//!   along it into a tree of its own, then link trees of equal height
//!
//! # Seismic Events
//!
//! Cuts leave trees sparse, which would let heights grow without bound. The
//! heap counts tournament nodes per height and, after every extraction,
//! requires `count[l + 1] <= α · count[l]` at every level (see
//! [`QuakeConfig`]). When some level breaks the ratio, every node above the
//! lowest violating level is discarded, the nodes at that level become roots,
//! and the forest is relinked. This keeps every height within
//! `log_{1/α} n`.

use crate::config::QuakeConfig;
use crate::owner::Owner;
use crate::rank::{checked_increment, Rank};
use crate::traits::{Handle, Heap, HeapError};
use rc_ring::{Linked, RingLink};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type VertexRef<T, P> = Rc<RefCell<Vertex<T, P>>>;
type NodeRef<T, P> = Rc<RefCell<TournamentNode<T, P>>>;
type WeakNodeRef<T, P> = Weak<RefCell<TournamentNode<T, P>>>;

/// Handle to an element in a quake heap
pub struct QuakeHandle<T, P> {
    vertex: Weak<RefCell<Vertex<T, P>>>,
}

impl<T, P> Clone for QuakeHandle<T, P> {
    fn clone(&self) -> Self {
        QuakeHandle {
            vertex: Weak::clone(&self.vertex),
        }
    }
}

impl<T, P> PartialEq for QuakeHandle<T, P> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.vertex, &other.vertex)
    }
}

impl<T, P> Eq for QuakeHandle<T, P> {}

impl<T, P> fmt::Debug for QuakeHandle<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuakeHandle")
            .field("vertex", &self.vertex.as_ptr())
            .finish()
    }
}

impl<T, P> Handle for QuakeHandle<T, P> {}

/// The element record shared by all of its clones
///
/// The vertex is owned by its clones; it is freed together with the last one.
struct Vertex<T, P> {
    item: T,
    priority: P,
    owner: Owner,
    /// Topmost clone; always a live node while the vertex is resident
    highest: WeakNodeRef<T, P>,
    /// The height-0 clone
    leaf: WeakNodeRef<T, P>,
}

struct TournamentNode<T, P> {
    vertex: VertexRef<T, P>,
    height: Rank,
    parent: WeakNodeRef<T, P>,
    left: Option<NodeRef<T, P>>,
    right: Option<NodeRef<T, P>>,
    /// Membership in the forest ring; only roots are linked
    forest: RingLink<TournamentNode<T, P>>,
}

impl<T, P> Linked for TournamentNode<T, P> {
    fn link(&self) -> &RingLink<Self> {
        &self.forest
    }

    fn link_mut(&mut self) -> &mut RingLink<Self> {
        &mut self.forest
    }
}

impl<T, P> TournamentNode<T, P> {
    fn new(vertex: VertexRef<T, P>, height: Rank) -> NodeRef<T, P> {
        Rc::new(RefCell::new(TournamentNode {
            vertex,
            height,
            parent: Weak::new(),
            left: None,
            right: None,
            forest: RingLink::new(),
        }))
    }
}

fn key_less<T, P: Ord>(a: &NodeRef<T, P>, b: &NodeRef<T, P>) -> bool {
    a.borrow().vertex.borrow().priority < b.borrow().vertex.borrow().priority
}

/// Quake Heap
///
/// # Example
///
/// ```rust
/// use meldable_heaps::config::QuakeConfig;
/// use meldable_heaps::quake::QuakeHeap;
/// use meldable_heaps::Heap;
///
/// let mut heap = QuakeHeap::with_config(QuakeConfig::new(0.5).unwrap());
/// let handle = heap.insert(5, "item");
/// heap.insert(7, "other");
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.find_min(), Ok((&1, &"item")));
/// assert_eq!(heap.level_counts(), &[2]);
/// ```
pub struct QuakeHeap<T, P> {
    /// Root holding the minimum; also the entry point into the forest ring
    min: Option<NodeRef<T, P>>,
    /// Tournament nodes per height; `counts[0]` is the number of elements
    counts: Vec<usize>,
    config: QuakeConfig,
    owner: Owner,
}

impl<T, P> Drop for QuakeHeap<T, P> {
    fn drop(&mut self) {
        let Some(min) = self.min.take() else {
            return;
        };
        let mut pending = rc_ring::drain(&min);
        while let Some(node) = pending.pop() {
            let mut n = node.borrow_mut();
            pending.extend(n.left.take());
            pending.extend(n.right.take());
        }
    }
}

impl<T, P: Ord> Default for QuakeHeap<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> fmt::Debug for QuakeHeap<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuakeHeap")
            .field("counts", &self.counts)
            .field("alpha", &self.config.alpha())
            .finish()
    }
}

impl<T, P: Ord> Heap<T, P> for QuakeHeap<T, P> {
    type Handle = QuakeHandle<T, P>;

    fn new() -> Self {
        Self::with_config(QuakeConfig::default())
    }

    fn len(&self) -> usize {
        self.counts.first().copied().unwrap_or(0)
    }

    fn insert(&mut self, priority: P, item: T) -> Self::Handle {
        let vertex = Rc::new(RefCell::new(Vertex {
            item,
            priority,
            owner: self.owner.clone(),
            highest: Weak::new(),
            leaf: Weak::new(),
        }));
        let leaf = TournamentNode::new(Rc::clone(&vertex), 0);
        {
            let mut v = vertex.borrow_mut();
            v.highest = Rc::downgrade(&leaf);
            v.leaf = Rc::downgrade(&leaf);
        }

        self.count_node(0);
        self.add_tree(leaf);
        QuakeHandle {
            vertex: Rc::downgrade(&vertex),
        }
    }

    fn find_min(&self) -> Result<(&P, &T), HeapError> {
        let min = self.min.as_ref().ok_or(HeapError::EmptyHeap)?;
        // SAFETY: `self.min` keeps the root alive, and the root keeps its
        // vertex alive, for the lifetime of `&self`. Nodes and vertices are
        // only mutably borrowed from methods taking `&mut self` of their
        // owning heap; foreign handles fail the owner check.
        let vertex = unsafe { &*(*min.as_ptr()).vertex.as_ptr() };
        Ok((&vertex.priority, &vertex.item))
    }

    fn extract_min(&mut self) -> Result<(P, T), HeapError> {
        let root = self.min.take().ok_or(HeapError::EmptyHeap)?;
        let survivor = rc_ring::remove(&root);

        let vertex = Rc::clone(&root.borrow().vertex);
        let leaf = vertex.borrow().leaf.upgrade();
        let mut current = leaf.expect("resident vertex has a leaf");

        // Delete the clone path bottom-up; each sibling becomes its own tree
        let mut orphans = Vec::new();
        loop {
            let (height, parent) = {
                let c = current.borrow();
                (c.height as usize, c.parent.upgrade())
            };
            self.counts[height] -= 1;

            let Some(parent) = parent else {
                break;
            };
            let (left, right) = {
                let mut p = parent.borrow_mut();
                (p.left.take(), p.right.take())
            };
            for child in [left, right].into_iter().flatten() {
                if !Rc::ptr_eq(&child, &current) {
                    child.borrow_mut().parent = Weak::new();
                    orphans.push(child);
                }
            }
            current = parent;
        }
        debug_assert!(Rc::ptr_eq(&current, &root), "clone path ends at the root");
        drop(current);
        drop(root);

        let vertex = Rc::try_unwrap(vertex)
            .ok()
            .expect("extracted vertex outlives all of its clones")
            .into_inner();

        self.merge_phase(survivor, orphans);
        while let Some(level) = self.violated_level() {
            self.seismic_event(level);
        }
        while self.counts.len() > 1 && self.counts.last() == Some(&0) {
            self.counts.pop();
        }

        Ok((vertex.priority, vertex.item))
    }

    fn decrease_key(&mut self, handle: &Self::Handle, new_priority: P) -> Result<(), HeapError> {
        let vertex = handle.vertex.upgrade().ok_or(HeapError::InvalidHandle)?;
        if !self.owner.owns(&vertex.borrow().owner) {
            return Err(HeapError::InvalidHandle);
        }

        if new_priority >= vertex.borrow().priority {
            return Err(HeapError::InvalidDecreaseKey);
        }
        vertex.borrow_mut().priority = new_priority;

        let highest = vertex.borrow().highest.upgrade();
        let highest = highest.expect("resident vertex has a highest clone");
        let parent = highest.borrow().parent.upgrade();
        match parent {
            None => self.update_min(&highest),
            Some(parent) => {
                {
                    let mut p = parent.borrow_mut();
                    let was_left = p.left.as_ref().is_some_and(|l| Rc::ptr_eq(l, &highest));
                    if was_left {
                        p.left = None;
                    } else {
                        p.right = None;
                    }
                }
                highest.borrow_mut().parent = Weak::new();
                self.add_tree(highest);
            }
        }
        Ok(())
    }

    fn merge(mut self, mut other: Self) -> Self {
        self.owner.absorb(&other.owner);
        let Some(other_min) = other.min.take() else {
            return self;
        };

        // Add the shorter count vector into the longer one
        let mut counts = std::mem::take(&mut other.counts);
        if counts.len() > self.counts.len() {
            std::mem::swap(&mut self.counts, &mut counts);
        }
        for (mine, theirs) in self.counts.iter_mut().zip(counts) {
            *mine += theirs;
        }

        self.min = match self.min.take() {
            None => Some(other_min),
            Some(min) => {
                rc_ring::splice(Some(Rc::clone(&min)), Some(Rc::clone(&other_min)));
                if key_less(&other_min, &min) {
                    Some(other_min)
                } else {
                    Some(min)
                }
            }
        };
        self
    }
}

impl<T, P: Ord> QuakeHeap<T, P> {
    /// Creates an empty heap with the given level ratio
    pub fn with_config(config: QuakeConfig) -> Self {
        Self {
            min: None,
            counts: vec![0],
            config,
            owner: Owner::new(),
        }
    }

    /// Returns the configuration this heap was created with
    pub fn config(&self) -> &QuakeConfig {
        &self.config
    }

    /// Returns the number of tournament nodes at each height, starting at 0
    ///
    /// The first entry is the number of elements. After every `extract_min`,
    /// each entry is at most α times the one before it.
    pub fn level_counts(&self) -> &[usize] {
        &self.counts
    }

    fn count_node(&mut self, height: usize) {
        if height >= self.counts.len() {
            self.counts.resize(height + 1, 0);
        }
        self.counts[height] += 1;
    }

    /// Adds a detached tree root to the forest ring
    fn add_tree(&mut self, root: NodeRef<T, P>) {
        let Some(min) = self.min.clone() else {
            rc_ring::make_circular(&root);
            self.min = Some(root);
            return;
        };

        rc_ring::insert_before(&min, &root);
        if key_less(&root, &min) {
            self.min = Some(root);
        }
    }

    fn update_min(&mut self, root: &NodeRef<T, P>) {
        let smaller = match &self.min {
            Some(min) => key_less(root, min),
            None => true,
        };
        if smaller {
            self.min = Some(Rc::clone(root));
        }
    }

    /// Links two roots of equal height under a new clone of the smaller
    /// vertex. Ties go to `a`.
    fn link(&mut self, a: NodeRef<T, P>, b: NodeRef<T, P>) -> NodeRef<T, P> {
        let winner = if key_less(&b, &a) { &b } else { &a };
        let vertex = Rc::clone(&winner.borrow().vertex);
        let height = checked_increment(a.borrow().height);

        let parent = TournamentNode::new(Rc::clone(&vertex), height);
        a.borrow_mut().parent = Rc::downgrade(&parent);
        b.borrow_mut().parent = Rc::downgrade(&parent);
        {
            let mut p = parent.borrow_mut();
            p.left = Some(a);
            p.right = Some(b);
        }
        vertex.borrow_mut().highest = Rc::downgrade(&parent);

        self.count_node(height as usize);
        parent
    }

    /// Dissolves the forest ring, adds `extra` trees and links trees of
    /// equal height until every height occurs at most once
    fn merge_phase(&mut self, start: Option<NodeRef<T, P>>, extra: Vec<NodeRef<T, P>>) {
        let mut trees = start.map(|s| rc_ring::drain(&s)).unwrap_or_default();
        trees.extend(extra);
        let before = trees.len();

        let mut by_height: Vec<Option<NodeRef<T, P>>> = Vec::new();
        for tree in trees {
            let mut x = tree;
            loop {
                let height = x.borrow().height as usize;
                if height >= by_height.len() {
                    by_height.resize(height + 1, None);
                }
                match by_height[height].take() {
                    None => {
                        by_height[height] = Some(x);
                        break;
                    }
                    Some(y) => x = self.link(y, x),
                }
            }
        }

        self.min = None;
        let mut after = 0;
        for root in by_height.into_iter().flatten() {
            self.add_tree(root);
            after += 1;
        }
        log::trace!("quake merge phase: {before} trees -> {after}");
    }

    /// Lowest level `l` where `count[l + 1]` exceeds `α · count[l]`
    fn violated_level(&self) -> Option<usize> {
        self.counts
            .windows(2)
            .position(|pair| self.config.violated_by(pair[1], pair[0]))
    }

    /// Discards every node above `level`, makes the nodes at `level` roots and
    /// relinks the forest
    fn seismic_event(&mut self, level: usize) {
        let Some(min) = self.min.take() else {
            return;
        };
        let roots = rc_ring::drain(&min);
        drop(min);

        let mut trees = Vec::new();
        let mut above = Vec::new();
        for root in roots {
            if root.borrow().height as usize <= level {
                trees.push(root);
            } else {
                above.push(root);
            }
        }

        let mut discarded = 0usize;
        while let Some(node) = above.pop() {
            let height = node.borrow().height as usize;
            if height == level {
                node.borrow_mut().parent = Weak::new();
                node.borrow().vertex.borrow_mut().highest = Rc::downgrade(&node);
                trees.push(node);
            } else {
                let (left, right) = {
                    let mut n = node.borrow_mut();
                    (n.left.take(), n.right.take())
                };
                above.extend(left);
                above.extend(right);
                discarded += 1;
            }
        }

        log::debug!(
            "quake seismic event at level {level}: discarded {discarded} nodes, {} trees, counts {:?}",
            trees.len(),
            self.counts
        );
        self.counts.truncate(level + 1);
        self.merge_phase(None, trees);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl<T, P: Ord + fmt::Debug> QuakeHeap<T, P> {
        /// Checks tournament order, heights, clone paths and level counts
        fn assert_valid(&self) {
            let mut counted = vec![0usize; self.counts.len()];
            let Some(min) = &self.min else {
                assert_eq!(self.len(), 0);
                return;
            };

            let mut pending = Vec::new();
            for root in rc_ring::collect(min) {
                assert!(!key_less(&root, min), "min is not minimal");
                let r = root.borrow();
                assert!(r.parent.upgrade().is_none(), "forest root has a parent");
                let highest = r.vertex.borrow().highest.upgrade();
                assert!(highest.is_some_and(|h| Rc::ptr_eq(&h, &root)));
                drop(r);
                pending.push(root);
            }

            while let Some(node) = pending.pop() {
                let n = node.borrow();
                counted[n.height as usize] += 1;
                if n.height == 0 {
                    let leaf = n.vertex.borrow().leaf.upgrade();
                    assert!(leaf.is_some_and(|l| Rc::ptr_eq(&l, &node)));
                }

                let mut same_vertex = 0;
                for child in [&n.left, &n.right].into_iter().flatten() {
                    let c = child.borrow();
                    assert_eq!(c.height + 1, n.height, "child height");
                    assert!(c.parent.upgrade().is_some_and(|p| Rc::ptr_eq(&p, &node)));
                    assert!(c.vertex.borrow().priority >= n.vertex.borrow().priority);
                    if Rc::ptr_eq(&c.vertex, &n.vertex) {
                        same_vertex += 1;
                    }
                    drop(c);
                    pending.push(Rc::clone(child));
                }
                if n.height > 0 {
                    assert_eq!(same_vertex, 1, "internal node without its own clone below");
                }
            }
            assert_eq!(counted, self.counts);
        }

        fn assert_ratio(&self) {
            for pair in self.counts.windows(2) {
                assert!(
                    !self.config.violated_by(pair[1], pair[0]),
                    "ratio broken: {:?}",
                    self.counts
                );
            }
        }
    }

    #[test]
    fn test_basic_operations() {
        let mut heap = QuakeHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.find_min(), Err(HeapError::EmptyHeap));

        heap.insert(5, "a");
        heap.insert(3, "b");
        heap.insert(7, "c");
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.find_min(), Ok((&3, &"b")));

        assert_eq!(heap.extract_min(), Ok((3, "b")));
        heap.assert_valid();
        assert_eq!(heap.find_min(), Ok((&5, &"a")));
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_link_builds_clone_paths() {
        let mut heap = QuakeHeap::new();
        for i in 0..9 {
            heap.insert(i, i);
        }
        heap.extract_min().unwrap();

        // Eight leaves form one perfect tournament of height 3 and 15 nodes
        heap.assert_valid();
        assert_eq!(heap.level_counts(), &[8, 4, 2, 1]);
        assert_eq!(rc_ring::count(heap.min.as_ref().unwrap()), 1);
    }

    #[test]
    fn test_decrease_key_cuts_highest_clone() {
        let mut heap = QuakeHeap::new();
        let handles: Vec<_> = (0..9).map(|i| heap.insert(i * 10, i)).collect();
        heap.extract_min().unwrap();

        heap.decrease_key(&handles[8], 1).unwrap();
        assert_eq!(heap.find_min(), Ok((&1, &8)));
        heap.assert_valid();

        // Cutting does not touch the level counts
        assert_eq!(heap.level_counts(), &[8, 4, 2, 1]);

        assert_eq!(heap.extract_min(), Ok((1, 8)));
        assert_eq!(heap.extract_min(), Ok((10, 1)));
        heap.assert_valid();
        heap.assert_ratio();
    }

    #[test]
    fn test_decrease_key_of_root() {
        let mut heap = QuakeHeap::new();
        heap.insert(1, "a");
        let h = heap.insert(2, "b");
        heap.decrease_key(&h, 0).unwrap();
        assert_eq!(heap.find_min(), Ok((&0, &"b")));
        heap.assert_valid();
    }

    #[test]
    fn test_decrease_key_rejects_larger_or_equal() {
        let mut heap = QuakeHeap::new();
        let h = heap.insert(5, ());
        assert_eq!(heap.decrease_key(&h, 5), Err(HeapError::InvalidDecreaseKey));
        assert_eq!(heap.decrease_key(&h, 6), Err(HeapError::InvalidDecreaseKey));
        assert_eq!(heap.find_min(), Ok((&5, &())));
    }

    #[test]
    fn test_stale_handle() {
        let mut heap = QuakeHeap::new();
        let h = heap.insert(1, "gone");
        heap.insert(2, "stays");
        heap.extract_min().unwrap();
        assert_eq!(heap.decrease_key(&h, 0), Err(HeapError::InvalidHandle));
    }

    #[test]
    fn test_seismic_event_restores_ratio() {
        let mut heap = QuakeHeap::with_config(QuakeConfig::new(0.5).unwrap());
        let handles: Vec<_> = (0..65).map(|i| heap.insert(i, i)).collect();
        heap.extract_min().unwrap();
        assert_eq!(heap.level_counts(), &[64, 32, 16, 8, 4, 2, 1]);

        // Pulling leaves out of the big tournament thins out level 0 while
        // the upper levels keep their nodes
        for (i, h) in handles.iter().enumerate().skip(1).step_by(2) {
            heap.decrease_key(h, -(i as i32)).unwrap();
        }
        for _ in 0..20 {
            heap.extract_min().unwrap();
            heap.assert_valid();
            heap.assert_ratio();
        }
        assert_eq!(heap.len(), 44);
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut heap1 = QuakeHeap::new();
        for i in 0..5 {
            heap1.insert(i, i);
        }
        heap1.extract_min().unwrap();

        let mut heap2 = QuakeHeap::new();
        let h = heap2.insert(10, 10);
        heap2.insert(11, 11);

        let mut merged = heap1.merge(heap2);
        assert_eq!(merged.level_counts(), &[6, 2, 1]);
        assert_eq!(merged.find_min(), Ok((&1, &1)));

        merged.decrease_key(&h, -1).unwrap();
        assert_eq!(merged.extract_min(), Ok((-1, 10)));
        merged.assert_valid();
        merged.assert_ratio();
    }

    #[test]
    fn test_merge_into_shorter_counts() {
        let mut heap1 = QuakeHeap::new();
        let handles: Vec<_> = (0..5).map(|i| heap1.insert(i, i)).collect();
        heap1.extract_min().unwrap();
        assert_eq!(heap1.level_counts(), &[4, 2, 1]);

        let mut heap2 = QuakeHeap::new();
        heap2.insert(10, 10);
        heap2.insert(11, 11);

        let mut merged = heap2.merge(heap1);
        assert_eq!(merged.level_counts(), &[6, 2, 1]);
        merged.decrease_key(&handles[4], -1).unwrap();
        assert_eq!(merged.extract_min(), Ok((-1, 4)));
        merged.assert_valid();
        merged.assert_ratio();
    }

    #[test]
    fn test_merge_keeps_own_config() {
        let heap1: QuakeHeap<(), i32> = QuakeHeap::with_config(QuakeConfig::new(0.6).unwrap());
        let mut heap2 = QuakeHeap::new();
        heap2.insert(1, ());
        let merged = heap1.merge(heap2);
        assert_eq!(merged.config().alpha(), 0.6);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_drop_releases_items() {
        let item = Rc::new(());
        {
            let mut heap = QuakeHeap::new();
            for i in 0..100 {
                heap.insert(i, Rc::clone(&item));
            }
            heap.extract_min().unwrap();
            assert_eq!(Rc::strong_count(&item), 100);
        }
        assert_eq!(Rc::strong_count(&item), 1);
    }
}
