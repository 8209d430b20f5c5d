//! Rank-Pairing Heap implementation
//!
//! A rank-pairing heap is a heap data structure that achieves:
//! - O(1) amortized insert, decrease_key, and merge
//! - O(log n) amortized extract_min
//!
//! Rank-pairing heaps are designed to be simpler than Fibonacci heaps while
//! maintaining the same optimal amortized bounds. Instead of marks and
//! cascading cuts, every node carries an explicit rank, and `decrease_key`
//! repairs ranks along a single upward path.
//!
//! # Half-Trees
//!
//! Each tree is stored in half-tree form: a binary tree where every node has
//! a `left` and a `right` child, and a node's key is no larger than every key
//! in its *left* subtree. Nothing is required of the right subtree. A root
//! has no right child, so its left subtree is exactly the rest of its tree.
//!
//! # Algorithm Overview
//!
//! - **Insert**: add a singleton half-tree to the root ring
//! - **Merge**: splice two root rings together
//! - **Extract-min**: detach the right spine of the minimum's left child,
//!   turning every spine node into a root, then link roots of equal rank
//! - **Decrease-key**: detach the node together with its left subtree as a new
//!   half-tree, give its right subtree to its old parent, then recompute ranks
//!   on the path upward from the old parent
//!
//! # Rank Rules
//!
//! A missing child counts as rank -1.
//!
//! - A root has rank `rank(left) + 1`.
//! - Any other node with child ranks `r1 >= r2` has rank `r1` if
//!   `r1 > r2 + 1`, otherwise `r1 + 1`.
//!
//! Linking two roots of rank r yields a root of rank r + 1 whose new left
//! child keeps rank r under the second rule, so ranks stay exact throughout.

use crate::owner::Owner;
use crate::rank::{checked_increment, Rank};
use crate::traits::{Handle, Heap, HeapError};
use rc_ring::{Linked, RingLink};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type NodeRef<T, P> = Rc<RefCell<Node<T, P>>>;
type WeakNodeRef<T, P> = Weak<RefCell<Node<T, P>>>;

/// Handle to an element in a rank-pairing heap
pub struct RankPairingHandle<T, P> {
    node: WeakNodeRef<T, P>,
}

impl<T, P> Clone for RankPairingHandle<T, P> {
    fn clone(&self) -> Self {
        RankPairingHandle {
            node: Weak::clone(&self.node),
        }
    }
}

impl<T, P> PartialEq for RankPairingHandle<T, P> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.node, &other.node)
    }
}

impl<T, P> Eq for RankPairingHandle<T, P> {}

impl<T, P> fmt::Debug for RankPairingHandle<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankPairingHandle")
            .field("node", &self.node.as_ptr())
            .finish()
    }
}

impl<T, P> Handle for RankPairingHandle<T, P> {}

/// Internal node structure for rank-pairing heap
///
/// `parent` is the node whose `left` or `right` slot holds this node, so a
/// half-tree parent rather than a parent in the represented multiway tree.
struct Node<T, P> {
    item: T,
    priority: P,
    owner: Owner,
    parent: WeakNodeRef<T, P>,
    left: Option<NodeRef<T, P>>,
    right: Option<NodeRef<T, P>>,
    /// Membership in the root ring; unlinked for non-roots
    roots: RingLink<Node<T, P>>,
    rank: Rank,
}

impl<T, P> Linked for Node<T, P> {
    fn link(&self) -> &RingLink<Self> {
        &self.roots
    }

    fn link_mut(&mut self) -> &mut RingLink<Self> {
        &mut self.roots
    }
}

impl<T, P> Node<T, P> {
    /// Rank of an optional child, with -1 for a missing one
    fn rank_of(slot: &Option<NodeRef<T, P>>) -> i16 {
        slot.as_ref().map_or(-1, |n| i16::from(n.borrow().rank))
    }

    /// The rank this node should have as a root
    fn root_rank(&self) -> Rank {
        self.left
            .as_ref()
            .map_or(0, |left| checked_increment(left.borrow().rank))
    }

    /// The rank this node should have as a non-root
    fn child_rank(&self) -> Rank {
        let (a, b) = (Self::rank_of(&self.left), Self::rank_of(&self.right));
        let high = a.max(b);
        let rank = if (a - b).abs() > 1 { high } else { high + 1 };
        Rank::try_from(rank).expect("rank overflow: ranks are bounded by O(log n)")
    }

    fn is_root(&self) -> bool {
        self.parent.strong_count() == 0
    }
}

/// Rank-Pairing Heap
///
/// # Example
///
/// ```rust
/// use meldable_heaps::rank_pairing::RankPairingHeap;
/// use meldable_heaps::Heap;
///
/// let mut heap = RankPairingHeap::new();
/// let handle = heap.insert(5, "item");
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.find_min(), Ok((&1, &"item")));
/// ```
pub struct RankPairingHeap<T, P> {
    /// Minimum root; also the entry point into the root ring
    min: Option<NodeRef<T, P>>,
    len: usize,
    owner: Owner,
}

impl<T, P> Drop for RankPairingHeap<T, P> {
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

impl<T, P: Ord> Default for RankPairingHeap<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> fmt::Debug for RankPairingHeap<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankPairingHeap").field("len", &self.len).finish()
    }
}

impl<T, P: Ord> Heap<T, P> for RankPairingHeap<T, P> {
    type Handle = RankPairingHandle<T, P>;

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
            left: None,
            right: None,
            roots: RingLink::new(),
            rank: 0,
        }));
        let handle = RankPairingHandle {
            node: Rc::downgrade(&node),
        };

        self.add_root(node);
        self.len += 1;
        handle
    }

    fn find_min(&self) -> Result<(&P, &T), HeapError> {
        let min = self.min.as_ref().ok_or(HeapError::EmptyHeap)?;
        // SAFETY: `self.min` keeps the node alive for the lifetime of `&self`,
        // and nodes are only mutably borrowed from methods taking `&mut self`
        // of their owning heap; foreign handles fail the owner check.
        let node = unsafe { &*min.as_ptr() };
        Ok((&node.priority, &node.item))
    }

    fn extract_min(&mut self) -> Result<(P, T), HeapError> {
        let min = self.min.take().ok_or(HeapError::EmptyHeap)?;

        // Every node on the right spine of the left child becomes a root
        let mut spine = min.borrow_mut().left.take();
        loop {
            let Some(node) = spine else {
                break;
            };
            {
                let mut n = node.borrow_mut();
                spine = n.right.take();
                n.parent = Weak::new();
                n.rank = n.root_rank();
            }
            rc_ring::insert_after(&min, &node);
        }

        let survivor = rc_ring::remove(&min);
        self.len -= 1;
        if let Some(start) = survivor {
            self.compress(start);
        }

        let node = Rc::try_unwrap(min)
            .ok()
            .expect("extracted node is detached from every tree")
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
        let Some(parent) = parent else {
            self.update_min(&node);
            return Ok(());
        };

        // The right child takes the node's place under the old parent
        let right = node.borrow_mut().right.take();
        if let Some(right) = &right {
            right.borrow_mut().parent = Rc::downgrade(&parent);
        }
        {
            let mut p = parent.borrow_mut();
            let was_left = p.left.as_ref().is_some_and(|l| Rc::ptr_eq(l, &node));
            if was_left {
                p.left = right;
            } else {
                p.right = right;
            }
        }
        {
            let mut n = node.borrow_mut();
            n.parent = Weak::new();
            n.rank = n.root_rank();
        }

        self.add_root(node);
        Self::restore_ranks(parent);
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

impl<T, P: Ord> RankPairingHeap<T, P> {
    /// Adds a detached half-tree to the root ring, in front of the minimum
    /// if it becomes the new minimum and right after it otherwise
    fn add_root(&mut self, node: NodeRef<T, P>) {
        let Some(min) = self.min.clone() else {
            rc_ring::make_circular(&node);
            self.min = Some(node);
            return;
        };

        if node.borrow().priority < min.borrow().priority {
            rc_ring::insert_before(&min, &node);
            self.min = Some(node);
        } else {
            rc_ring::insert_after(&min, &node);
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

    /// Links roots of equal rank until all root ranks are distinct, then
    /// rebuilds the root ring around the new minimum
    fn compress(&mut self, start: NodeRef<T, P>) {
        let roots = rc_ring::drain(&start);
        let before = roots.len();

        let mut by_rank: Vec<Option<NodeRef<T, P>>> = Vec::new();
        for root in roots {
            let mut x = root;
            loop {
                let rank = x.borrow().rank as usize;
                if rank >= by_rank.len() {
                    by_rank.resize(rank + 1, None);
                }
                match by_rank[rank].take() {
                    None => {
                        by_rank[rank] = Some(x);
                        break;
                    }
                    Some(y) => x = Self::link(x, y),
                }
            }
        }

        self.min = None;
        let mut after = 0;
        for root in by_rank.into_iter().flatten() {
            self.add_root(root);
            after += 1;
        }
        log::trace!("rank-pairing compress: {before} roots -> {after}");
    }

    /// Links two half-trees of equal rank and returns the winner
    ///
    /// The loser becomes the winner's left child and takes the winner's old
    /// left subtree as its right subtree. Ties go to `a`.
    fn link(a: NodeRef<T, P>, b: NodeRef<T, P>) -> NodeRef<T, P> {
        let (winner, loser) = if b.borrow().priority < a.borrow().priority {
            (b, a)
        } else {
            (a, b)
        };

        let displaced = winner.borrow_mut().left.take();
        if let Some(displaced) = &displaced {
            displaced.borrow_mut().parent = Rc::downgrade(&loser);
        }
        {
            let mut l = loser.borrow_mut();
            l.right = displaced;
            l.parent = Rc::downgrade(&winner);
        }
        {
            let mut w = winner.borrow_mut();
            w.left = Some(loser);
            w.rank = checked_increment(w.rank);
        }
        winner
    }

    /// Recomputes ranks from `node` upward, stopping once a rank is unchanged
    /// or a root has been updated
    fn restore_ranks(mut node: NodeRef<T, P>) {
        loop {
            let (rank, parent) = {
                let n = node.borrow();
                let rank = if n.is_root() {
                    n.root_rank()
                } else {
                    n.child_rank()
                };
                (rank, n.parent.upgrade())
            };

            if rank == node.borrow().rank {
                break;
            }
            node.borrow_mut().rank = rank;

            match parent {
                Some(parent) => node = parent,
                None => break,
            }
        }
    }
}
