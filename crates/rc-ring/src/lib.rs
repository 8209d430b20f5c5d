//! Circular doubly-linked rings over reference-counted nodes.
//!
//! This crate provides the ring operations that heap root lists and child
//! lists need, without raw pointers. Nodes live in `Rc<RefCell<N>>` cells and
//! embed a [`RingLink`]; the ring owns each node through the `next` link of its
//! predecessor, while `prev` is a [`Weak`] back-link.
//!
//! # Circular vs Linear Lists
//!
//! In a circular list:
//! - A single node points to itself (both `next` and `prev`)
//! - There is no head or tail - any node can be the "entry point"
//! - Splicing two rings together is O(1)
//! - Iteration wraps around (must track starting point)
//!
//! This is what Fibonacci-style heaps want: siblings form a ring around their
//! parent, roots form a ring around the minimum, and merging two heaps is a
//! single splice.
//!
//! # Ownership
//!
//! A linked ring is a reference cycle. A node leaves the cycle through
//! [`remove`] or [`drain`]; a structure that owns rings must drain them before
//! it is dropped, otherwise the nodes leak.
//!
//! # Example
//!
//! ```rust
//! use rc_ring::{Linked, RingLink};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Node {
//!     link: RingLink<Node>,
//!     value: i32,
//! }
//!
//! impl Linked for Node {
//!     fn link(&self) -> &RingLink<Self> {
//!         &self.link
//!     }
//!     fn link_mut(&mut self) -> &mut RingLink<Self> {
//!         &mut self.link
//!     }
//! }
//!
//! let a = Rc::new(RefCell::new(Node { link: RingLink::new(), value: 1 }));
//! let b = Rc::new(RefCell::new(Node { link: RingLink::new(), value: 2 }));
//!
//! rc_ring::make_circular(&a);
//! rc_ring::insert_after(&a, &b);
//!
//! let values: Vec<i32> = rc_ring::collect(&a).iter().map(|n| n.borrow().value).collect();
//! assert_eq!(values, vec![1, 2]);
//!
//! // Break the cycle before the nodes go away.
//! rc_ring::drain(&a);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Strong reference to a ring node.
pub type NodeRef<N> = Rc<RefCell<N>>;

/// Weak reference to a ring node.
pub type WeakNodeRef<N> = Weak<RefCell<N>>;

// =============================================================================
// RingLink
// =============================================================================

/// Link that allows an object to be inserted into a circular ring.
///
/// When unlinked, `next` is `None` and `prev` is dangling.
/// When linked (even as a single node), both point to live nodes.
/// A single node in a ring points to itself.
pub struct RingLink<N> {
    next: Option<NodeRef<N>>,
    prev: WeakNodeRef<N>,
}

impl<N> RingLink<N> {
    /// Creates a new unlinked `RingLink`.
    #[inline]
    pub const fn new() -> Self {
        RingLink {
            next: None,
            prev: Weak::new(),
        }
    }

    /// Checks whether the link is part of a ring.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.next.is_some()
    }

    fn clear(&mut self) {
        self.next = None;
        self.prev = Weak::new();
    }
}

impl<N> Default for RingLink<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> fmt::Debug for RingLink<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingLink")
            .field("next", &self.next.as_ref().map(Rc::as_ptr))
            .field("prev", &self.prev.as_ptr())
            .finish()
    }
}

/// Implemented by node types that embed a [`RingLink`].
///
/// A node can be a member of at most one ring at a time.
pub trait Linked: Sized {
    /// Returns the embedded link.
    fn link(&self) -> &RingLink<Self>;

    /// Returns the embedded link mutably.
    fn link_mut(&mut self) -> &mut RingLink<Self>;
}

// =============================================================================
// Ring operations
// =============================================================================

/// Checks whether `node` is part of a ring.
#[inline]
pub fn is_linked<N: Linked>(node: &NodeRef<N>) -> bool {
    node.borrow().link().is_linked()
}

/// Returns `true` if `node` is linked and is the only member of its ring.
pub fn is_alone<N: Linked>(node: &NodeRef<N>) -> bool {
    match next(node) {
        Some(next) => Rc::ptr_eq(&next, node),
        None => false,
    }
}

/// Returns the node after `node`, or `None` if `node` is unlinked.
#[inline]
pub fn next<N: Linked>(node: &NodeRef<N>) -> Option<NodeRef<N>> {
    node.borrow().link().next.clone()
}

/// Returns the node before `node`, or `None` if `node` is unlinked.
#[inline]
pub fn prev<N: Linked>(node: &NodeRef<N>) -> Option<NodeRef<N>> {
    if !is_linked(node) {
        return None;
    }
    node.borrow().link().prev.upgrade()
}

fn linked_prev<N: Linked>(node: &NodeRef<N>) -> NodeRef<N> {
    prev(node).expect("linked ring node has a live predecessor")
}

/// Makes `node` a single-element ring pointing to itself.
///
/// Any previous membership is discarded without touching the old neighbours,
/// so `node` must be unlinked or already alone.
pub fn make_circular<N: Linked>(node: &NodeRef<N>) {
    let mut inner = node.borrow_mut();
    let link = inner.link_mut();
    link.next = Some(Rc::clone(node));
    link.prev = Rc::downgrade(node);
}

/// Inserts `new` directly after `at`.
///
/// `at` must be linked. `new` must be unlinked or alone in its own ring.
pub fn insert_after<N: Linked>(at: &NodeRef<N>, new: &NodeRef<N>) {
    let after = next(at).expect("insertion point is linked into a ring");

    {
        let mut inner = new.borrow_mut();
        let link = inner.link_mut();
        link.next = Some(Rc::clone(&after));
        link.prev = Rc::downgrade(at);
    }
    after.borrow_mut().link_mut().prev = Rc::downgrade(new);
    at.borrow_mut().link_mut().next = Some(Rc::clone(new));
}

/// Inserts `new` directly before `at`.
///
/// `at` must be linked. `new` must be unlinked or alone in its own ring.
pub fn insert_before<N: Linked>(at: &NodeRef<N>, new: &NodeRef<N>) {
    let before = linked_prev(at);
    insert_after(&before, new);
}

/// Removes `node` from its ring and leaves it unlinked.
///
/// Returns a surviving member of the ring (the node that followed `node`),
/// or `None` if `node` was the last member or was not linked at all.
/// The caller must hold its own reference to `node`: the ring's reference is
/// released here.
pub fn remove<N: Linked>(node: &NodeRef<N>) -> Option<NodeRef<N>> {
    let after = next(node)?;

    if Rc::ptr_eq(&after, node) {
        node.borrow_mut().link_mut().clear();
        return None;
    }

    let before = linked_prev(node);
    before.borrow_mut().link_mut().next = Some(Rc::clone(&after));
    after.borrow_mut().link_mut().prev = Rc::downgrade(&before);
    node.borrow_mut().link_mut().clear();

    Some(after)
}

/// Splices two separate rings into one.
///
/// The ring containing `b` is inserted just before `a`, so walking from `a`
/// visits the rest of `a`'s ring first and then `b`'s ring. Either side may be
/// `None` (an empty ring). Returns an entry point into the combined ring.
///
/// `a` and `b` must not already belong to the same ring.
pub fn splice<N: Linked>(a: Option<NodeRef<N>>, b: Option<NodeRef<N>>) -> Option<NodeRef<N>> {
    let (a, b) = match (a, b) {
        (None, other) | (other, None) => return other,
        (Some(a), Some(b)) => (a, b),
    };

    let a_last = linked_prev(&a);
    let b_last = linked_prev(&b);

    a_last.borrow_mut().link_mut().next = Some(Rc::clone(&b));
    b.borrow_mut().link_mut().prev = Rc::downgrade(&a_last);
    b_last.borrow_mut().link_mut().next = Some(Rc::clone(&a));
    a.borrow_mut().link_mut().prev = Rc::downgrade(&b_last);

    Some(a)
}

/// Counts the members of the ring containing `start`.
///
/// Returns 0 if `start` is unlinked.
pub fn count<N: Linked>(start: &NodeRef<N>) -> usize {
    let mut count = 0;
    for_each(start, |_| count += 1);
    count
}

/// Calls `f` on every member of the ring, beginning with `start`.
pub fn for_each<N: Linked, F>(start: &NodeRef<N>, mut f: F)
where
    F: FnMut(&NodeRef<N>),
{
    if !is_linked(start) {
        return;
    }

    let mut current = Rc::clone(start);
    loop {
        f(&current);
        let after = next(&current).expect("ring members stay linked during traversal");
        if Rc::ptr_eq(&after, start) {
            break;
        }
        current = after;
    }
}

/// Collects strong references to every member of the ring, beginning with
/// `start`. The ring is left intact.
pub fn collect<N: Linked>(start: &NodeRef<N>) -> Vec<NodeRef<N>> {
    let mut members = Vec::new();
    for_each(start, |node| members.push(Rc::clone(node)));
    members
}

/// Dissolves the ring containing `start`, returning its members in ring order.
///
/// Every member is left unlinked, which breaks the reference cycle; the
/// returned vector holds the only ring-derived references.
pub fn drain<N: Linked>(start: &NodeRef<N>) -> Vec<NodeRef<N>> {
    let members = collect(start);
    for node in &members {
        node.borrow_mut().link_mut().clear();
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        link: RingLink<TestNode>,
        value: i32,
    }

    impl Linked for TestNode {
        fn link(&self) -> &RingLink<Self> {
            &self.link
        }

        fn link_mut(&mut self) -> &mut RingLink<Self> {
            &mut self.link
        }
    }

    fn node(value: i32) -> NodeRef<TestNode> {
        Rc::new(RefCell::new(TestNode {
            link: RingLink::new(),
            value,
        }))
    }

    fn values(start: &NodeRef<TestNode>) -> Vec<i32> {
        collect(start).iter().map(|n| n.borrow().value).collect()
    }

    #[test]
    fn test_new_link_unlinked() {
        let n = node(1);
        assert!(!is_linked(&n));
        assert!(next(&n).is_none());
        assert!(prev(&n).is_none());
        assert_eq!(count(&n), 0);
    }

    #[test]
    fn test_make_circular_single() {
        let n = node(1);
        make_circular(&n);

        assert!(is_linked(&n));
        assert!(is_alone(&n));
        assert!(Rc::ptr_eq(&next(&n).unwrap(), &n));
        assert!(Rc::ptr_eq(&prev(&n).unwrap(), &n));

        drain(&n);
        assert_eq!(Rc::strong_count(&n), 1);
    }

    #[test]
    fn test_insert_after_and_before() {
        let a = node(1);
        let b = node(2);
        let c = node(3);

        make_circular(&a);
        insert_after(&a, &b);
        insert_before(&a, &c);

        // 1 -> 2 -> 3 -> 1
        assert_eq!(values(&a), vec![1, 2, 3]);
        assert!(Rc::ptr_eq(&prev(&a).unwrap(), &c));
        assert!(Rc::ptr_eq(&prev(&b).unwrap(), &a));
        assert!(!is_alone(&a));

        drain(&a);
    }

    #[test]
    fn test_remove_single() {
        let a = node(1);
        make_circular(&a);

        assert!(remove(&a).is_none());
        assert!(!is_linked(&a));
        assert_eq!(Rc::strong_count(&a), 1);
    }

    #[test]
    fn test_remove_from_two() {
        let a = node(1);
        let b = node(2);
        make_circular(&a);
        insert_after(&a, &b);

        let survivor = remove(&a).unwrap();
        assert!(Rc::ptr_eq(&survivor, &b));
        assert!(!is_linked(&a));

        // b now points to itself
        assert!(is_alone(&b));
        assert!(Rc::ptr_eq(&prev(&b).unwrap(), &b));

        drain(&b);
    }

    #[test]
    fn test_remove_middle() {
        let a = node(1);
        let b = node(2);
        let c = node(3);
        make_circular(&a);
        insert_after(&a, &b);
        insert_after(&b, &c);

        let survivor = remove(&b).unwrap();
        assert!(Rc::ptr_eq(&survivor, &c));
        assert_eq!(values(&a), vec![1, 3]);
        assert_eq!(Rc::strong_count(&b), 1);

        drain(&a);
    }

    #[test]
    fn test_remove_unlinked_is_noop() {
        let a = node(1);
        assert!(remove(&a).is_none());
        assert!(!is_linked(&a));
    }

    #[test]
    fn test_splice_empty() {
        let result: Option<NodeRef<TestNode>> = splice(None, None);
        assert!(result.is_none());
    }

    #[test]
    fn test_splice_one_empty() {
        let a = node(1);
        make_circular(&a);

        let result = splice(Some(Rc::clone(&a)), None).unwrap();
        assert!(Rc::ptr_eq(&result, &a));

        let result = splice(None, Some(Rc::clone(&a))).unwrap();
        assert!(Rc::ptr_eq(&result, &a));

        drain(&a);
    }

    #[test]
    fn test_splice_two_singles() {
        let a = node(1);
        let b = node(2);
        make_circular(&a);
        make_circular(&b);

        splice(Some(Rc::clone(&a)), Some(Rc::clone(&b)));

        assert_eq!(values(&a), vec![1, 2]);
        assert_eq!(values(&b), vec![2, 1]);

        drain(&a);
    }

    #[test]
    fn test_splice_two_pairs() {
        let a = node(1);
        let b = node(2);
        let c = node(3);
        let d = node(4);

        make_circular(&a);
        insert_after(&a, &b);
        make_circular(&c);
        insert_after(&c, &d);

        splice(Some(Rc::clone(&a)), Some(Rc::clone(&c)));

        assert_eq!(values(&a), vec![1, 2, 3, 4]);
        assert!(Rc::ptr_eq(&prev(&a).unwrap(), &d));
        assert!(Rc::ptr_eq(&prev(&c).unwrap(), &b));

        drain(&a);
    }

    #[test]
    fn test_count_and_for_each() {
        let nodes: Vec<_> = (0..5).map(node).collect();
        make_circular(&nodes[0]);
        for pair in nodes.windows(2) {
            insert_after(&pair[0], &pair[1]);
        }

        assert_eq!(count(&nodes[2]), 5);

        let mut sum = 0;
        for_each(&nodes[0], |n| sum += n.borrow().value);
        assert_eq!(sum, 10);

        drain(&nodes[0]);
    }

    #[test]
    fn test_drain_breaks_cycle() {
        let a = node(1);
        let b = node(2);
        let c = node(3);
        make_circular(&a);
        insert_after(&a, &b);
        insert_after(&b, &c);

        let members = drain(&b);
        assert_eq!(
            members.iter().map(|n| n.borrow().value).collect::<Vec<_>>(),
            vec![2, 3, 1]
        );
        drop(members);

        for n in [&a, &b, &c] {
            assert!(!is_linked(n));
            assert_eq!(Rc::strong_count(n), 1);
        }
    }
}
