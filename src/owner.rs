//! Heap ownership tokens
//!
//! Every heap carries an [`Owner`] token and stamps it on each element it
//! creates. When a heap absorbs another one in `merge`, the donor's token is
//! forwarded to the absorbing heap's token, so following the forwarding
//! links from any element's token always ends at the token of the heap that
//! currently holds the element. `decrease_key` uses this to reject handles
//! that belong to a different heap.
//!
//! Forwarding links form a union-find forest whose roots are exactly the
//! tokens of live heaps. Lookups compress the path they walk.

use std::cell::RefCell;
use std::rc::Rc;

/// Ownership token shared by a heap and all of its elements
#[derive(Clone, Default)]
pub(crate) struct Owner {
    forward: Rc<RefCell<Option<Owner>>>,
}

impl Owner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns true if an element stamped with `token` belongs to the heap
    /// holding `self`
    ///
    /// `self` must be the token of a live heap, which is never forwarded.
    pub(crate) fn owns(&self, token: &Owner) -> bool {
        Rc::ptr_eq(&self.forward, &token.resolve().forward)
    }

    /// Forwards `donor` to `self`, handing every element stamped with it over
    pub(crate) fn absorb(&self, donor: &Owner) {
        debug_assert!(self.forward.borrow().is_none(), "live heap tokens are roots");
        if !Rc::ptr_eq(&self.forward, &donor.forward) {
            *donor.forward.borrow_mut() = Some(self.clone());
        }
    }

    /// Follows forwarding links to the root token, compressing the path
    fn resolve(&self) -> Owner {
        let mut root = self.clone();
        loop {
            let next = root.forward.borrow().clone();
            match next {
                Some(next) => root = next,
                None => break,
            }
        }

        let mut current = self.clone();
        loop {
            let next = current.forward.borrow().clone();
            match next {
                Some(next) if !Rc::ptr_eq(&next.forward, &root.forward) => {
                    *current.forward.borrow_mut() = Some(root.clone());
                    current = next;
                }
                _ => break,
            }
        }
        root
    }
}
