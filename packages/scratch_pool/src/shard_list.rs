//! Building blocks of a [`ShardedObjectPool`][crate::ShardedObjectPool] shard: envelopes and
//! the FIFO lists that link them together.

use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

/// Wraps one payload so it can be linked into an [`EnvelopeList`].
///
/// An envelope outlives the payload it carries. Once the payload has been taken out, the empty
/// envelope can be parked in a spare list and later filled with a different payload, so a
/// steady stream of `put()` and `get()` calls does not allocate list nodes.
pub(crate) struct Envelope<T> {
    payload: Option<T>,

    // Only ever `Some` while the envelope is owned by an `EnvelopeList`.
    next: Option<NonNull<Self>>,
}

impl<T> Envelope<T> {
    pub(crate) fn new(payload: T) -> Box<Self> {
        Box::new(Self {
            payload: Some(payload),
            next: None,
        })
    }

    pub(crate) fn fill(&mut self, payload: T) {
        debug_assert!(
            self.payload.is_none(),
            "filled an envelope that still carries a payload"
        );

        self.payload = Some(payload);
    }

    /// Takes the payload out, leaving the envelope empty.
    pub(crate) fn take(&mut self) -> Option<T> {
        self.payload.take()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}

impl<T> fmt::Debug for Envelope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("has_payload", &self.payload.is_some())
            .finish_non_exhaustive()
    }
}

/// A singly-linked FIFO list of envelopes: append at the tail, remove at the head.
///
/// The list owns every envelope linked into it. It does no synchronization of its own; each
/// shard keeps its lists behind locks.
pub(crate) struct EnvelopeList<T> {
    // Both pointers originate from `Box::leak()` in `push_back()`. `tail` is `None` if and only
    // if `head` is `None`.
    head: Option<NonNull<Envelope<T>>>,
    tail: Option<NonNull<Envelope<T>>>,

    len: usize,
}

// SAFETY: The list exclusively owns every envelope it points to, so moving the list to another
// thread moves all of its envelopes (and their payloads) along with it. That is sound whenever
// the payload itself may be sent.
unsafe impl<T: Send> Send for EnvelopeList<T> {}

impl<T> EnvelopeList<T> {
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Appends an envelope at the tail of the list. O(1).
    pub(crate) fn push_back(&mut self, mut envelope: Box<Envelope<T>>) {
        envelope.next = None;

        let node = NonNull::from(Box::leak(envelope));

        match self.tail {
            // SAFETY: `tail` came from `Box::leak()` and is owned by this list, which we hold
            // exclusively via `&mut self`, so nothing else can be accessing that envelope.
            Some(tail) => unsafe {
                (*tail.as_ptr()).next = Some(node);
            },
            None => self.head = Some(node),
        }

        self.tail = Some(node);
        self.len = self
            .len
            .checked_add(1)
            .expect("envelope list cannot outgrow the address space");
    }

    /// Removes the envelope at the head of the list, if any. O(1).
    pub(crate) fn pop_front(&mut self) -> Option<Box<Envelope<T>>> {
        let head = self.head?;

        // SAFETY: `head` came from `Box::leak()` in `push_back()` and is still owned by this
        // list. We unlink it below before anyone can observe the list again, so ownership moves
        // cleanly back into the box.
        let mut envelope = unsafe { Box::from_raw(head.as_ptr()) };

        self.head = envelope.next.take();

        if self.head.is_none() {
            self.tail = None;
        }

        self.len = self
            .len
            .checked_sub(1)
            .expect("a list with a head cannot have zero length");

        Some(envelope)
    }
}

impl<T> Default for EnvelopeList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for EnvelopeList<T> {
    fn drop(&mut self) {
        // Envelopes link to each other through raw pointers, so each one is reclaimed here.
        while let Some(envelope) = self.pop_front() {
            drop(envelope);
        }
    }
}

impl<T> fmt::Debug for EnvelopeList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(EnvelopeList<u32>: Send);
    assert_not_impl_any!(EnvelopeList<u32>: Sync);
    assert_not_impl_any!(EnvelopeList<Rc<u32>>: Send);

    fn drain(list: &mut EnvelopeList<u32>) -> Vec<u32> {
        let mut out = Vec::new();

        while let Some(mut envelope) = list.pop_front() {
            out.push(envelope.take().unwrap());
        }

        out
    }

    #[test]
    fn new_list_is_empty() {
        let mut list = EnvelopeList::<u32>::new();

        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.pop_front().is_none());
    }

    #[test]
    fn preserves_fifo_order() {
        let mut list = EnvelopeList::new();

        for value in 1..=5 {
            list.push_back(Envelope::new(value));
        }

        assert_eq!(list.len(), 5);
        assert_eq!(drain(&mut list), vec![1, 2, 3, 4, 5]);
        assert!(list.is_empty());
    }

    #[test]
    fn interleaved_push_and_pop() {
        let mut list = EnvelopeList::new();

        list.push_back(Envelope::new(1));
        list.push_back(Envelope::new(2));
        assert_eq!(list.pop_front().unwrap().take(), Some(1));

        list.push_back(Envelope::new(3));
        assert_eq!(list.pop_front().unwrap().take(), Some(2));
        assert_eq!(list.pop_front().unwrap().take(), Some(3));

        // Tail must have been cleared when the list drained, otherwise this push would link
        // into a freed envelope.
        list.push_back(Envelope::new(4));
        assert_eq!(drain(&mut list), vec![4]);
    }

    #[test]
    fn envelope_can_be_refilled_after_take() {
        let mut list = EnvelopeList::new();
        list.push_back(Envelope::new(10));

        let mut envelope = list.pop_front().unwrap();
        assert_eq!(envelope.take(), Some(10));
        assert!(envelope.is_empty());

        envelope.fill(20);
        list.push_back(envelope);

        assert_eq!(drain(&mut list), vec![20]);
    }

    #[test]
    fn popped_envelope_is_unlinked() {
        let mut list = EnvelopeList::new();
        list.push_back(Envelope::new(1));
        list.push_back(Envelope::new(2));

        let envelope = list.pop_front().unwrap();
        assert!(envelope.next.is_none());
    }

    #[test]
    fn drop_releases_remaining_payloads() {
        struct CountDrops(Rc<Cell<usize>>);

        impl Drop for CountDrops {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));

        {
            let mut list = EnvelopeList::new();

            for _ in 0..3 {
                list.push_back(Envelope::new(CountDrops(Rc::clone(&drops))));
            }
        }

        assert_eq!(drops.get(), 3);
    }

    #[cfg_attr(miri, ignore)] // Slow under Miri and covered by the shorter tests.
    #[test]
    fn long_list_drops_cleanly() {
        let mut list = EnvelopeList::new();

        for value in 0..100_000 {
            list.push_back(Envelope::new(value));
        }

        drop(list);
    }
}
