use std::any::type_name;
use std::fmt;
use std::iter;
use std::num::NonZero;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::atomic::AtomicCell;
use crossbeam::utils::CachePadded;
use tracing::trace;

use crate::metrics::{RING_GET_CREATED, RING_GET_RECYCLED, RING_PUT_OVERWROTE};
use crate::sharded_pool::Factory;
use crate::{LocklessRingPoolBuilder, ObjectPool};

type Slot<T> = AtomicCell<Option<Box<T>>>;

/// A best-effort, lock-free object pool backed by a fixed ring of slots.
///
/// Objects live on the heap and move in and out of the pool as [`Box<T>`], so storing and
/// fetching an object is a single atomic pointer swap.
///
/// # Behavior
///
/// The pool keeps two independent cursors into the ring, one for fetching and one for storing.
///
/// * [`get()`][Self::get] empties the slot under the fetch cursor. If the slot held an object,
///   the fetch cursor advances and the object is returned. If the slot was empty, the cursor
///   stays where it is and a new object is constructed by the factory.
/// * [`put()`][Self::put] advances the store cursor and places the object in the slot it was
///   pointing at. Whatever object that slot still held is dropped.
///
/// Neither operation ever blocks or retries. Under contention objects are routinely lost
/// (overwritten before anyone fetched them) and new ones are constructed even though the ring
/// holds others. This is acceptable because pooling is only an optimization here.
///
/// The pool does not reset or inspect the objects it stores.
///
/// # Thread safety
///
/// The pool is thread-safe if `T` is [`Send`].
///
/// # Example
///
/// ```
/// use scratch_pool::LocklessRingPool;
///
/// let pool = LocklessRingPool::new(|| [0_u64; 64]);
///
/// let mut scratch = pool.get();
/// scratch[0] = 42;
/// let address = &raw const *scratch;
///
/// pool.put(scratch);
///
/// // Single-threaded, a put is immediately followed by a matching get.
/// let scratch = pool.get();
/// assert_eq!(&raw const *scratch, address);
/// assert_eq!(scratch[0], 42);
/// ```
pub struct LocklessRingPool<T> {
    slots: Box<[Slot<T>]>,

    fetch_cursor: CachePadded<AtomicUsize>,
    store_cursor: CachePadded<AtomicUsize>,

    factory: Factory<T>,
}

impl<T> LocklessRingPool<T> {
    /// Creates a pool with the default configuration that uses `factory` to construct objects
    /// whenever the slot it probes is empty.
    ///
    /// Use [`builder()`][Self::builder] to customize the configuration.
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder().build(factory)
    }

    /// Creates a builder for configuring the pool.
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn builder() -> LocklessRingPoolBuilder<T> {
        LocklessRingPoolBuilder::new()
    }

    pub(crate) fn new_inner(capacity: NonZero<usize>, factory: Factory<T>) -> Self {
        let slots = iter::repeat_with(|| AtomicCell::new(None))
            .take(capacity.get())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            fetch_cursor: CachePadded::new(AtomicUsize::new(0)),
            store_cursor: CachePadded::new(AtomicUsize::new(0)),
            factory,
        }
    }

    /// Borrows an object from the pool.
    ///
    /// Returns the object in the slot under the fetch cursor if there is one, otherwise a new
    /// object from the factory. Both cases must be treated identically by the caller.
    ///
    /// # Panics
    ///
    /// Panics raised by the factory propagate to the caller. The pool remains usable.
    #[must_use]
    pub fn get(&self) -> Box<T> {
        let index = self.index_of(self.fetch_cursor.load(Ordering::Relaxed));

        if let Some(payload) = self.slot(index).swap(None) {
            // Only a successful probe moves the fetch cursor on.
            self.fetch_cursor.fetch_add(1, Ordering::Relaxed);
            RING_GET_RECYCLED.with(|e| e.observe_once());
            return payload;
        }

        RING_GET_CREATED.with(|e| e.observe_once());
        Box::new((self.factory)())
    }

    /// Returns an object to the pool.
    ///
    /// The object replaces whatever the next slot holds; an object that was sitting there
    /// unfetched is dropped.
    pub fn put(&self, payload: Box<T>) {
        let index = self.index_of(self.store_cursor.fetch_add(1, Ordering::Relaxed));

        if let Some(evicted) = self.slot(index).swap(Some(payload)) {
            trace!(slot = index, "overwrote an object that was never fetched");
            RING_PUT_OVERWROTE.with(|e| e.observe_once());
            drop(evicted);
        }
    }

    /// The number of slots in the ring, which is the most objects the pool can hold.
    #[must_use]
    pub fn capacity(&self) -> NonZero<usize> {
        NonZero::new(self.slots.len()).expect("ring always has at least one slot")
    }

    #[allow(
        clippy::arithmetic_side_effects,
        clippy::modulo_arithmetic,
        reason = "the ring is never empty; cursors are allowed to wrap around"
    )]
    fn index_of(&self, cursor: usize) -> usize {
        cursor % self.slots.len()
    }

    #[allow(
        clippy::indexing_slicing,
        reason = "index_of() only yields indexes below the slot count"
    )]
    fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }

    /// Counts the slots that currently hold an object.
    ///
    /// Each slot is briefly emptied while it is inspected, so this is only meaningful once every
    /// thread using the pool has stopped.
    #[cfg(test)]
    pub(crate) fn occupied(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| {
                let content = slot.swap(None);
                let occupied = content.is_some();
                slot.store(content);
                occupied
            })
            .count()
    }
}

impl<T> ObjectPool for LocklessRingPool<T> {
    type Item = Box<T>;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn get(&self) -> Box<T> {
        Self::get(self)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn put(&self, item: Box<T>) {
        Self::put(self, item);
    }
}

impl<T> fmt::Debug for LocklessRingPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.slots.len())
            .field("fetch_cursor", &self.fetch_cursor.load(Ordering::Relaxed))
            .field("store_cursor", &self.store_cursor.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
