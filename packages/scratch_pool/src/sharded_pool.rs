use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use tracing::trace;

use crate::metrics::{
    SHARDED_GET_CREATED, SHARDED_GET_RECYCLED, SHARDED_PUT_DISCARDED, SHARDED_PUT_STORED,
};
use crate::shard_list::{Envelope, EnvelopeList};
use crate::{ObjectPool, ShardedObjectPoolBuilder};

pub(crate) type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A best-effort object pool that spreads its contents over independently locked shards.
///
/// Use it to recycle short-lived scratch objects (evaluation buffers, intermediate structures)
/// between worker threads without funneling every thread through a single lock.
///
/// # Behavior
///
/// * [`get()`][Self::get] takes an object from one shard, chosen round-robin. If that shard is
///   empty, or the whole pool is empty, it calls the factory instead. It never searches other
///   shards and never waits.
/// * [`put()`][Self::put] appends the object to one shard, chosen round-robin independently of
///   `get()`. If the pool already holds [`capacity()`][Self::capacity] objects, the object is
///   dropped instead.
///
/// Within one shard, objects come back out in the order they went in. Nothing is promised about
/// ordering across shards, nor that an object you put in will ever come back out.
///
/// The pool does not reset or inspect the objects it stores. Whatever state an object had when it
/// was put in is the state it has when it comes back out.
///
/// # Shard count
///
/// By default the pool uses one shard per processor available to the process, clamped to
/// [`MIN_SHARDS`][crate::MIN_SHARDS]..=[`MAX_SHARDS`][crate::MAX_SHARDS]. Use
/// [`builder()`][Self::builder] to choose a different shard count or capacity.
///
/// # Thread safety
///
/// The pool is thread-safe if `T` is [`Send`]. Each lock is held only for a pointer splice;
/// the factory is never called and no object is dropped while a lock is held.
///
/// # Example
///
/// ```
/// use scratch_pool::ShardedObjectPool;
///
/// let pool = ShardedObjectPool::new(|| Vec::<u8>::with_capacity(4096));
///
/// let mut buffer = pool.get();
/// buffer.extend_from_slice(b"row data");
///
/// buffer.clear();
/// pool.put(buffer);
///
/// let buffer = pool.get();
/// assert!(buffer.capacity() >= 4096);
/// ```
pub struct ShardedObjectPool<T> {
    shards: Box<[CachePadded<Shard<T>>]>,

    capacity: NonZero<usize>,

    // `capacity` converted once for comparison against the signed counters below.
    capacity_limit: isize,

    // Approximate number of objects sitting in the active lists. Signed because a `get()` can
    // decrement it before the `put()` that supplied the object has incremented it.
    resident: CachePadded<AtomicIsize>,

    // Approximate number of empty envelopes cached in the spare lists.
    spare_envelopes: CachePadded<AtomicIsize>,

    get_cursor: CachePadded<AtomicUsize>,
    put_cursor: CachePadded<AtomicUsize>,

    factory: Factory<T>,
}

/// One partition of the pool. The two lists are locked independently.
struct Shard<T> {
    /// Envelopes carrying objects that are available to `get()`.
    active: Mutex<EnvelopeList<T>>,

    /// Empty envelopes waiting to be refilled by `put()`.
    spare: Mutex<EnvelopeList<T>>,
}

impl<T> Shard<T> {
    const fn new() -> Self {
        Self {
            active: Mutex::new(EnvelopeList::new()),
            spare: Mutex::new(EnvelopeList::new()),
        }
    }
}

impl<T> ShardedObjectPool<T> {
    /// Creates a pool with the default configuration that uses `factory` to construct objects
    /// whenever it has none to hand out.
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
    pub fn builder() -> ShardedObjectPoolBuilder<T> {
        ShardedObjectPoolBuilder::new()
    }

    pub(crate) fn new_inner(
        shard_count: NonZero<usize>,
        capacity: NonZero<usize>,
        factory: Factory<T>,
    ) -> Self {
        let shards = (0..shard_count.get())
            .map(|_| CachePadded::new(Shard::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            capacity,
            capacity_limit: isize::try_from(capacity.get()).unwrap_or(isize::MAX),
            resident: CachePadded::new(AtomicIsize::new(0)),
            spare_envelopes: CachePadded::new(AtomicIsize::new(0)),
            get_cursor: CachePadded::new(AtomicUsize::new(0)),
            put_cursor: CachePadded::new(AtomicUsize::new(0)),
            factory,
        }
    }

    /// Borrows an object from the pool.
    ///
    /// Returns a pooled object if the shard selected for this call has one, otherwise a new
    /// object from the factory. Both cases must be treated identically by the caller.
    ///
    /// # Panics
    ///
    /// Panics raised by the factory propagate to the caller. The pool remains usable.
    #[must_use]
    pub fn get(&self) -> T {
        // Fast path: nothing pooled anywhere, so do not even pick a shard.
        if self.resident.load(Ordering::Relaxed) <= 0 {
            return self.create();
        }

        let index = Self::next_index(&self.get_cursor, self.shards.len());
        let shard = self.shard(index);

        // Bound separately so the guard is released before we might call the factory.
        let popped = shard.active.lock().pop_front();

        let Some(mut envelope) = popped else {
            // The counter said there was something to take but it was elsewhere (or already
            // taken). We do not go looking in other shards.
            trace!(
                shard = index,
                "selected shard is empty, constructing new object"
            );
            return self.create();
        };

        self.resident.fetch_sub(1, Ordering::Relaxed);

        let payload = envelope
            .take()
            .expect("envelopes in an active list always carry a payload");

        if self.spare_envelopes.load(Ordering::Relaxed) < self.capacity_limit {
            self.spare_envelopes.fetch_add(1, Ordering::Relaxed);
            shard.spare.lock().push_back(envelope);
        } else {
            drop(envelope);
        }

        SHARDED_GET_RECYCLED.with(|e| e.observe_once());

        payload
    }

    /// Returns an object to the pool.
    ///
    /// If the pool already holds [`capacity()`][Self::capacity] objects, the object is dropped
    /// instead. This bounds the memory the pool can pin down.
    pub fn put(&self, payload: T) {
        if self.resident.load(Ordering::Relaxed) >= self.capacity_limit {
            trace!(
                capacity = self.capacity.get(),
                "pool is at capacity, discarding object"
            );
            SHARDED_PUT_DISCARDED.with(|e| e.observe_once());
            drop(payload);
            return;
        }

        let index = Self::next_index(&self.put_cursor, self.shards.len());
        let shard = self.shard(index);

        let recycled = shard.spare.lock().pop_front();

        let envelope = match recycled {
            Some(mut envelope) => {
                self.spare_envelopes.fetch_sub(1, Ordering::Relaxed);
                envelope.fill(payload);
                envelope
            }
            None => Envelope::new(payload),
        };

        shard.active.lock().push_back(envelope);
        self.resident.fetch_add(1, Ordering::Relaxed);

        SHARDED_PUT_STORED.with(|e| e.observe_once());
    }

    /// The number of shards the pool spreads its objects over.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The soft cap on the number of objects kept available for reuse.
    ///
    /// Concurrent [`put()`][Self::put] calls may briefly push the true count above this, by at
    /// most the number of calls in flight.
    #[must_use]
    pub fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Approximately how many objects are available for reuse.
    ///
    /// Exact once all concurrent calls into the pool have returned; may lag behind while calls
    /// are in flight.
    #[must_use]
    pub fn resident(&self) -> usize {
        usize::try_from(self.resident.load(Ordering::Relaxed)).unwrap_or(0)
    }

    /// Approximately how many empty envelopes are cached for reuse by [`put()`][Self::put].
    #[must_use]
    pub fn spare_envelopes(&self) -> usize {
        usize::try_from(self.spare_envelopes.load(Ordering::Relaxed)).unwrap_or(0)
    }

    fn create(&self) -> T {
        SHARDED_GET_CREATED.with(|e| e.observe_once());
        (self.factory)()
    }

    #[allow(
        clippy::arithmetic_side_effects,
        clippy::modulo_arithmetic,
        reason = "shard count is never zero; the cursor is allowed to wrap around"
    )]
    fn next_index(cursor: &AtomicUsize, shard_count: usize) -> usize {
        // Relaxed: the cursor only spreads load, it does not order anything.
        cursor.fetch_add(1, Ordering::Relaxed) % shard_count
    }

    #[allow(
        clippy::indexing_slicing,
        reason = "next_index() only yields indexes below the shard count"
    )]
    fn shard(&self, index: usize) -> &Shard<T> {
        &self.shards[index]
    }

    /// Counts the objects actually linked into the active lists, taking every lock in turn.
    #[cfg(test)]
    pub(crate) fn true_resident(&self) -> usize {
        self.shards.iter().map(|s| s.active.lock().len()).sum()
    }

    #[cfg(test)]
    pub(crate) fn true_spare_envelopes(&self) -> usize {
        self.shards.iter().map(|s| s.spare.lock().len()).sum()
    }
}

impl<T> ObjectPool for ShardedObjectPool<T> {
    type Item = T;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn get(&self) -> T {
        Self::get(self)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn put(&self, item: T) {
        Self::put(self, item);
    }
}

impl<T> fmt::Debug for ShardedObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("shard_count", &self.shards.len())
            .field("capacity", &self.capacity)
            .field("resident", &self.resident.load(Ordering::Relaxed))
            .field(
                "spare_envelopes",
                &self.spare_envelopes.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}
