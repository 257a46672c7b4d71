/// The borrow/return contract shared by every pool in this crate.
///
/// Consumers such as plan operators or expression evaluators can be written against this trait
/// and handed whichever pool flavor suits their payload.
///
/// Implementations are best-effort: [`get()`][Self::get] may hand out a freshly constructed
/// object even right after a [`put()`][Self::put], and [`put()`][Self::put] may drop the object
/// instead of keeping it. Callers must treat fresh and recycled objects identically, which
/// includes resetting any state a recycled object may still carry.
///
/// # Example
///
/// ```
/// use scratch_pool::{LocklessRingPool, ObjectPool, ShardedObjectPool};
///
/// fn sum_with_scratch<P>(pool: &P, values: &[u32]) -> u32
/// where
///     P: ObjectPool,
///     P::Item: AsMut<Vec<u32>>,
/// {
///     let mut scratch = pool.get();
///     let buffer = scratch.as_mut();
///     buffer.clear();
///     buffer.extend_from_slice(values);
///     let sum = buffer.iter().sum();
///     pool.put(scratch);
///     sum
/// }
///
/// let sharded = ShardedObjectPool::new(Vec::<u32>::new);
/// let ring = LocklessRingPool::new(Vec::<u32>::new);
///
/// assert_eq!(sum_with_scratch(&sharded, &[1, 2, 3]), 6);
/// assert_eq!(sum_with_scratch(&ring, &[4, 5]), 9);
/// ```
pub trait ObjectPool {
    /// The type of object handed out and taken back by the pool.
    type Item;

    /// Borrows an object from the pool, constructing a new one if none is available.
    fn get(&self) -> Self::Item;

    /// Returns an object to the pool. The pool may drop it instead of keeping it.
    fn put(&self, item: Self::Item);
}
