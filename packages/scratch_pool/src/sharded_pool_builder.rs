use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use many_cpus::ProcessorSet;
use tracing::debug;

use crate::constants::clamp_shard_count;
use crate::{MIN_SHARDS, POOL_CAPACITY, ShardedObjectPool};

/// Builder for creating an instance of [`ShardedObjectPool`].
///
/// You only need the builder to customize the pool. The defaults used by
/// [`ShardedObjectPool::new()`] suit most use cases.
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use scratch_pool::ShardedObjectPool;
///
/// let pool = ShardedObjectPool::builder()
///     .shard_count(nz!(16))
///     .capacity(nz!(256))
///     .build(String::new);
///
/// assert_eq!(pool.shard_count(), 16);
/// assert_eq!(pool.capacity().get(), 256);
/// ```
#[must_use]
pub struct ShardedObjectPoolBuilder<T> {
    shard_count: Option<NonZero<usize>>,
    capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> ShardedObjectPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            shard_count: None,
            capacity: POOL_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the number of shards.
    ///
    /// The value is clamped to [`MIN_SHARDS`]..=[`MAX_SHARDS`][crate::MAX_SHARDS]. If not set,
    /// the pool uses one shard per processor available to the current process, clamped the
    /// same way.
    pub fn shard_count(mut self, shard_count: NonZero<usize>) -> Self {
        self.shard_count = Some(shard_count);
        self
    }

    /// Sets the soft cap on the number of objects the pool keeps available for reuse.
    ///
    /// The same cap applies to the number of empty envelopes cached between calls.
    ///
    /// Default is [`POOL_CAPACITY`].
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the pool, using `factory` to construct objects whenever it has none to hand out.
    #[must_use]
    pub fn build<F>(self, factory: F) -> ShardedObjectPool<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let requested = self.shard_count.unwrap_or_else(available_processor_count);
        let shard_count = clamp_shard_count(requested);

        debug!(
            item_type = type_name::<T>(),
            requested_shards = requested.get(),
            shard_count = shard_count.get(),
            capacity = self.capacity.get(),
            "creating sharded object pool"
        );

        ShardedObjectPool::new_inner(shard_count, self.capacity, Box::new(factory))
    }
}

#[cfg_attr(test, mutants::skip)] // Depends on the machine the tests happen to run on.
fn available_processor_count() -> NonZero<usize> {
    NonZero::new(ProcessorSet::default().len()).unwrap_or(MIN_SHARDS)
}

impl<T> fmt::Debug for ShardedObjectPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("shard_count", &self.shard_count)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
