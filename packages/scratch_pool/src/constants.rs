use std::num::NonZero;

use new_zealand::nz;

/// The fewest shards a [`ShardedObjectPool`][crate::ShardedObjectPool] will ever use.
///
/// Even on machines with few processors we want enough shards that two threads hammering the
/// pool are unlikely to land on the same lock.
pub const MIN_SHARDS: NonZero<usize> = nz!(8);

/// The most shards a [`ShardedObjectPool`][crate::ShardedObjectPool] will ever use.
///
/// Past this point extra shards only spread the pooled objects thinner, making it more likely
/// that a `get()` lands on an empty shard and falls back to the factory.
pub const MAX_SHARDS: NonZero<usize> = nz!(64);

/// Default soft cap on the number of objects a [`ShardedObjectPool`][crate::ShardedObjectPool]
/// keeps available for reuse. Also caps the number of cached spare envelopes.
pub const POOL_CAPACITY: NonZero<usize> = nz!(1024);

/// Default number of slots in a [`LocklessRingPool`][crate::LocklessRingPool].
pub const RING_CAPACITY: NonZero<usize> = nz!(1024);

/// Clamps a requested shard count into `[MIN_SHARDS, MAX_SHARDS]`.
pub(crate) fn clamp_shard_count(requested: NonZero<usize>) -> NonZero<usize> {
    requested.clamp(MIN_SHARDS, MAX_SHARDS)
}
