//! Metrics for the pools.
//!
//! Every event counts occurrences; none of them carry a meaningful magnitude. Comparing the
//! "recycled" and "created" counts tells how much work the pools actually save, while the
//! "discarded" and "overwrote" counts show how often the lossy paths are taken.

use nm::Event;

thread_local! {
    /// A `ShardedObjectPool::get()` returned a pooled object.
    pub(crate) static SHARDED_GET_RECYCLED: Event = Event::builder()
        .name("scratch_pool_sharded_get_recycled")
        .build();

    /// A `ShardedObjectPool::get()` fell back to the factory.
    pub(crate) static SHARDED_GET_CREATED: Event = Event::builder()
        .name("scratch_pool_sharded_get_created")
        .build();

    /// A `ShardedObjectPool::put()` made an object available for reuse.
    pub(crate) static SHARDED_PUT_STORED: Event = Event::builder()
        .name("scratch_pool_sharded_put_stored")
        .build();

    /// A `ShardedObjectPool::put()` dropped the object because the pool was at capacity.
    pub(crate) static SHARDED_PUT_DISCARDED: Event = Event::builder()
        .name("scratch_pool_sharded_put_discarded")
        .build();

    /// A `LocklessRingPool::get()` returned a pooled object.
    pub(crate) static RING_GET_RECYCLED: Event = Event::builder()
        .name("scratch_pool_ring_get_recycled")
        .build();

    /// A `LocklessRingPool::get()` found an empty slot and fell back to the factory.
    pub(crate) static RING_GET_CREATED: Event = Event::builder()
        .name("scratch_pool_ring_get_created")
        .build();

    /// A `LocklessRingPool::put()` replaced an object that was never fetched.
    pub(crate) static RING_PUT_OVERWROTE: Event = Event::builder()
        .name("scratch_pool_ring_put_overwrote")
        .build();
}
