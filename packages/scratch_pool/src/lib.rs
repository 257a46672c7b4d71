#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Best-effort concurrent object pools for recycling scratch objects across worker threads.
//!
//! A query engine churns through short-lived scratch objects: evaluation buffers, intermediate
//! row sets, hash tables for a single operator invocation. This package lets worker threads hand
//! such objects back and forth without a global lock becoming the bottleneck and without memory
//! growing without bound.
//!
//! Both pools are *best-effort*. They never block, never fail and never make the caller wait for
//! an object. In exchange they make no promise that an object you put in will ever come back
//! out. Reuse is a performance optimization, never a correctness requirement.
//!
//! # Pools
//!
//! * [`ShardedObjectPool`] spreads objects over independently locked shards (one per processor,
//!   within [`MIN_SHARDS`]..=[`MAX_SHARDS`]) and keeps at most [`POOL_CAPACITY`] objects. Each
//!   lock is held only for a pointer splice.
//! * [`LocklessRingPool`] keeps boxed objects in a fixed ring of [`RING_CAPACITY`] atomic slots.
//!   It never takes a lock but loses objects more readily under contention.
//!
//! Both implement [`ObjectPool`], so consumers can be written against either.
//!
//! # Once-gate
//!
//! [`ResettableOnce`] runs an action at most once per generation without making losing callers
//! wait, and can be reset to start a new generation.
//!
//! # Example
//!
//! ```
//! use std::sync::LazyLock;
//!
//! use scratch_pool::ShardedObjectPool;
//!
//! // Process-wide pool of evaluation buffers, shared by all worker threads.
//! static EVAL_BUFFERS: LazyLock<ShardedObjectPool<Vec<f64>>> =
//!     LazyLock::new(|| ShardedObjectPool::new(|| Vec::with_capacity(1024)));
//!
//! fn evaluate(values: &[f64]) -> f64 {
//!     let mut buffer = EVAL_BUFFERS.get();
//!     buffer.clear(); // Pools do not reset objects for us.
//!     buffer.extend(values.iter().map(|v| v * 2.0));
//!     let result = buffer.iter().sum();
//!     EVAL_BUFFERS.put(buffer);
//!     result
//! }
//!
//! assert_eq!(evaluate(&[1.0, 2.0]), 6.0);
//! ```
//!
//! # Observability
//!
//! Pool construction is logged at `debug` level and the lossy paths (discarded objects, empty
//! shards, overwritten slots) at `trace` level via [`tracing`]. Hit and miss counts are published
//! as [`nm`] events named `scratch_pool_*`.

mod constants;
mod metrics;
mod object_pool;
mod resettable_once;
mod ring_pool;
mod ring_pool_builder;
mod shard_list;
mod sharded_pool;
mod sharded_pool_builder;

pub use constants::{MAX_SHARDS, MIN_SHARDS, POOL_CAPACITY, RING_CAPACITY};
pub use object_pool::*;
pub use resettable_once::*;
pub use ring_pool::*;
pub use ring_pool_builder::*;
pub use sharded_pool::ShardedObjectPool;
pub use sharded_pool_builder::*;
