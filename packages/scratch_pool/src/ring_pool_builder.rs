use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use tracing::debug;

use crate::{LocklessRingPool, RING_CAPACITY};

/// Builder for creating an instance of [`LocklessRingPool`].
///
/// # Example
///
/// ```
/// use new_zealand::nz;
/// use scratch_pool::LocklessRingPool;
///
/// let pool = LocklessRingPool::builder()
///     .capacity(nz!(64))
///     .build(|| vec![0_u8; 512]);
///
/// assert_eq!(pool.capacity().get(), 64);
/// ```
#[must_use]
pub struct LocklessRingPoolBuilder<T> {
    capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> LocklessRingPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: RING_CAPACITY,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the ring.
    ///
    /// Default is [`RING_CAPACITY`].
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builds the pool, using `factory` to construct objects whenever a probed slot is empty.
    #[must_use]
    pub fn build<F>(self, factory: F) -> LocklessRingPool<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        debug!(
            item_type = type_name::<T>(),
            capacity = self.capacity.get(),
            "creating lockless ring pool"
        );

        LocklessRingPool::new_inner(self.capacity, Box::new(factory))
    }
}

impl<T> fmt::Debug for LocklessRingPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
