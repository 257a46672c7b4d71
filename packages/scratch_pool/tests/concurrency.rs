//! Multi-threaded tests of the pool guarantees that hold no matter how calls interleave.
//!
//! These are ignored under Miri, which is far too slow for this amount of thread churn.

use std::collections::HashSet;
use std::num::NonZero;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use new_zealand::nz;
use scratch_pool::{LocklessRingPool, ObjectPool, ResettableOnce, ShardedObjectPool};
use testing::{CallCounter, Marker, run_in_lockstep, with_watchdog};

const THREADS: NonZero<usize> = nz!(8);
const ITERATIONS: usize = 5_000;

/// Hammers `pool` from several threads while tracking which markers are checked out.
///
/// A marker that is handed out while it is already checked out means two callers received
/// the same instance.
fn assert_no_double_issuance<P>(pool: &P)
where
    P: ObjectPool + Sync,
    P::Item: AsRef<Marker>,
{
    let checked_out = Mutex::new(HashSet::new());

    run_in_lockstep(THREADS, |thread_index| {
        let mut held = Vec::new();

        for i in 0..ITERATIONS {
            let item = pool.get();
            let id = item.as_ref().id();

            assert!(
                checked_out.lock().unwrap().insert(id),
                "marker {id} was handed out twice"
            );

            held.push(item);

            // Vary how many objects each thread holds so gets and puts interleave unevenly.
            if (i + thread_index) % 3 != 0 {
                while let Some(item) = held.pop() {
                    checked_out.lock().unwrap().remove(&item.as_ref().id());
                    pool.put(item);
                }
            }
        }

        for item in held {
            checked_out.lock().unwrap().remove(&item.as_ref().id());
            pool.put(item);
        }
    });
}

/// Wraps a marker so sharded pool items expose it through `AsRef`, like the ring pool's boxes.
#[derive(Debug)]
struct Owned(Marker);

impl AsRef<Marker> for Owned {
    fn as_ref(&self) -> &Marker {
        &self.0
    }
}

#[cfg_attr(miri, ignore)]
#[test]
fn sharded_pool_never_hands_out_same_instance_twice() {
    with_watchdog(|| {
        let pool = ShardedObjectPool::builder()
            .capacity(nz!(64))
            .build(|| Owned(Marker::new()));

        assert_no_double_issuance(&pool);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn ring_pool_never_hands_out_same_instance_twice() {
    with_watchdog(|| {
        let pool = LocklessRingPool::builder()
            .capacity(nz!(16))
            .build(Marker::new);

        assert_no_double_issuance(&pool);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn sharded_pool_resident_settles_within_capacity() {
    with_watchdog(|| {
        let created = CallCounter::new();
        let factory_counter = created.clone();

        let pool = ShardedObjectPool::builder()
            .capacity(nz!(100))
            .build(move || {
                factory_counter.record();
                Marker::new()
            });

        run_in_lockstep(THREADS, |thread_index| {
            for i in 0..ITERATIONS {
                if (i + thread_index) % 4 == 0 {
                    drop(pool.get());
                } else {
                    pool.put(Marker::new());
                }
            }
        });

        // Every put checks the counter before adding, so at most one in-flight put per thread
        // can slip past a full pool.
        let resident = pool.resident();
        assert!(resident <= 100 + THREADS.get());

        // Once quiet, the counter is exact: draining recycles exactly that many objects. Some
        // gets may still land on empty shards and construct new objects instead.
        let created_before = created.get();
        let mut gets = 0_u64;

        while pool.resident() > 0 {
            drop(pool.get());
            gets += 1;
        }

        let recycled = gets - (created.get() - created_before);
        assert_eq!(recycled, u64::try_from(resident).unwrap());
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn resettable_once_fires_once_per_generation_under_contention() {
    with_watchdog(|| {
        let gate = ResettableOnce::new();
        let runs = AtomicUsize::new(0);

        for generation in 1..=20 {
            run_in_lockstep(THREADS, |_| {
                for _ in 0..100 {
                    gate.call_once(|| {
                        runs.fetch_add(1, Ordering::Relaxed);
                    });
                }
            });

            assert_eq!(runs.load(Ordering::Relaxed), generation);
            gate.reset();
        }
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn pools_are_shareable_between_threads() {
    with_watchdog(|| {
        let sharded = ShardedObjectPool::new(Vec::<u64>::new);
        let ring = LocklessRingPool::new(Vec::<u64>::new);

        let totals = run_in_lockstep(THREADS, |thread_index| {
            let mut total = 0;

            for i in 0..1_000_u64 {
                let mut a = sharded.get();
                let mut b = ring.get();

                a.clear();
                b.clear();
                a.push(i);
                b.push(u64::try_from(thread_index).unwrap());

                total += a[0] + b[0];

                sharded.put(a);
                ring.put(b);
            }

            total
        });

        for (thread_index, total) in totals.into_iter().enumerate() {
            let expected =
                (0..1_000_u64).sum::<u64>() + 1_000 * u64::try_from(thread_index).unwrap();
            assert_eq!(total, expected);
        }
    });
}
