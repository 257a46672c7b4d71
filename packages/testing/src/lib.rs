#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and benchmarking the `scratch_pool` package.

use std::num::NonZero;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

/// Runs a test with a timeout to turn hangs into failures.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under Miri, where
/// thread synchronization is dramatically slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled
/// and the test function is executed directly, so mutation testing can detect hanging mutants.
///
/// # Panics
///
/// Panics if the test exceeds the timeout or if the test itself panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// with_watchdog(|| {
///     assert_eq!(2 + 2, 4);
/// });
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already given up on us.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {}-second timeout", timeout.as_secs());
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Runs `f` on `thread_count` threads that are released simultaneously from a barrier.
///
/// Each thread receives its index in `0..thread_count`. The results are returned in index
/// order. Lining the threads up on a barrier maximizes the chance that their calls into the
/// code under test actually overlap.
///
/// # Panics
///
/// Re-raises the panic of any worker thread.
pub fn run_in_lockstep<F, R>(thread_count: NonZero<usize>, f: F) -> Vec<R>
where
    F: Fn(usize) -> R + Sync,
    R: Send,
{
    let barrier = Barrier::new(thread_count.get());

    thread::scope(|s| {
        let handles = (0..thread_count.get())
            .map(|index| {
                let barrier = &barrier;
                let f = &f;

                s.spawn(move || {
                    barrier.wait();
                    f(index)
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

/// A payload with a process-unique identity, for asserting which instance came out of a pool.
///
/// Markers are deliberately not `Clone`: the only way to get the same marker twice is for a
/// pool to hand out an instance it was given.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    id: u64,
}

static NEXT_MARKER_ID: AtomicU64 = AtomicU64::new(1);

impl Marker {
    /// Creates a marker whose identity differs from every other marker in the process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_MARKER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// The identity of this marker.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts how many times a factory closure has been invoked.
///
/// Clones share the same count, so one clone can be moved into a pool's factory while the
/// test keeps another for inspection.
#[derive(Clone, Debug, Default)]
pub struct CallCounter {
    count: Arc<AtomicU64>,
}

impl CallCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one invocation.
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of invocations recorded so far, by all clones.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
