//! Worker threads sharing process-wide scratch pools, plus a once-gate that re-arms per batch.

use std::sync::LazyLock;
use std::thread;

use scratch_pool::{LocklessRingPool, ResettableOnce, ShardedObjectPool};

// Row buffers reused by every worker. Objects come back dirty, so callers clear them.
static ROW_BUFFERS: LazyLock<ShardedObjectPool<Vec<i64>>> =
    LazyLock::new(|| ShardedObjectPool::new(|| Vec::with_capacity(1024)));

// Large hash tables are boxed anyway, so the lock-free ring suits them.
static KEY_SETS: LazyLock<LocklessRingPool<Vec<u64>>> =
    LazyLock::new(|| LocklessRingPool::new(|| Vec::with_capacity(4096)));

static BATCH_BANNER: ResettableOnce = ResettableOnce::new();

fn process_partition(partition: usize) -> i64 {
    BATCH_BANNER.call_once(|| println!("first worker started a new batch"));

    let mut rows = ROW_BUFFERS.get();
    rows.clear();
    rows.extend((0..100).map(|i| i * i64::try_from(partition).unwrap_or(0)));

    let mut keys = KEY_SETS.get();
    keys.clear();
    keys.extend(rows.iter().map(|&v| v.unsigned_abs() % 7));
    keys.sort_unstable();
    keys.dedup();

    let result = rows.iter().sum::<i64>() + i64::try_from(keys.len()).unwrap_or(0);

    ROW_BUFFERS.put(rows);
    KEY_SETS.put(keys);

    result
}

fn main() {
    for batch in 0..3 {
        let total: i64 = thread::scope(|s| {
            let workers = (0..8)
                .map(|partition| s.spawn(move || process_partition(partition)))
                .collect::<Vec<_>>();

            workers
                .into_iter()
                .map(|worker| worker.join().expect("worker thread panicked"))
                .sum()
        });

        println!("batch {batch}: total {total}");
        println!(
            "row buffers available for reuse: {}",
            ROW_BUFFERS.resident()
        );

        BATCH_BANNER.reset();
    }
}
