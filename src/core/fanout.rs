//! Ordered parallel map over independent buckets.
//!
//! Buckets are handed to a small pool of scoped worker threads and the
//! results come back over a channel tagged with their input index, so the
//! output order never depends on completion order.

use crossbeam_channel::unbounded;
use std::thread;

/// Apply `f` to every item, possibly in parallel, preserving input order.
pub fn ordered_map<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(items.len());

    if workers <= 1 {
        return items.into_iter().map(f).collect();
    }

    let count = items.len();
    let (job_tx, job_rx) = unbounded::<(usize, T)>();
    let (result_tx, result_rx) = unbounded::<(usize, R)>();

    for job in items.into_iter().enumerate() {
        // The receiver is still held here, so sending cannot fail
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let f = &f;
            scope.spawn(move || {
                for (index, item) in job_rx.iter() {
                    if result_tx.send((index, f(item))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, R)> = Vec::with_capacity(count);
    results.extend(result_rx.iter());
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}
