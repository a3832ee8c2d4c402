//! Data-parallel batch execution.
//!
//! A batch of `N` samples is cut into at most `T` contiguous sub-batches.
//! Each sub-batch is handed, together with one worker-private state, to a
//! task running on a fixed-size rayon pool. Results come back in worker
//! index order regardless of which task finished first, so any reduction the
//! caller performs over them is deterministic.

use crate::error::NeuraGraphError;
use log::trace;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::ops::Range;

#[derive(Debug)]
pub struct BatchScheduler {
    threads: usize,
    /// `None` when running single-threaded: tasks execute inline.
    pool: Option<ThreadPool>,
}

impl BatchScheduler {
    /// Creates a scheduler with `threads` workers.
    ///
    /// # Errors
    /// `ConfigurationError` for zero threads, `ThreadPool` if the pool cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, NeuraGraphError> {
        if threads == 0 {
            return Err(NeuraGraphError::ConfigurationError(
                "thread count must be at least 1".to_string(),
            ));
        }
        let pool = if threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("neuragraph-worker-{i}"))
                    .build()
                    .map_err(|e| NeuraGraphError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(BatchScheduler { threads, pool })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Splits `0..n` into `min(n, t)` contiguous ranges whose lengths differ
    /// by at most one. Earlier ranges get the extra samples.
    pub fn partition(n: usize, t: usize) -> Vec<Range<usize>> {
        let parts = n.min(t.max(1));
        if parts == 0 {
            return Vec::new();
        }
        let base = n / parts;
        let extra = n % parts;
        let mut start = 0;
        (0..parts)
            .map(|i| {
                let len = base + usize::from(i < extra);
                let range = start..start + len;
                start += len;
                range
            })
            .collect()
    }

    /// Runs `task` once per range, pairing range `i` with `workers[i]`.
    ///
    /// Returns the task results in range order.
    pub fn run<W, R, F>(&self, workers: &mut [W], ranges: &[Range<usize>], task: F) -> Vec<R>
    where
        W: Send,
        R: Send,
        F: Fn(&mut W, Range<usize>) -> R + Sync,
    {
        trace!("scheduling {} sub-batches: {:?}", ranges.len(), ranges);
        match &self.pool {
            Some(pool) if ranges.len() > 1 => pool.install(|| {
                workers
                    .par_iter_mut()
                    .zip(ranges.par_iter())
                    .map(|(worker, range)| task(worker, range.clone()))
                    .collect()
            }),
            _ => workers
                .iter_mut()
                .zip(ranges)
                .map(|(worker, range)| task(worker, range.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_contiguous_and_balanced() {
        let ranges = BatchScheduler::partition(10, 3);
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);

        let ranges = BatchScheduler::partition(4, 8);
        assert_eq!(ranges, vec![0..1, 1..2, 2..3, 3..4]);

        assert_eq!(BatchScheduler::partition(5, 1), vec![0..5]);
        assert!(BatchScheduler::partition(0, 4).is_empty());
    }

    #[test]
    fn test_partition_covers_every_sample_once() {
        for n in 1..40 {
            for t in 1..9 {
                let ranges = BatchScheduler::partition(n, t);
                let covered: Vec<usize> = ranges.iter().cloned().flatten().collect();
                assert_eq!(covered, (0..n).collect::<Vec<_>>());
                let lens: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
                let (min, max) = (lens.iter().min().unwrap(), lens.iter().max().unwrap());
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_results_come_back_in_range_order() -> Result<(), NeuraGraphError> {
        let scheduler = BatchScheduler::new(4)?;
        let ranges = BatchScheduler::partition(100, 4);
        let mut workers = vec![0usize; ranges.len()];
        let sums = scheduler.run(&mut workers, &ranges, |w, range| {
            *w = range.len();
            range.sum::<usize>()
        });
        let expected: Vec<usize> = ranges.iter().map(|r| r.clone().sum()).collect();
        assert_eq!(sums, expected);
        assert_eq!(workers, vec![25, 25, 25, 25]);
        Ok(())
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(BatchScheduler::new(0).unwrap_err().is_configuration());
    }
}
