//! Data-parallel worker pool.
//!
//! Every pass is "run this pure function over index range N with W
//! workers". [`WorkerPool`] owns a dedicated rayon pool so the crowd never
//! competes with, or depends on, the global pool of the host application.
//! Results are collected in index order, so output never depends on how
//! work was split.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Upper bound on explicit worker counts.
pub const MAX_WORKERS: usize = 64;

/// A fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Resolve a worker count: `None` is `available_parallelism`, explicit
    /// values are clamped to `[1, MAX_WORKERS]`.
    pub fn resolve_workers(requested: Option<usize>) -> usize {
        match requested {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, MAX_WORKERS),
        }
    }

    /// Start a pool with `requested` workers (see
    /// [`resolve_workers`](Self::resolve_workers)).
    pub fn new(requested: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let workers = Self::resolve_workers(requested);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("horde-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` inside the pool, so rayon iterators it starts use these
    /// workers.
    pub fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(f)
    }

    /// `(0..n).map(f)` computed in parallel, collected in index order.
    pub fn map_range<T, F>(&self, n: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.pool.install(|| (0..n).into_par_iter().map(f).collect())
    }

    /// Overwrite `out[i] = f(i)` in parallel.
    pub fn fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.pool.install(|| {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(i, slot)| *slot = f(i))
        })
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_counts_are_clamped() {
        assert_eq!(WorkerPool::resolve_workers(Some(0)), 1);
        assert_eq!(WorkerPool::resolve_workers(Some(8)), 8);
        assert_eq!(WorkerPool::resolve_workers(Some(1000)), MAX_WORKERS);
        assert!(WorkerPool::resolve_workers(None) >= 1);
    }

    #[test]
    fn map_range_is_index_ordered() {
        let pool = WorkerPool::new(Some(3)).unwrap();
        let out = pool.map_range(1000, |i| i * 2);
        assert_eq!(out.len(), 1000);
        assert!(out.iter().enumerate().all(|(i, &v)| v == i * 2));
    }

    #[test]
    fn fill_overwrites_every_slot() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        let mut buf = vec![0u32; 257];
        pool.fill(&mut buf, |i| i as u32 + 1);
        assert_eq!(buf[0], 1);
        assert_eq!(buf[256], 257);
    }

    #[test]
    fn single_worker_matches_many() {
        let one = WorkerPool::new(Some(1)).unwrap();
        let many = WorkerPool::new(Some(4)).unwrap();
        let f = |i: usize| (i as f32 * 0.37).sin();
        assert_eq!(one.map_range(500, f), many.map_range(500, f));
    }
}
