/*!
 * Bounded worker pool for fanning out provider calls
 *
 * Concurrency ≤ 1 runs every unit inline on the calling thread. Anything
 * larger uses a rayon thread pool that is built on first use, reused by
 * every later `map` and dropped by `release()`.
 */

use crate::error::{AnalyserError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, Mutex};

/// Number of workers used when no override is given
///
/// Falls back to 1 when the parallelism of the host cannot be detected.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|e| {
            tracing::warn!("Could not detect available parallelism ({}), using 1 worker", e);
            1
        })
}

/// Lazily built worker pool
pub struct WorkerPool {
    workers: usize,
    pool: Mutex<Option<Arc<ThreadPool>>>,
}

impl WorkerPool {
    /// Create a pool handle. Nothing is spawned until the first parallel `map`.
    ///
    /// # Arguments
    /// * `concurrency` - Worker count, `None` = available parallelism
    pub fn new(concurrency: Option<usize>) -> Self {
        Self {
            workers: concurrency.unwrap_or_else(default_concurrency),
            pool: Mutex::new(None),
        }
    }

    /// Configured number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether units run on the calling thread
    pub fn is_inline(&self) -> bool {
        self.workers <= 1
    }

    /// Whether worker threads are currently alive
    pub fn is_active(&self) -> bool {
        self.pool.lock().map(|p| p.is_some()).unwrap_or(false)
    }

    fn handle(&self) -> Result<Arc<ThreadPool>> {
        let mut guard = self
            .pool
            .lock()
            .map_err(|_| AnalyserError::Pool("worker pool lock poisoned".to_string()))?;

        if let Some(pool) = guard.as_ref() {
            return Ok(Arc::clone(pool));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("s3-analyser-worker-{}", i))
            .build()
            .map_err(|e| AnalyserError::Pool(e.to_string()))?;
        tracing::debug!("Started worker pool with {} threads", self.workers);

        let pool = Arc::new(pool);
        *guard = Some(Arc::clone(&pool));
        Ok(pool)
    }

    /// Apply `f` to every item and collect the results in input order
    ///
    /// Fails with the error of the first failing item (in input order). In
    /// parallel mode every dispatched unit still runs to completion before
    /// the error is returned.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        if self.is_inline() || items.len() <= 1 {
            return items.iter().map(&f).collect();
        }

        let pool = self.handle()?;
        let results: Vec<Result<R>> = pool.install(|| items.par_iter().map(&f).collect());
        results.into_iter().collect()
    }

    /// Tear down the worker threads; a later `map` builds a fresh pool
    pub fn release(&self) {
        let released = match self.pool.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if released.is_some() {
            tracing::debug!("Released worker pool");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("active", &self.is_active())
            .finish()
    }
}
