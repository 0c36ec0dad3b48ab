/*!
 * Run context and single-run guard
 *
 * A run can only start through [`RunLock::begin`], which flips an atomic
 * flag with a compare-and-set. The returned [`RunContext`] owns the worker
 * pool and a handle on the shared gauge registry; dropping it releases the
 * pool and then clears the flag, whether the run succeeded, failed or
 * unwound.
 */

use crate::core::WorkerPool;
use crate::error::{AnalyserError, Result};
use analyser_observability::GaugeRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared single-run guard
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    busy: Arc<AtomicBool>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run currently holds the lock
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a run without waiting
    ///
    /// Fails with `RunAlreadyInProgress` while another context is alive.
    pub fn begin(
        &self,
        concurrency: Option<usize>,
        gauges: Arc<GaugeRegistry>,
    ) -> Result<RunContext> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnalyserError::RunAlreadyInProgress)?;

        let permit = RunPermit {
            busy: Arc::clone(&self.busy),
        };
        let pool = WorkerPool::new(concurrency);
        tracing::debug!("Run started with {} workers", pool.workers());

        Ok(RunContext {
            pool,
            gauges,
            _permit: permit,
        })
    }
}

/// Clears the run flag when dropped
#[derive(Debug)]
struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Resources owned by one run
///
/// Field order matters: the pool is released before the permit is dropped.
#[derive(Debug)]
pub struct RunContext {
    pool: WorkerPool,
    gauges: Arc<GaugeRegistry>,
    _permit: RunPermit,
}

impl RunContext {
    /// Context for a one-shot process with its own lock and registry
    pub fn standalone(concurrency: Option<usize>) -> Result<Self> {
        RunLock::new().begin(concurrency, Arc::new(GaugeRegistry::new()))
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn gauges(&self) -> &GaugeRegistry {
        &self.gauges
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        self.pool.release();
        tracing::debug!("Run finished, lock released");
    }
}
