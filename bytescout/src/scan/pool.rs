//! Pool coordinator - owns the slots and the workers bound to them
//!
//! The coordinator is responsible for:
//! - Spawning one worker per slot before the walk starts
//! - Waiting for every dispatched task to finish once the walk is done
//! - Stopping every slot and joining every worker thread
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::matcher::ByteMatcher;
use super::slot::SlotBoard;
use super::worker::{Worker, WorkerContext};
use crate::errors::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::report::ReportSink;

/// Fixed-size set of (worker, slot) pairs
pub struct WorkerPool {
    board: Arc<SlotBoard>,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawn `size` workers.
    ///
    /// Slots start Stopped and each worker flips its own slot to Ready once
    /// its thread is running, so nothing can be assigned before a consumer
    /// exists. If any thread fails to spawn, the ones already running are
    /// stopped and joined before the error is returned.
    pub fn start(
        size: NonZeroUsize,
        matcher: Arc<ByteMatcher>,
        sink: Arc<dyn ReportSink>,
        metrics: ScanMetrics,
    ) -> ScanResult<Self> {
        let size = size.get();
        let board = Arc::new(SlotBoard::new(size, metrics.clone()));
        let ctx = WorkerContext {
            board: Arc::clone(&board),
            matcher,
            sink,
            metrics,
        };

        let mut pool = Self {
            board,
            workers: Vec::with_capacity(size),
        };
        for id in 0..size {
            match Worker::spawn(id, ctx.clone()) {
                Ok(worker) => pool.workers.push(worker),
                Err(e) => {
                    error!("{}", e);
                    // Drop stops and joins the workers spawned so far
                    return Err(e);
                }
            }
        }

        info!(workers = size, "Worker pool started");
        Ok(pool)
    }

    /// The slots the walker dispatches into
    pub fn board(&self) -> &SlotBoard {
        &self.board
    }

    pub fn size(&self) -> usize {
        self.board.len()
    }

    /// Wait for drain, stop every slot, then join every worker.
    ///
    /// All workers are joined even if some of them panicked; the first panic
    /// is returned afterwards.
    pub fn shutdown(mut self) -> ScanResult<()> {
        debug!("Waiting for all slots to drain");
        self.board.wait_for_drain();

        debug!("Stopping {} workers", self.workers.len());
        self.board.stop_all();

        let mut outcome = Ok(());
        for worker in std::mem::take(&mut self.workers) {
            let id = worker.id();
            match worker.join() {
                Ok(()) => debug!(worker = id, "worker joined"),
                Err(e) => {
                    error!("{}", e);
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
        }
        outcome
    }
}

impl Drop for WorkerPool {
    /// Stops without waiting for drain; only reached when `shutdown` was
    /// skipped
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        debug!("Worker pool dropped without shutdown, stopping workers");
        self.board.stop_all();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.join() {
                error!("{}", e);
            }
        }
    }
}
