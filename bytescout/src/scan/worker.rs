//! Worker threads.
//!
//! Each worker is bound to one slot for its whole life:
//! - announces Ready on its slot
//! - sleeps until the walker assigns a file or the coordinator stops it
//! - scans the file outside the slot lock and emits one report
//! - goes back to Ready, which releases the task
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

use super::matcher::ByteMatcher;
use super::slot::{Assignment, ScanTask, SlotBoard};
use crate::errors::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::report::ReportSink;
use crate::results::FileReport;

/// Everything a worker thread shares with the rest of the pool
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub board: Arc<SlotBoard>,
    pub matcher: Arc<ByteMatcher>,
    pub sink: Arc<dyn ReportSink>,
    pub metrics: ScanMetrics,
}

/// A persistent thread bound to one slot
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread for slot `id`
    pub(crate) fn spawn(id: usize, ctx: WorkerContext) -> ScanResult<Self> {
        let handle = thread::Builder::new()
            .name(format!("bytescout-worker-{}", id))
            .spawn(move || worker_loop(id, ctx))
            .map_err(|e| ScanError::pool_startup(id, e))?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Logical worker index
    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the thread to exit
    pub fn join(mut self) -> ScanResult<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ScanError::WorkerPanicked { worker: self.id }),
            None => Ok(()),
        }
    }
}

/// Takes the slot out of service if the worker unwinds, so the walker and the
/// coordinator never wait on a dead thread
struct RetireOnPanic<'a> {
    board: &'a SlotBoard,
    slot: usize,
}

impl Drop for RetireOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = self.slot, "worker panicked, retiring its slot");
            self.board.retire(self.slot);
        }
    }
}

fn worker_loop(id: usize, ctx: WorkerContext) {
    let _guard = RetireOnPanic {
        board: &ctx.board,
        slot: id,
    };
    debug!(worker = id, "worker started");

    while ctx.board.announce_ready(id) {
        match ctx.board.wait_for_task(id) {
            Assignment::Task(task) => run_task(id, &ctx, task),
            Assignment::Stop => break,
        }
    }

    debug!(worker = id, "worker stopped");
}

fn run_task(id: usize, ctx: &WorkerContext, task: ScanTask) {
    match ctx.matcher.scan(&task.path) {
        Ok(result) => {
            ctx.metrics
                .record_scanned(result.total_bytes, result.entries_count);
            ctx.sink.report(&FileReport::new(id, task.path, result));
        }
        Err(e) => {
            warn!(worker = id, "{}", e);
            ctx.metrics.record_failed();
            ctx.sink.report_error(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingSink;
    use crate::scan::slot::DispatchCursor;
    use std::fs;
    use tempfile::tempdir;

    struct PanickingSink;

    impl ReportSink for PanickingSink {
        fn report(&self, _report: &FileReport) {
            panic!("sink exploded");
        }

        fn report_error(&self, _error: &ScanError) {}
    }

    fn context(size: usize, sink: Arc<dyn ReportSink>) -> WorkerContext {
        let metrics = ScanMetrics::new();
        WorkerContext {
            board: Arc::new(SlotBoard::new(size, metrics.clone())),
            matcher: Arc::new(ByteMatcher::new(b"he".to_vec()).unwrap()),
            sink,
            metrics,
        }
    }

    #[test]
    fn test_worker_scans_and_reports() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.txt");
        fs::write(&path, "hehehhe").unwrap();

        let sink = Arc::new(CollectingSink::new());
        let ctx = context(1, sink.clone());
        let worker = Worker::spawn(0, ctx.clone()).unwrap();
        assert_eq!(worker.id(), 0);

        let mut cursor = DispatchCursor::default();
        ctx.board
            .assign(&mut cursor, ScanTask::new(&path))
            .unwrap();
        ctx.board.wait_for_drain();
        ctx.board.stop_all();
        worker.join().unwrap();

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].worker, 0);
        assert_eq!(reports[0].path, path);
        assert_eq!(reports[0].entries_count, 3);
        assert_eq!(reports[0].total_bytes, 7);
    }

    #[test]
    fn test_worker_survives_unreadable_file() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("a.txt");
        fs::write(&good, "xxhelloxx").unwrap();

        let sink = Arc::new(CollectingSink::new());
        let ctx = context(1, sink.clone());
        let worker = Worker::spawn(0, ctx.clone()).unwrap();

        let mut cursor = DispatchCursor::default();
        ctx.board
            .assign(&mut cursor, ScanTask::new(dir.path().join("missing.txt")))
            .unwrap();
        ctx.board.assign(&mut cursor, ScanTask::new(&good)).unwrap();
        ctx.board.wait_for_drain();
        ctx.board.stop_all();
        worker.join().unwrap();

        assert_eq!(sink.reports().len(), 1);
        assert_eq!(sink.errors().len(), 1);
        let stats = ctx.metrics.snapshot();
        assert_eq!(stats.files_scanned, 1);
        assert_eq!(stats.files_failed, 1);
    }

    #[test]
    fn test_panicking_worker_is_retired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "he").unwrap();

        let ctx = context(1, Arc::new(PanickingSink));
        let worker = Worker::spawn(0, ctx.clone()).unwrap();

        let mut cursor = DispatchCursor::default();
        ctx.board.assign(&mut cursor, ScanTask::new(&path)).unwrap();

        // Drain completes because the dead slot is retired
        ctx.board.wait_for_drain();
        ctx.board.stop_all();
        assert!(matches!(
            worker.join(),
            Err(ScanError::WorkerPanicked { worker: 0 })
        ));
        assert_eq!(ctx.metrics.in_flight(), 0);
    }
}
