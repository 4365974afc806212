use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared by the walker, the workers and the pool coordinator
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    // Dispatch
    files_dispatched: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    peak_in_flight: Arc<AtomicU64>,

    // Outcomes
    files_scanned: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
    bytes_scanned: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,

    // Traversal
    dirs_visited: Arc<AtomicU64>,
    dir_errors: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            files_dispatched: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            peak_in_flight: Arc::new(AtomicU64::new(0)),
            files_scanned: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
            bytes_scanned: Arc::new(AtomicU64::new(0)),
            matches_found: Arc::new(AtomicU64::new(0)),
            dirs_visited: Arc::new(AtomicU64::new(0)),
            dir_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a task being assigned to a slot.
    ///
    /// Called with the slot lock held, so `in_flight` mirrors the number of
    /// assigned slots exactly.
    pub fn record_dispatch(&self) {
        self.files_dispatched.fetch_add(1, Ordering::Relaxed);
        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
    }

    /// Records a slot returning to ready
    pub fn record_release(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_scanned(&self, bytes: u64, matches: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
        self.matches_found.fetch_add(matches, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dir(&self) {
        self.dirs_visited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dir_error(&self) {
        self.dir_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Gets the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_dispatched: self.files_dispatched.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            dir_errors: self.dir_errors.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Logs current counter values
    pub fn log_stats(&self) {
        let stats = self.snapshot();
        debug!(in_flight = self.in_flight(), "Logging scan metrics");
        info!(
            "Scan stats:\n\
             Files dispatched/scanned/failed: {}/{}/{}\n\
             Bytes scanned: {}\n\
             Matches found: {}\n\
             Directories visited/failed: {}/{}\n\
             Peak in-flight tasks: {}",
            stats.files_dispatched,
            stats.files_scanned,
            stats.files_failed,
            stats.bytes_scanned,
            stats.matches_found,
            stats.dirs_visited,
            stats.dir_errors,
            stats.peak_in_flight
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_dispatched: u64,
    pub files_scanned: u64,
    pub files_failed: u64,
    pub bytes_scanned: u64,
    pub matches_found: u64,
    pub dirs_visited: u64,
    pub dir_errors: u64,
    pub peak_in_flight: u64,
}
