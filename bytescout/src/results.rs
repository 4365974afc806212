//! Result types produced by a scan.
//!
//! `MatchResult` is what the matcher computes for one file, `FileReport` is
//! the record a worker hands to the report sink once that file is done, and
//! `ScanSummary` is what the engine returns after the pool has shut down.
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metrics::MetricsSnapshot;

/// Outcome of scanning one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// Number of non-overlapping occurrences of the pattern
    pub entries_count: u64,
    /// Number of bytes read from the file
    pub total_bytes: u64,
}

/// One completed file, as emitted by the worker that scanned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Logical index of the worker, assigned by the pool (not an OS thread id)
    pub worker: usize,
    /// Serialized lossily: bytes that are not valid UTF-8 become U+FFFD
    #[serde(serialize_with = "serialize_path_lossy")]
    pub path: PathBuf,
    pub total_bytes: u64,
    pub entries_count: u64,
}

impl FileReport {
    pub fn new(worker: usize, path: PathBuf, result: MatchResult) -> Self {
        Self {
            worker,
            path,
            total_bytes: result.total_bytes,
            entries_count: result.entries_count,
        }
    }

    pub fn result(&self) -> MatchResult {
        MatchResult {
            entries_count: self.entries_count,
            total_bytes: self.total_bytes,
        }
    }
}

fn serialize_path_lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Totals for a finished scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files_dispatched: u64,
    pub files_scanned: u64,
    pub files_failed: u64,
    pub dirs_visited: u64,
    pub dir_errors: u64,
    pub bytes_scanned: u64,
    pub matches_found: u64,
    /// Highest number of tasks that were assigned at the same time
    pub peak_in_flight: u64,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn from_snapshot(stats: MetricsSnapshot, elapsed: Duration) -> Self {
        Self {
            files_dispatched: stats.files_dispatched,
            files_scanned: stats.files_scanned,
            files_failed: stats.files_failed,
            dirs_visited: stats.dirs_visited,
            dir_errors: stats.dir_errors,
            bytes_scanned: stats.bytes_scanned,
            matches_found: stats.matches_found,
            peak_in_flight: stats.peak_in_flight,
            elapsed,
        }
    }

    /// Elapsed time truncated to whole milliseconds, saturating at `u64::MAX` ms
    pub fn elapsed_millis(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    /// Every dispatched task either produced a report or failed
    pub fn is_accounted(&self) -> bool {
        self.files_scanned + self.files_failed == self.files_dispatched
    }
}
