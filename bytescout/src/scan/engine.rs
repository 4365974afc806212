use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::matcher::ByteMatcher;
use super::pool::WorkerPool;
use super::walker::Walker;
use crate::config::ScanConfig;
use crate::errors::ScanResult;
use crate::metrics::ScanMetrics;
use crate::report::ReportSink;
use crate::results::ScanSummary;

/// Scans every regular file under `config.root_path` for `config.pattern`.
///
/// One report per successfully scanned file is handed to `sink` as soon as
/// that file is done; skipped files and directories go to
/// [`ReportSink::report_error`]. Returns only after every worker has exited.
///
/// # Errors
///
/// Fails before any file is touched on an empty pattern, an invalid filter or
/// a worker that cannot be spawned. Fails after the walk if a worker
/// panicked. Per-file and per-directory problems are never returned here.
pub fn scan(config: &ScanConfig, sink: Arc<dyn ReportSink>) -> ScanResult<ScanSummary> {
    info!(
        root = %config.root_path.display(),
        workers = config.worker_count.get(),
        "Starting scan with pattern: {:?}",
        String::from_utf8_lossy(config.pattern_bytes())
    );

    config.validate()?;
    let matcher = Arc::new(ByteMatcher::new(config.pattern_bytes())?);
    let filter = config.path_filter()?;
    let metrics = ScanMetrics::new();
    let start = Instant::now();

    let pool = WorkerPool::start(
        config.worker_count,
        matcher,
        Arc::clone(&sink),
        metrics.clone(),
    )?;

    let walked = Walker::new(pool.board(), sink.as_ref(), filter, metrics.clone())
        .max_depth(config.max_depth)
        .follow_symlinks(config.follow_symlinks)
        .traverse(&config.root_path);
    debug!("Traversal finished, shutting down pool");

    // A panicked worker is the root cause of an exhausted pool, so report it first
    pool.shutdown()?;
    walked?;

    metrics.log_stats();
    let summary = ScanSummary::from_snapshot(metrics.snapshot(), start.elapsed());
    info!(
        "Scan complete. Found {} matches in {} files ({} bytes) in {}",
        summary.matches_found,
        summary.files_scanned,
        summary.bytes_scanned,
        humantime::format_duration(summary.elapsed_millis())
    );

    Ok(summary)
}
