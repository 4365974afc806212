use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::slot::{DispatchCursor, ScanTask, SlotBoard};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::errors::{ScanError, ScanResult};
use crate::filters::PathFilter;
use crate::metrics::ScanMetrics;
use crate::report::ReportSink;

/// Recursive directory walker; the single producer feeding the slots.
///
/// Entries are inspected with link-level metadata, so symbolic links to
/// directories are never traversed. Unreadable directories and entries are
/// reported and skipped; the only error that stops the walk is a pool with no
/// live workers.
pub struct Walker<'a> {
    board: &'a SlotBoard,
    sink: &'a dyn ReportSink,
    filter: PathFilter,
    metrics: ScanMetrics,
    max_depth: usize,
    follow_symlinks: bool,
    cursor: DispatchCursor,
}

impl<'a> Walker<'a> {
    pub fn new(
        board: &'a SlotBoard,
        sink: &'a dyn ReportSink,
        filter: PathFilter,
        metrics: ScanMetrics,
    ) -> Self {
        Self {
            board,
            sink,
            filter,
            metrics,
            max_depth: DEFAULT_MAX_DEPTH,
            follow_symlinks: false,
            cursor: DispatchCursor::default(),
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Also scan symlinks whose target is a regular file
    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    /// Walk `root` and dispatch every regular file below it.
    ///
    /// The root itself is resolved through symlinks; a root that is a regular
    /// file is dispatched as the only task.
    pub fn traverse(&mut self, root: &Path) -> ScanResult<()> {
        debug!("Scanning directory: {}", root.display());
        let metadata = match fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.skip(ScanError::metadata(root, e));
                return Ok(());
            }
        };

        if metadata.is_dir() {
            self.visit_dir(root, 0)
        } else if metadata.is_file() {
            self.dispatch(root.to_path_buf())
        } else {
            debug!("Root {} is neither a file nor a directory", root.display());
            Ok(())
        }
    }

    fn visit_dir(&mut self, dir: &Path, depth: usize) -> ScanResult<()> {
        if depth > self.max_depth {
            self.skip(ScanError::depth_limit(dir, self.max_depth));
            return Ok(());
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.skip(ScanError::directory(dir, e));
                return Ok(());
            }
        };
        self.metrics.record_dir();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.skip(ScanError::directory(dir, e));
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    self.skip(ScanError::metadata(&path, e));
                    continue;
                }
            };

            if file_type.is_dir() {
                if self.filter.is_ignored(&path) {
                    trace!("Skipping ignored directory: {}", path.display());
                    continue;
                }
                self.visit_dir(&path, depth + 1)?;
            } else if file_type.is_file() {
                self.offer(path)?;
            } else if file_type.is_symlink() && self.follow_symlinks {
                self.follow_link(path)?;
            } else {
                trace!("Skipping non-regular entry: {}", path.display());
            }
        }
        Ok(())
    }

    fn follow_link(&mut self, link: PathBuf) -> ScanResult<()> {
        match fs::metadata(&link) {
            Ok(target) if target.is_file() => self.offer(link),
            Ok(_) => {
                trace!("Not following symlink to non-file: {}", link.display());
                Ok(())
            }
            Err(e) => {
                self.skip(ScanError::metadata(&link, e));
                Ok(())
            }
        }
    }

    fn offer(&mut self, path: PathBuf) -> ScanResult<()> {
        if !self.filter.accepts_file(&path) {
            trace!("Filtered out: {}", path.display());
            return Ok(());
        }
        self.dispatch(path)
    }

    /// Blocks until a slot is free
    fn dispatch(&mut self, path: PathBuf) -> ScanResult<()> {
        self.board
            .assign(&mut self.cursor, ScanTask::new(path))
            .map(|_| ())
            .map_err(|task| ScanError::PoolExhausted { path: task.path })
    }

    fn skip(&self, error: ScanError) {
        warn!("{}", error);
        self.metrics.record_dir_error();
        self.sink.report_error(&error);
    }
}
