//! Error types for bytescout.
//!
//! Errors fall into three classes, and callers are expected to treat them
//! differently:
//!
//! 1. **File-level** (`Open`, `Read`): the scan of one file is abandoned, no
//!    report is emitted for it and the worker goes back to waiting for work.
//! 2. **Directory-level** (`Directory`, `Metadata`, `DepthLimit`): one subtree
//!    (or one entry) is skipped and the walk continues with its siblings.
//! 3. **Fatal** (`PoolStartup`, `WorkerPanicked`, `PoolExhausted`,
//!    `InvalidPattern`, configuration errors): the scan never starts, or its
//!    result cannot be trusted.
//!
//! ```rust,ignore
//! match bytescout::scan(&config, sink) {
//!     Ok(summary) => println!("{} files", summary.files_scanned),
//!     Err(e) if e.is_fatal() => std::process::exit(1),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while walking a tree and scanning its files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read failed in {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot stat {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("directory {} exceeds maximum depth {max_depth}", path.display())]
    DepthLimit { path: PathBuf, max_depth: usize },
    #[error("failed to start worker {worker}: {source}")]
    PoolStartup {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
    #[error("no live workers left to scan {}", path.display())]
    PoolExhausted { path: PathBuf },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ScanError {
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    pub fn metadata(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Metadata {
            path: path.into(),
            source,
        }
    }

    pub fn depth_limit(path: impl Into<PathBuf>, max_depth: usize) -> Self {
        Self::DepthLimit {
            path: path.into(),
            max_depth,
        }
    }

    pub fn pool_startup(worker: usize, source: io::Error) -> Self {
        Self::PoolStartup { worker, source }
    }

    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// The path this error occurred at, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::Directory { path, .. }
            | Self::Metadata { path, .. }
            | Self::DepthLimit { path, .. }
            | Self::PoolExhausted { path } => Some(path),
            _ => None,
        }
    }

    /// Whether this error should terminate the whole process.
    ///
    /// File and directory errors only cost one file or one subtree; everything
    /// else means the scan did not run or its result is incomplete.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Open { .. }
                | Self::Read { .. }
                | Self::Directory { .. }
                | Self::Metadata { .. }
                | Self::DepthLimit { .. }
        )
    }
}
