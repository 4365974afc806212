use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{ScanError, ScanResult};
use crate::filters::PathFilter;

/// Directories nested deeper than this below the root are skipped
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Configuration for one scan.
///
/// # Configuration Locations
///
/// Values are layered, later sources overriding earlier ones:
/// 1. Global `$CONFIG_DIR/bytescout/config.yaml`
/// 2. Local `.bytescout.yaml` in the current directory
/// 3. A file passed explicitly (the CLI's `--config`)
///
/// Command-line arguments are applied last through
/// [`merge_with_cli`](ScanConfig::merge_with_cli).
///
/// # Configuration Format
///
/// ```yaml
/// # Directory to scan
/// root_path: "."
///
/// # Number of worker threads (default: CPU cores)
/// worker_count: 8
///
/// # Subdirectories nested deeper than this are skipped
/// max_depth: 64
///
/// # Scan symlinks that point at regular files
/// follow_symlinks: false
///
/// # Glob patterns for paths to skip
/// ignore_patterns:
///   - "**/.git/**"
///
/// # Only scan files with these extensions
/// file_extensions: ["log", "txt"]
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Root of the tree to scan
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Byte sequence to count. Written as a string in configuration files;
    /// the CLI passes raw argument bytes.
    #[serde(default, with = "pattern_text")]
    pub pattern: Vec<u8>,

    /// Number of workers in the pool
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Maximum directory depth below the root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Whether symlinks to regular files are scanned. Symlinks to directories
    /// are never followed.
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Glob patterns for files and directories to skip
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Optional extension allow-list; `None` scans every regular file
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Values taken from the command line; `None` means the flag was not given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOverrides {
    pub root_path: PathBuf,
    pub pattern: Vec<u8>,
    pub worker_count: NonZeroUsize,
    pub max_depth: Option<usize>,
    pub follow_symlinks: bool,
    pub ignore_patterns: Vec<String>,
    pub file_extensions: Option<Vec<String>>,
    pub log_level: Option<String>,
}

impl CliOverrides {
    pub fn new(
        root_path: impl Into<PathBuf>,
        pattern: impl Into<Vec<u8>>,
        worker_count: NonZeroUsize,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            pattern: pattern.into(),
            worker_count,
            max_depth: None,
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            file_extensions: None,
            log_level: None,
        }
    }
}

mod pattern_text {
    use super::*;

    pub fn serialize<S: Serializer>(pattern: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(pattern))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

impl ScanConfig {
    pub fn new(
        root_path: impl Into<PathBuf>,
        pattern: impl Into<Vec<u8>>,
        worker_count: NonZeroUsize,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            pattern: pattern.into(),
            worker_count,
            max_depth: DEFAULT_MAX_DEPTH,
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            file_extensions: None,
            log_level: default_log_level(),
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> ScanResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus `config_path`.
    ///
    /// An explicit path that does not exist is an error; the default
    /// locations are simply skipped when absent.
    pub fn load_from(config_path: Option<&Path>) -> ScanResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("bytescout/config.yaml")),
            Some(PathBuf::from(".bytescout.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// Root, pattern and worker count are always taken from the CLI; every
    /// optional flag that was given wins over the file.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        self.root_path = cli.root_path;
        self.pattern = cli.pattern;
        self.worker_count = cli.worker_count;
        if let Some(max_depth) = cli.max_depth {
            self.max_depth = max_depth;
        }
        if cli.follow_symlinks {
            self.follow_symlinks = true;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if cli.file_extensions.is_some() {
            self.file_extensions = cli.file_extensions;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// The byte sequence workers search for
    pub fn pattern_bytes(&self) -> &[u8] {
        &self.pattern
    }

    /// Builds the walker's path filter from the ignore and extension settings
    pub fn path_filter(&self) -> ScanResult<PathFilter> {
        PathFilter::new(&self.ignore_patterns, self.file_extensions.as_deref())
    }

    /// Checks everything that would otherwise only fail once the pool runs
    pub fn validate(&self) -> ScanResult<()> {
        if self.pattern.is_empty() {
            return Err(ScanError::invalid_pattern("search pattern must not be empty"));
        }
        self.path_filter()?;
        Ok(())
    }
}
