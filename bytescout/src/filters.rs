use glob::Pattern;
use std::path::Path;

use crate::errors::{ScanError, ScanResult};

/// Path filters applied by the walker before anything is dispatched
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    ignore: Vec<Pattern>,
    extensions: Option<Vec<String>>,
}

impl PathFilter {
    /// Compiles the glob patterns up front so a typo fails the whole scan
    /// instead of silently matching nothing.
    pub fn new(ignore_patterns: &[String], extensions: Option<&[String]>) -> ScanResult<Self> {
        let ignore = ignore_patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    ScanError::config_error(format!("invalid ignore pattern '{p}': {e}"))
                })
            })
            .collect::<ScanResult<Vec<_>>>()?;

        let extensions = extensions.map(|exts| {
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        });

        Ok(Self { ignore, extensions })
    }

    /// Checks if a path (file or directory) matches one of the ignore patterns
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        // Convert path to a format that matches the pattern style
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.ignore.iter().any(|p| p.matches(&normalized))
    }

    /// Whether a regular file should be scanned
    pub fn accepts_file(&self, path: &Path) -> bool {
        !self.is_ignored(path) && has_valid_extension(path, &self.extensions)
    }
}

/// Checks if a file should be included in the scan based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => {
            if let Some(ext) = path.extension() {
                if let Some(ext_str) = ext.to_str() {
                    return exts.iter().any(|e| e.eq_ignore_ascii_case(ext_str));
                }
            }
            false
        }
    }
}
