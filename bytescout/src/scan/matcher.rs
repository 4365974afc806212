use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::trace;

use crate::errors::{ScanError, ScanResult};
use crate::results::MatchResult;

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;

/// Counts non-overlapping occurrences of a byte sequence in a stream.
///
/// The matcher keeps only the length of the currently matched prefix. A
/// mismatching byte resets that length and is then tried as the first byte of
/// a new occurrence; there is no deeper backtracking. After a full match the
/// state starts from scratch, so `"aa"` occurs once in `"aaa"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteMatcher {
    pattern: Vec<u8>,
}

impl ByteMatcher {
    /// Creates a matcher for `pattern`. Empty patterns are rejected.
    pub fn new(pattern: impl Into<Vec<u8>>) -> ScanResult<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(ScanError::invalid_pattern("search pattern must not be empty"));
        }
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// Scans the file at `path`
    pub fn scan(&self, path: &Path) -> ScanResult<MatchResult> {
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| ScanError::open(path, e))?;
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        self.scan_reader(reader)
            .map_err(|e| ScanError::read(path, e))
        // The file handle is closed when the reader is dropped here
    }

    /// Scans an arbitrary byte stream
    pub fn scan_reader<R: Read>(&self, mut reader: R) -> io::Result<MatchResult> {
        let mut buffer = vec![0u8; BUFFER_CAPACITY];
        let mut state = MatchState::default();

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.feed(&self.pattern, &buffer[..n]);
        }

        Ok(state.into_result())
    }

    /// Scans an in-memory slice
    pub fn scan_bytes(&self, bytes: &[u8]) -> MatchResult {
        let mut state = MatchState::default();
        state.feed(&self.pattern, bytes);
        state.into_result()
    }
}

/// Running state carried across buffer boundaries
#[derive(Debug, Default)]
struct MatchState {
    matched: usize,
    entries_count: u64,
    total_bytes: u64,
}

impl MatchState {
    fn feed(&mut self, pattern: &[u8], chunk: &[u8]) {
        self.total_bytes += chunk.len() as u64;
        for &byte in chunk {
            if pattern[self.matched] == byte {
                self.matched += 1;
            } else {
                self.matched = usize::from(pattern[0] == byte);
            }
            if self.matched == pattern.len() {
                self.entries_count += 1;
                self.matched = 0;
            }
        }
    }

    fn into_result(self) -> MatchResult {
        MatchResult {
            entries_count: self.entries_count,
            total_bytes: self.total_bytes,
        }
    }
}
