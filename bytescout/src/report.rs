//! Where finished files and non-fatal errors go.
//!
//! Workers call [`ReportSink::report`] once per successfully scanned file, as
//! soon as that file is done; the walker and the workers call
//! [`ReportSink::report_error`] for every file or directory they had to skip.
//! Sinks are shared by all threads, so implementations must serialize their
//! own output.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::errors::ScanError;
use crate::results::FileReport;

pub trait ReportSink: Send + Sync {
    fn report(&self, report: &FileReport);

    fn report_error(&self, error: &ScanError);
}

/// Line format used by [`LineSink`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `worker path total_bytes entries_count`
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(ScanError::config_error(format!(
                "unknown output format '{other}' (expected plain or json)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => f.write_str("plain"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Writes one line per report to `out` and one line per error to `err`,
/// flushing after every line.
pub struct LineSink<O, E> {
    program: String,
    format: OutputFormat,
    out: Mutex<O>,
    err: Mutex<E>,
}

impl<O, E> LineSink<O, E>
where
    O: Write + Send,
    E: Write + Send,
{
    /// `program` prefixes every error line
    pub fn new(program: impl Into<String>, format: OutputFormat, out: O, err: E) -> Self {
        Self {
            program: program.into(),
            format,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    pub fn into_inner(self) -> (O, E) {
        (
            self.out.into_inner().unwrap_or_else(PoisonError::into_inner),
            self.err.into_inner().unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn write_report(&self, out: &mut O, report: &FileReport) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Plain => writeln!(
                out,
                "{} {} {} {}",
                report.worker,
                report.path.display(),
                report.total_bytes,
                report.entries_count
            )?,
            OutputFormat::Json => {
                // Serialize fully before touching the shared stream
                let mut line = serde_json::to_vec(report)?;
                line.push(b'\n');
                out.write_all(&line)?;
            }
        }
        out.flush()
    }
}

impl<O, E> ReportSink for LineSink<O, E>
where
    O: Write + Send,
    E: Write + Send,
{
    fn report(&self, report: &FileReport) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.write_report(&mut out, report) {
            debug!("Failed to write report for {}: {}", report.path.display(), e);
        }
    }

    fn report_error(&self, error: &ScanError) {
        let mut err = self.err.lock().unwrap_or_else(PoisonError::into_inner);
        let written = writeln!(err, "{}: {}", self.program, error).and_then(|_| err.flush());
        if let Err(e) = written {
            debug!("Failed to write error line: {}", e);
        }
    }
}

/// Keeps everything in memory; handy for embedding and tests
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<FileReport>>,
    errors: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports in completion order
    pub fn reports(&self) -> Vec<FileReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered error messages in the order they were reported
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for CollectingSink {
    fn report(&self, report: &FileReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }

    fn report_error(&self, error: &ScanError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn sample() -> FileReport {
        FileReport {
            worker: 1,
            path: PathBuf::from("d/a.txt"),
            total_bytes: 9,
            entries_count: 1,
        }
    }

    #[test]
    fn test_plain_lines() {
        let sink = LineSink::new("bytescout", OutputFormat::Plain, Vec::new(), Vec::new());
        sink.report(&sample());
        sink.report_error(&ScanError::open(
            "d/locked.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        ));

        let (out, err) = sink.into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "1 d/a.txt 9 1\n");
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "bytescout: cannot open d/locked.txt: permission denied\n"
        );
    }

    #[test]
    fn test_json_lines() {
        let sink = LineSink::new("bytescout", OutputFormat::Json, Vec::new(), io::sink());
        sink.report(&sample());
        sink.report(&sample());

        let (out, _) = sink.into_inner();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["worker"], 1);
        assert_eq!(value["path"], "d/a.txt");
        assert_eq!(value["total_bytes"], 9);
        assert_eq!(value["entries_count"], 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_json_lines_with_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let odd = FileReport {
            worker: 0,
            path: PathBuf::from("d").join(OsStr::from_bytes(b"\xff.bin")),
            total_bytes: 4,
            entries_count: 2,
        };
        let sink = LineSink::new("bytescout", OutputFormat::Json, Vec::new(), io::sink());
        sink.report(&odd);
        sink.report(&sample());

        let (out, _) = sink.into_inner();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["path"], "d/\u{fffd}.bin");
        assert_eq!(lines[0]["entries_count"], 2);
        assert_eq!(lines[1]["path"], "d/a.txt");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.report(&sample());
        sink.report_error(&ScanError::depth_limit("deep", 2));

        assert_eq!(sink.reports(), vec![sample()]);
        assert_eq!(sink.errors(), vec!["directory deep exceeds maximum depth 2"]);
    }
}
