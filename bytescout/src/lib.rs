pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod report;
pub mod results;
pub mod scan;

pub use config::{CliOverrides, ScanConfig, DEFAULT_MAX_DEPTH};
pub use errors::{ScanError, ScanResult};
pub use report::{CollectingSink, LineSink, OutputFormat, ReportSink};
pub use results::{FileReport, MatchResult, ScanSummary};
pub use scan::{scan, ByteMatcher};
