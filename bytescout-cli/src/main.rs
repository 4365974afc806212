mod logging;

use anyhow::Context;
use bytescout::{CliOverrides, LineSink, OutputFormat, ScanConfig, ScanSummary};
use clap::Parser;
use colored::Colorize;
use std::ffi::{OsStr, OsString};
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

const PROGRAM: &str = "bytescout";

/// Count occurrences of a byte pattern in every file under a directory
#[derive(Parser)]
#[command(name = "bytescout", author, version, about, long_about = None)]
struct Cli {
    /// Directory (or single file) to scan
    root: PathBuf,

    /// Byte sequence to count, taken verbatim from the argument bytes
    pattern: OsString,

    /// Number of worker threads
    workers: NonZeroUsize,

    /// Additional configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip directories nested deeper than this below the root [default: 256]
    #[arg(long)]
    max_depth: Option<usize>,

    /// Scan symlinks that point at regular files
    #[arg(long)]
    follow_symlinks: bool,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// File extensions to include (e.g. rs,go,js)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Report format (plain|json)
    #[arg(long, default_value = "plain")]
    format: OutputFormat,

    /// Print a summary line to stderr when done
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence [default: warn]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let file_extensions = self.extensions.as_ref().map(|e| {
            e.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        CliOverrides {
            max_depth: self.max_depth,
            follow_symlinks: self.follow_symlinks,
            ignore_patterns: self.ignore.clone(),
            file_extensions,
            log_level: self.log_level.clone(),
            ..CliOverrides::new(&self.root, pattern_bytes(&self.pattern), self.workers)
        }
    }
}

#[cfg(unix)]
fn pattern_bytes(pattern: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    pattern.as_bytes().to_vec()
}

// Non-unix arguments are not raw bytes; unpaired surrogates become U+FFFD
#[cfg(not(unix))]
fn pattern_bytes(pattern: &OsStr) -> Vec<u8> {
    pattern.to_string_lossy().into_owned().into_bytes()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", PROGRAM, e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ScanConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(cli.overrides());

    logging::init_logger(&config.log_level);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }
    debug!(?config, "Effective configuration");

    let sink = Arc::new(LineSink::new(PROGRAM, cli.format, io::stdout(), io::stderr()));
    let summary = bytescout::scan(&config, sink)?;
    debug!(
        dispatched = summary.files_dispatched,
        failed = summary.files_failed,
        "Scan finished"
    );

    if cli.stats {
        print_stats(&summary);
    }
    Ok(())
}

fn print_stats(summary: &ScanSummary) {
    let elapsed = summary.elapsed_millis();
    eprintln!(
        "Scanned {} files ({} matches, {} bytes) in {}",
        summary.files_scanned.to_string().green(),
        summary.matches_found.to_string().yellow(),
        summary.bytes_scanned,
        humantime::format_duration(elapsed).to_string().blue()
    );
    if summary.files_failed > 0 || summary.dir_errors > 0 {
        eprintln!(
            "{} {} unreadable files, {} unreadable directories",
            "Skipped".red(),
            summary.files_failed,
            summary.dir_errors
        );
    }
}
