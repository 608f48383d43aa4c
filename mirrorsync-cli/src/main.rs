//! Mirrorsync: periodic one-way directory mirror.
//!
//! # Usage
//!
//! ```text
//! mirrorsync <SOURCE> <REPLICA> <INTERVAL> <COUNT> <LOG_PATH> [--strict] [--dry-run] [--json]
//! ```
//!
//! Log lines go to stderr and `LOG_PATH`; the run summary goes to stdout.

mod report;

use std::fs::{self, OpenOptions};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use mirrorsync_core::{CompareMode, SyncConfig, SyncOptions};
use mirrorsync_daemon::RotationPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "mirrorsync",
    version,
    about = "Mirror a source directory onto a replica, repeatedly",
    long_about = None,
)]
struct Cli {
    /// Directory to mirror from.
    source: PathBuf,

    /// Directory kept identical to SOURCE (created if missing).
    replica: PathBuf,

    /// Seconds to wait between iterations.
    interval: u64,

    /// Number of iterations to run.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// File that receives the log (created if missing, appended otherwise).
    log_path: PathBuf,

    /// Always hash same-sized files instead of trusting equal mtimes.
    #[arg(long)]
    strict: bool,

    /// Report what would change without touching the replica.
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        prepare_log_file(&self.log_path)?;
        mirrorsync_daemon::init_tracing(&self.log_path).context("failed to initialise logging")?;

        let count = NonZeroU32::new(self.count).context("COUNT must be at least 1")?;
        let config = SyncConfig::new(self.source, self.replica, self.interval, count);
        let options = SyncOptions {
            compare: if self.strict {
                CompareMode::Strict
            } else {
                CompareMode::Fast
            },
            dry_run: self.dry_run,
        };

        let report =
            mirrorsync_daemon::start_blocking(config, options).context("synchronization failed")?;

        if self.json {
            report::print_json(&report)?;
        } else {
            report::print_table(&report, self.dry_run);
        }
        Ok(())
    }
}

/// Create the log's parent directories, rotate an oversized log, and make
/// sure the file exists.
fn prepare_log_file(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory '{}'", parent.display()))?;
    }

    if let Err(err) = RotationPolicy::default().rotate_if_needed(log_path) {
        eprintln!(
            "{} log rotation failed for '{}': {err}",
            "warning:".yellow().bold(),
            log_path.display()
        );
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    Cli::parse().run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_five_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "mirrorsync", "src", "dst", "0", "3", "run.log", "--strict", "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.source, PathBuf::from("src"));
        assert_eq!(cli.interval, 0);
        assert_eq!(cli.count, 3);
        assert!(cli.strict && cli.dry_run && !cli.json);
    }

    #[test]
    fn rejects_zero_count_and_negative_interval() {
        assert!(Cli::try_parse_from(["mirrorsync", "s", "r", "1", "0", "l"]).is_err());
        assert!(Cli::try_parse_from(["mirrorsync", "s", "r", "-1", "2", "l"]).is_err());
        assert!(Cli::try_parse_from(["mirrorsync", "s", "r", "1", "2"]).is_err());
    }

    #[test]
    fn log_file_and_parents_are_created() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = tmp.path().join("logs").join("nested").join("run.log");
        prepare_log_file(&log).unwrap();
        assert!(log.is_file());
    }
}
