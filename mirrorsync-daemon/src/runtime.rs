//! Iteration driver.
//!
//! `Idle → (Reconciling → Reporting → Waiting)* → Done`
//!
//! Each pass runs on the blocking pool; the driver awaits it before doing
//! anything else, so passes never overlap. The wait between passes races a
//! shutdown broadcast, and there is no wait after the last pass.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use mirrorsync_core::{IterationStats, Preflight, RunReport, SyncConfig, SyncOptions};
use mirrorsync_engine::{run_pass, SyncLog};

use crate::error::{io_err, DaemonError};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// [`SyncLog`] backed by the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl SyncLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Install the global subscriber: timestamped, levelled lines to stderr and
/// appended to `log_path`. `RUST_LOG` overrides the default `info` filter.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing(log_path: &Path) -> Result<(), DaemonError> {
    use tracing_subscriber::{fmt, fmt::writer::MakeWriterExt, EnvFilter};

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| io_err(log_path, e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr.and(Mutex::new(file)))
        .try_init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Build a runtime, hook ctrl-c to a shutdown broadcast, and block the
/// calling thread until the run finishes.
pub fn start_blocking(config: SyncConfig, options: SyncOptions) -> Result<RunReport, DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);
        let signal_handle = tokio::spawn(watch_ctrl_c(shutdown_tx));
        let result = run(config, options, Arc::new(TracingLog), shutdown_rx).await;
        signal_handle.abort();
        result
    })
}

/// Run every configured iteration.
///
/// Returns early, with [`RunReport::interrupted`] set, only when shutdown
/// arrives during an inter-iteration wait.
///
/// # Errors
/// [`DaemonError::Config`] when pre-flight fails (nothing has run yet);
/// [`DaemonError::Join`] if a pass task panics.
pub async fn run(
    config: SyncConfig,
    options: SyncOptions,
    log: Arc<dyn SyncLog>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<RunReport, DaemonError> {
    log.info("Starting synchronization...");
    let preflight = Arc::new(preflight(&config, log.as_ref())?);
    if options.dry_run {
        log.info("Dry run: the replica will not be modified.");
    }

    let total = config.iteration_count.get();
    let mut report = RunReport::new(total);

    for iteration in 1..=total {
        log.info(&format!("Sync iteration {iteration} started."));
        let stats = {
            let preflight = Arc::clone(&preflight);
            let log = Arc::clone(&log);
            tokio::task::spawn_blocking(move || {
                run_pass(&preflight, options, iteration, log.as_ref())
            })
            .await?
        };
        log_stats(log.as_ref(), &stats);
        report.iterations.push(stats);

        if iteration == total {
            break;
        }
        log.info(&format!(
            "Waiting for {} seconds until next synchronization...",
            config.interval_seconds
        ));
        if !wait_for_next(config.interval(), &mut shutdown).await {
            log.info("Shutdown requested; stopping before the next iteration.");
            report.interrupted = true;
            break;
        }
    }

    Ok(report)
}

fn preflight(config: &SyncConfig, log: &dyn SyncLog) -> Result<Preflight, DaemonError> {
    match config.validate() {
        Ok(preflight) => {
            if preflight.replica_created {
                log.info(&format!(
                    "Replica path '{}' did not exist. Created.",
                    config.replica_root.display()
                ));
            }
            Ok(preflight)
        }
        Err(err) => {
            log.exception("Pre-flight validation failed", &err);
            Err(err.into())
        }
    }
}

fn log_stats(log: &dyn SyncLog, stats: &IterationStats) {
    log.info(&stats.summary_line());
    log.info(&format!(
        "Synchronization completed in {:.3} seconds",
        stats.duration_seconds
    ));
}

/// Sleep for `interval` unless shutdown is requested first.
///
/// Returns `true` to continue with the next iteration. A closed channel
/// (every sender gone) means nobody can ask for shutdown any more, so the
/// full interval is still honoured.
async fn wait_for_next(interval: Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    tokio::select! {
        _ = &mut sleep => true,
        received = shutdown.recv() => match received {
            Ok(()) | Err(RecvError::Lagged(_)) => false,
            Err(RecvError::Closed) => {
                sleep.await;
                true
            }
        },
    }
}

/// First ctrl-c: stop after the current pass. Second ctrl-c: exit now.
/// In-flight copies are staged, so an abrupt exit never leaves a torn file.
async fn watch_ctrl_c(shutdown: broadcast::Sender<()>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler failed");
        return;
    }
    tracing::info!("received ctrl-c, stopping after the current pass");
    let _ = shutdown.send(());

    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("received second ctrl-c, exiting immediately");
        std::process::exit(130);
    }
}
