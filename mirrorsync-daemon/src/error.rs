use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the sync driver.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Pre-flight validation failed; no iteration ran.
    #[error("configuration error: {0}")]
    Config(#[from] mirrorsync_core::ConfigError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking task running a pass panicked or was cancelled.
    #[error("sync task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
