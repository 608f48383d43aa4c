//! Error types for mirrorsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal pre-flight errors. Any of these prevents the first iteration from
/// starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source root does not exist.
    #[error("source path '{path}' does not exist")]
    SourceMissing { path: PathBuf },

    /// The source root exists but is a file (or other non-directory).
    #[error("source path '{path}' is not a directory")]
    SourceNotDirectory { path: PathBuf },

    /// The source root exists but cannot be listed.
    #[error("source path '{path}' is not readable: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The replica root exists but is not a directory.
    #[error("replica path '{path}' exists but is not a directory")]
    ReplicaNotDirectory { path: PathBuf },

    /// The replica root was absent and could not be created.
    #[error("failed to create replica directory '{path}': {source}")]
    ReplicaCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One root lives inside the other.
    #[error("source '{source_root}' and replica '{replica_root}' must not contain each other")]
    Overlapping {
        source_root: PathBuf,
        replica_root: PathBuf,
    },

    /// Any other I/O failure while resolving the roots.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
