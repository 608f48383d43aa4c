//! Error types for mirrorsync-engine.
//!
//! Every variant is recoverable per item: the reconciler logs it, counts it,
//! and moves on to the next entry. Messages name the paths involved; the
//! underlying cause is reachable through [`std::error::Error::source`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `stat` on a path failed for a reason other than "not found".
    #[error("cannot read metadata of '{path}'")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a file for its content hash failed.
    #[error("error calculating hash for '{path}'")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging or renaming a copy failed; the destination is untouched.
    #[error("error copying file from '{from}' to '{to}'")]
    Transfer {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error creating directory '{path}'")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error removing '{path}'")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be listed during traversal.
    #[error("error walking '{path}'")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The entry is neither a regular file nor a directory.
    #[error("'{path}' is not a regular file")]
    Unsupported { path: PathBuf },
}

pub(crate) fn metadata_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Metadata {
        path: path.into(),
        source,
    }
}

pub(crate) fn remove_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Remove {
        path: path.into(),
        source,
    }
}
