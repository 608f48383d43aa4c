//! Run configuration and the single pre-flight validation step.
//!
//! [`SyncConfig`] is built once from the command line and never mutated.
//! [`SyncConfig::validate`] resolves both roots to canonical paths; every
//! reconciliation pass runs against the [`Preflight`] it returns.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How the change detector decides whether two same-sized files differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Equal whole-second mtimes are taken as "unchanged" without hashing.
    #[default]
    Fast,
    /// Always hash when sizes match.
    Strict,
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Behaviour switches that apply to every pass of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    pub compare: CompareMode,
    /// Evaluate and count, but never touch the replica.
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Immutable configuration for one mirrorsync process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub source_root: PathBuf,
    pub replica_root: PathBuf,
    pub interval_seconds: u64,
    pub iteration_count: NonZeroU32,
}

/// Outcome of a successful [`SyncConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    /// Canonical source root.
    pub source_root: PathBuf,
    /// Canonical replica root.
    pub replica_root: PathBuf,
    /// `true` when the replica root did not exist and was created.
    pub replica_created: bool,
}

impl SyncConfig {
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        interval_seconds: u64,
        iteration_count: NonZeroU32,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            interval_seconds,
            iteration_count,
        }
    }

    /// Delay between the end of one iteration and the start of the next.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Validate both roots, creating the replica root if it is absent.
    ///
    /// Checks, in order:
    /// 1. the source exists, is a directory, and can be listed;
    /// 2. neither root contains the other;
    /// 3. the replica is a directory, creating it (recursively) if missing.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] describing the first failed check. The
    /// replica is never created when an earlier check fails.
    pub fn validate(&self) -> Result<Preflight, ConfigError> {
        let source_meta = match fs::metadata(&self.source_root) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::SourceMissing {
                    path: self.source_root.clone(),
                });
            }
            Err(err) => {
                return Err(ConfigError::SourceUnreadable {
                    path: self.source_root.clone(),
                    source: err,
                });
            }
        };
        if !source_meta.is_dir() {
            return Err(ConfigError::SourceNotDirectory {
                path: self.source_root.clone(),
            });
        }
        fs::read_dir(&self.source_root).map_err(|e| ConfigError::SourceUnreadable {
            path: self.source_root.clone(),
            source: e,
        })?;

        let source_root =
            fs::canonicalize(&self.source_root).map_err(|e| io_err(&self.source_root, e))?;
        let projected_replica =
            project_canonical(&self.replica_root).map_err(|e| io_err(&self.replica_root, e))?;
        if projected_replica.starts_with(&source_root) || source_root.starts_with(&projected_replica)
        {
            return Err(ConfigError::Overlapping {
                source_root,
                replica_root: projected_replica,
            });
        }

        let replica_created = match fs::metadata(&self.replica_root) {
            Ok(meta) if meta.is_dir() => false,
            Ok(_) => {
                return Err(ConfigError::ReplicaNotDirectory {
                    path: self.replica_root.clone(),
                });
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.replica_root).map_err(|e| ConfigError::ReplicaCreate {
                    path: self.replica_root.clone(),
                    source: e,
                })?;
                true
            }
            Err(err) => return Err(io_err(&self.replica_root, err)),
        };

        let replica_root =
            fs::canonicalize(&self.replica_root).map_err(|e| io_err(&self.replica_root, e))?;

        Ok(Preflight {
            source_root,
            replica_root,
            replica_created,
        })
    }
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// missing tail, so a not-yet-created replica can be checked for overlap.
fn project_canonical(path: &Path) -> std::io::Result<PathBuf> {
    let mut missing: Vec<OsString> = Vec::new();
    let mut cursor = path;
    loop {
        match fs::canonicalize(cursor) {
            Ok(mut base) => {
                for part in missing.iter().rev() {
                    base.push(part);
                }
                return Ok(base);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let Some(name) = cursor.file_name() else {
                    return Err(err);
                };
                missing.push(name.to_os_string());
                cursor = match cursor.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
            }
            Err(err) => return Err(err),
        }
    }
}
