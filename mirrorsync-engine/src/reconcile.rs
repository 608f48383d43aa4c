//! Tree reconciliation: the forward pass and the cleanup pass.
//!
//! The forward pass walks the source pre-order (a directory is always
//! visited before anything inside it) and brings each mirrored path up to
//! date. The cleanup pass then walks the replica post-order (children
//! before parents) and removes every entry with no source counterpart.
//! Cleanup never starts before the forward pass has finished, so nothing
//! the forward pass just created can be mistaken for an orphan.
//!
//! Neither pass returns an error. Each per-item failure is logged through
//! the [`SyncLog`], counted in [`IterationStats::errors`], and skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use mirrorsync_core::{IterationStats, Preflight, SyncOptions};

use crate::detector::{self, Decision};
use crate::error::{metadata_err, remove_err, EngineError};
use crate::log::SyncLog;
use crate::transfer;

/// Run one full reconciliation (forward, then cleanup) and time it.
pub fn run_pass(
    preflight: &Preflight,
    options: SyncOptions,
    iteration: u32,
    log: &dyn SyncLog,
) -> IterationStats {
    let started = Instant::now();
    let mut stats = IterationStats::new(iteration);
    forward_pass(
        &preflight.source_root,
        &preflight.replica_root,
        options,
        log,
        &mut stats,
    );
    cleanup_pass(
        &preflight.source_root,
        &preflight.replica_root,
        options,
        log,
        &mut stats,
    );
    stats.duration_seconds = started.elapsed().as_secs_f64();
    stats
}

// ---------------------------------------------------------------------------
// Forward pass
// ---------------------------------------------------------------------------

struct Forward<'a> {
    source_root: &'a Path,
    replica_root: &'a Path,
    options: SyncOptions,
    log: &'a dyn SyncLog,
    /// Replica directories a dry run pretends to have created.
    pending_dirs: Vec<PathBuf>,
}

/// Source → replica: create missing directories, copy changed files.
pub fn forward_pass(
    source_root: &Path,
    replica_root: &Path,
    options: SyncOptions,
    log: &dyn SyncLog,
    stats: &mut IterationStats,
) {
    let mut pass = Forward {
        source_root,
        replica_root,
        options,
        log,
        pending_dirs: Vec::new(),
    };

    let mut walker = WalkDir::new(source_root)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                record(log, stats, &walk_err(source_root, err));
                continue;
            }
        };
        let Some(replica) = pass.mirrored(entry.path()) else {
            continue;
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if let Err(err) = pass.ensure_dir(&replica, stats) {
                record(log, stats, &err);
                // Everything below would fail the same way.
                walker.skip_current_dir();
            }
        } else if file_type.is_file() {
            if let Err(err) = pass.sync_file(entry.path(), &replica, stats) {
                record(log, stats, &err);
            }
        } else {
            record(
                log,
                stats,
                &EngineError::Unsupported {
                    path: entry.path().to_path_buf(),
                },
            );
        }
    }
}

impl Forward<'_> {
    fn mirrored(&self, source: &Path) -> Option<PathBuf> {
        source
            .strip_prefix(self.source_root)
            .ok()
            .map(|rel| self.replica_root.join(rel))
    }

    fn prefix(&self) -> &'static str {
        dry_run_prefix(self.options)
    }

    fn is_pending(&self, replica: &Path) -> bool {
        self.pending_dirs.iter().any(|dir| replica.starts_with(dir))
    }

    fn ensure_dir(&mut self, replica: &Path, stats: &mut IterationStats) -> Result<(), EngineError> {
        if !self.is_pending(replica) {
            match fs::symlink_metadata(replica) {
                Ok(meta) if meta.is_dir() => return Ok(()),
                Ok(_) => {
                    // A file (or link) sits where the directory belongs.
                    if !self.options.dry_run {
                        fs::remove_file(replica).map_err(|e| remove_err(replica, e))?;
                    }
                    stats.files_removed += 1;
                    self.log
                        .info(&format!("{}Removed '{}'", self.prefix(), replica.display()));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(metadata_err(replica, err)),
            }
        }

        if self.options.dry_run {
            self.pending_dirs.push(replica.to_path_buf());
        } else {
            fs::create_dir_all(replica).map_err(|e| EngineError::CreateDir {
                path: replica.to_path_buf(),
                source: e,
            })?;
        }
        stats.dirs_created += 1;
        self.log.info(&format!(
            "{}Created directory '{}'",
            self.prefix(),
            replica.display()
        ));
        Ok(())
    }

    fn sync_file(
        &mut self,
        source: &Path,
        replica: &Path,
        stats: &mut IterationStats,
    ) -> Result<(), EngineError> {
        let mut replaced = self.is_pending(replica);
        if !replaced {
            match fs::symlink_metadata(replica) {
                Ok(meta) if meta.is_dir() => {
                    // A directory sits where the file belongs.
                    if !self.options.dry_run {
                        fs::remove_dir_all(replica).map_err(|e| remove_err(replica, e))?;
                    }
                    stats.dirs_removed += 1;
                    self.log.info(&format!(
                        "{}Removed directory '{}'",
                        self.prefix(),
                        replica.display()
                    ));
                    replaced = true;
                }
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(metadata_err(replica, err)),
            }
        }

        let decision = if replaced {
            Decision::ReplicaMissing
        } else {
            detector::compare(source, replica, self.options.compare)?
        };
        if !decision.needs_copy() {
            return Ok(());
        }

        if self.options.dry_run {
            let size = fs::metadata(source)
                .map_err(|e| metadata_err(source, e))?
                .len();
            stats.files_copied += 1;
            stats.bytes_copied += size;
            self.log.info(&format!(
                "{}Copied '{}' to '{}'",
                self.prefix(),
                source.display(),
                replica.display()
            ));
            return Ok(());
        }

        let bytes = transfer::copy_file(source, replica, self.log)?;
        stats.files_copied += 1;
        stats.bytes_copied += bytes;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cleanup pass
// ---------------------------------------------------------------------------

/// Replica → source: remove every replica entry whose source path is gone.
pub fn cleanup_pass(
    source_root: &Path,
    replica_root: &Path,
    options: SyncOptions,
    log: &dyn SyncLog,
    stats: &mut IterationStats,
) {
    let walker = WalkDir::new(replica_root)
        .follow_links(false)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                record(log, stats, &walk_err(replica_root, err));
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(replica_root) else {
            continue;
        };
        let source = source_root.join(rel);

        match fs::metadata(&source) {
            Ok(_) => continue,
            // The forward pass only pretended to replace this subtree.
            Err(err)
                if err.kind() == ErrorKind::NotADirectory
                    && options.dry_run
                    && replaced_by_file(source_root, rel) =>
            {
                continue
            }
            // A file where an ancestor directory used to be also means absent.
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {}
            Err(err) => {
                // Existence unknown: keep the replica entry.
                record(log, stats, &metadata_err(&source, err));
                continue;
            }
        }

        let orphan = entry.path();
        let is_dir = entry.file_type().is_dir();
        if let Err(err) = remove_orphan(orphan, is_dir, options) {
            record(log, stats, &err);
            continue;
        }
        if is_dir {
            stats.dirs_removed += 1;
            log.info(&format!(
                "{}Removed directory '{}'",
                dry_run_prefix(options),
                orphan.display()
            ));
        } else {
            stats.files_removed += 1;
            log.info(&format!(
                "{}Removed '{}'",
                dry_run_prefix(options),
                orphan.display()
            ));
        }
    }
}

/// Whether some ancestor of `rel` is a regular file in the source, so the
/// forward pass has already dealt with the replica directory above it.
fn replaced_by_file(source_root: &Path, rel: &Path) -> bool {
    rel.ancestors()
        .skip(1)
        .filter(|dir| !dir.as_os_str().is_empty())
        .any(|dir| {
            fs::metadata(source_root.join(dir))
                .map(|meta| meta.is_file())
                .unwrap_or(false)
        })
}

fn remove_orphan(path: &Path, is_dir: bool, options: SyncOptions) -> Result<(), EngineError> {
    if options.dry_run {
        return Ok(());
    }
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| remove_err(path, e))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dry_run_prefix(options: SyncOptions) -> &'static str {
    if options.dry_run {
        "[dry-run] "
    } else {
        ""
    }
}

fn walk_err(root: &Path, err: walkdir::Error) -> EngineError {
    let path = err.path().unwrap_or(root).to_path_buf();
    EngineError::Walk { path, source: err }
}

fn record(log: &dyn SyncLog, stats: &mut IterationStats, err: &EngineError) {
    stats.errors += 1;
    log.exception("Synchronization error", err);
}
