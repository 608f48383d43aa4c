//! Per-iteration accounting.
//!
//! An [`IterationStats`] is created fresh for each iteration, filled in by
//! the reconciliation passes, logged, and collected into a [`RunReport`].
//! Nothing here survives the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// 1-based iteration number.
    pub iteration: u32,
    pub started_at: DateTime<Utc>,
    pub files_copied: u64,
    pub files_removed: u64,
    pub dirs_created: u64,
    pub dirs_removed: u64,
    pub errors: u64,
    pub bytes_copied: u64,
    pub duration_seconds: f64,
}

impl IterationStats {
    pub fn new(iteration: u32) -> Self {
        Self {
            iteration,
            started_at: Utc::now(),
            files_copied: 0,
            files_removed: 0,
            dirs_created: 0,
            dirs_removed: 0,
            errors: 0,
            bytes_copied: 0,
            duration_seconds: 0.0,
        }
    }

    /// `true` when the pass changed nothing and hit no errors.
    pub fn is_noop(&self) -> bool {
        self.files_copied == 0
            && self.files_removed == 0
            && self.dirs_created == 0
            && self.dirs_removed == 0
            && self.errors == 0
    }

    /// The one-line tally written to the log after each iteration.
    pub fn summary_line(&self) -> String {
        format!(
            "Files copied: {}, Files removed: {}, Directories created: {}, Directories removed: {}, Errors: {}",
            self.files_copied, self.files_removed, self.dirs_created, self.dirs_removed, self.errors
        )
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Everything a finished (or interrupted) run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub configured_iterations: u32,
    pub iterations: Vec<IterationStats>,
    /// Shutdown was requested before all iterations ran.
    pub interrupted: bool,
}

/// Sum of every iteration in a [`RunReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub files_copied: u64,
    pub files_removed: u64,
    pub dirs_created: u64,
    pub dirs_removed: u64,
    pub errors: u64,
    pub bytes_copied: u64,
    pub duration_seconds: f64,
}

impl RunReport {
    pub fn new(configured_iterations: u32) -> Self {
        Self {
            configured_iterations,
            iterations: Vec::with_capacity(configured_iterations as usize),
            interrupted: false,
        }
    }

    /// All configured iterations ran.
    pub fn completed(&self) -> bool {
        !self.interrupted && self.iterations.len() as u32 == self.configured_iterations
    }

    pub fn totals(&self) -> RunTotals {
        self.iterations
            .iter()
            .fold(RunTotals::default(), |mut acc, it| {
                acc.files_copied += it.files_copied;
                acc.files_removed += it.files_removed;
                acc.dirs_created += it.dirs_created;
                acc.dirs_removed += it.dirs_removed;
                acc.errors += it.errors;
                acc.bytes_copied += it.bytes_copied;
                acc.duration_seconds += it.duration_seconds;
                acc
            })
    }
}
