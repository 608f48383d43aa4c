//! Size-based rotation of the run log.
//!
//! Runs once, before the log file is opened for the run. Backups are named
//! `<log>.1` (newest) … `<log>.<max_files>` (oldest); anything past the
//! cap is deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default size threshold: 10 MiB.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of numbered backups kept.
pub const MAX_ROTATED_FILES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_LOG_BYTES,
            max_files: MAX_ROTATED_FILES,
        }
    }
}

impl RotationPolicy {
    /// Rotate `log_path` if it is at least `max_bytes` long.
    ///
    /// Returns `true` if a rotation happened. A missing log is not an error.
    /// With `max_files == 0` an oversized log is simply truncated.
    pub fn rotate_if_needed(&self, log_path: &Path) -> io::Result<bool> {
        let size = match fs::metadata(log_path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if size < self.max_bytes {
            return Ok(false);
        }

        if self.max_files == 0 {
            fs::File::create(log_path)?;
            return Ok(true);
        }

        remove_if_present(&backup_path(log_path, self.max_files))?;
        for n in (1..self.max_files).rev() {
            let from = backup_path(log_path, n);
            if from.exists() {
                fs::rename(&from, backup_path(log_path, n + 1))?;
            }
        }
        fs::rename(log_path, backup_path(log_path, 1))?;
        Ok(true)
    }
}

/// `<log>.<n>`
pub fn backup_path(log_path: &Path, n: usize) -> PathBuf {
    let mut name = log_path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "mirrorsync.log".into());
    name.push(format!(".{n}"));
    log_path.with_file_name(name)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tiny() -> RotationPolicy {
        RotationPolicy {
            max_bytes: 16,
            max_files: 3,
        }
    }

    #[test]
    fn small_log_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mirror.log");
        fs::write(&log, "short").unwrap();

        assert!(!tiny().rotate_if_needed(&log).unwrap());
        assert!(!backup_path(&log, 1).exists());
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!tiny().rotate_if_needed(&dir.path().join("absent.log")).unwrap());
    }

    #[test]
    fn oversized_log_moves_to_first_backup() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mirror.log");
        fs::write(&log, "x".repeat(32)).unwrap();

        assert!(tiny().rotate_if_needed(&log).unwrap());
        assert!(!log.exists(), "live log is recreated by the next open");
        assert_eq!(fs::read_to_string(backup_path(&log, 1)).unwrap().len(), 32);
    }

    #[test]
    fn backups_shift_and_are_capped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mirror.log");

        for round in 1..=5u8 {
            fs::write(&log, vec![b'0' + round; 20]).unwrap();
            tiny().rotate_if_needed(&log).unwrap();
        }

        // Newest first: round 5 in .1, round 3 in .3, rounds 1-2 dropped.
        assert_eq!(fs::read(backup_path(&log, 1)).unwrap()[0], b'5');
        assert_eq!(fs::read(backup_path(&log, 3)).unwrap()[0], b'3');
        assert!(!backup_path(&log, 4).exists());
    }

    #[test]
    fn zero_backups_truncates_in_place() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mirror.log");
        fs::write(&log, "y".repeat(32)).unwrap();

        let policy = RotationPolicy {
            max_bytes: 16,
            max_files: 0,
        };
        assert!(policy.rotate_if_needed(&log).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
    }

    #[test]
    fn default_policy_matches_constants() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.max_bytes, MAX_LOG_BYTES);
        assert_eq!(policy.max_files, MAX_ROTATED_FILES);
    }
}
