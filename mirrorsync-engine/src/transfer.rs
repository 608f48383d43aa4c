//! Atomic whole-file transfer.
//!
//! ## `copy_file` protocol
//!
//! 1. Ensure the destination's parent directory exists.
//! 2. Drop any stale `<dest>.mirror-<pid>.tmp` left by an earlier attempt.
//! 3. Copy the source into that staging file (content + permissions).
//! 4. Stamp the source's access/modification times onto the temp file.
//! 5. Rename the temp file onto `<dest>` (atomic within one directory).
//!
//! A failure at any step removes the temp file and leaves `<dest>` as it
//! was. A leftover temp file from a killed process has no source
//! counterpart, so the next cleanup pass removes it.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use crate::error::EngineError;
use crate::log::SyncLog;

/// Marker between the destination file name and the process id in a
/// staging name: `<name>.mirror-<pid>.tmp`.
pub const TMP_TAG: &str = ".mirror-";

/// Sibling staging path for `dest`, unique to this process.
pub fn tmp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(format!("{TMP_TAG}{}.tmp", std::process::id()));
    dest.with_file_name(name)
}

/// Copy `source` onto `dest` with atomic-replace semantics.
///
/// Returns the number of bytes copied.
///
/// # Errors
/// [`EngineError::CreateDir`] if the parent cannot be created,
/// [`EngineError::Transfer`] for any staging or rename failure.
pub fn copy_file(source: &Path, dest: &Path, log: &dyn SyncLog) -> Result<u64, EngineError> {
    copy_file_with_tmp(source, dest, &tmp_path_for(dest), log)
}

fn copy_file_with_tmp(
    source: &Path,
    dest: &Path,
    tmp: &Path,
    log: &dyn SyncLog,
) -> Result<u64, EngineError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| EngineError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let staged = stage(source, tmp).and_then(|bytes| fs::rename(tmp, dest).map(|()| bytes));
    match staged {
        Ok(bytes) => {
            log.info(&format!(
                "Copied '{}' to '{}'",
                source.display(),
                dest.display()
            ));
            Ok(bytes)
        }
        Err(err) => {
            let _ = fs::remove_file(tmp);
            Err(EngineError::Transfer {
                from: source.to_path_buf(),
                to: dest.to_path_buf(),
                source: err,
            })
        }
    }
}

fn stage(source: &Path, tmp: &Path) -> io::Result<u64> {
    match fs::remove_file(tmp) {
        Ok(()) => tracing::debug!("removed stale staging file {}", tmp.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let bytes = fs::copy(source, tmp)?;
    let meta = fs::metadata(source)?;
    filetime::set_file_times(
        tmp,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )?;
    Ok(bytes)
}
