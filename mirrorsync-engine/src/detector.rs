//! Change detection between a source file and its mirrored replica path.
//!
//! Decision order:
//! 1. replica missing → copy
//! 2. byte sizes differ → copy
//! 3. whole-second mtimes equal → skip (fast mode only)
//! 4. MD5 of both files differ → copy, otherwise skip
//!
//! Step 3 is lossy: a same-size edit that preserves the mtime is not
//! detected. [`CompareMode::Strict`] drops it.

use std::fs::{self, File, Metadata};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use md5::{Digest, Md5};

use mirrorsync_core::CompareMode;

use crate::error::{metadata_err, EngineError};

/// Read buffer size for streaming hashes.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// FileDescriptor
// ---------------------------------------------------------------------------

/// Comparison view of one file, rebuilt on every call. The hash is only
/// computed when asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Modification time truncated to whole seconds since the epoch.
    pub mtime_secs: i64,
    content_hash: Option<String>,
}

impl FileDescriptor {
    pub fn from_metadata(path: &Path, meta: &Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            size_bytes: meta.len(),
            mtime_secs: FileTime::from_last_modification_time(meta).unix_seconds(),
            content_hash: None,
        }
    }

    /// Stat `path`, following symlinks. `Ok(None)` when nothing is there.
    pub fn probe(path: &Path) -> Result<Option<Self>, EngineError> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(Self::from_metadata(path, &meta))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(metadata_err(path, err)),
        }
    }

    /// Hex MD5 of the file content, computed on first use.
    pub fn content_hash(&mut self) -> Result<&str, EngineError> {
        if self.content_hash.is_none() {
            self.content_hash = Some(hash_file(&self.path)?);
        }
        Ok(self.content_hash.as_deref().unwrap_or_default())
    }
}

/// Stream `path` through MD5 in [`HASH_CHUNK_SIZE`] reads.
pub fn hash_file(path: &Path) -> Result<String, EngineError> {
    let hash_err = |source| EngineError::Hash {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(hash_err)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(hash_err(err)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why the detector decided what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    ReplicaMissing,
    SizeDiffers,
    MtimeMatches,
    HashMatches,
    HashDiffers,
}

impl Decision {
    pub fn needs_copy(self) -> bool {
        matches!(
            self,
            Decision::ReplicaMissing | Decision::SizeDiffers | Decision::HashDiffers
        )
    }
}

/// Compare `source` against `replica`.
///
/// # Errors
/// A failed `stat` of either side (other than a missing replica) or a
/// failed hash read. The caller must not copy on error.
pub fn compare(source: &Path, replica: &Path, mode: CompareMode) -> Result<Decision, EngineError> {
    let Some(mut replica_desc) = FileDescriptor::probe(replica)? else {
        return Ok(Decision::ReplicaMissing);
    };
    let meta = fs::metadata(source).map_err(|e| metadata_err(source, e))?;
    let mut source_desc = FileDescriptor::from_metadata(source, &meta);

    if source_desc.size_bytes != replica_desc.size_bytes {
        return Ok(Decision::SizeDiffers);
    }
    if mode == CompareMode::Fast && source_desc.mtime_secs == replica_desc.mtime_secs {
        tracing::debug!("unchanged (mtime match): {}", source.display());
        return Ok(Decision::MtimeMatches);
    }

    let source_hash = source_desc.content_hash()?.to_owned();
    let replica_hash = replica_desc.content_hash()?;
    tracing::debug!(
        "hashed {}: {} vs {}",
        source.display(),
        source_hash,
        replica_hash
    );
    if source_hash == replica_hash {
        Ok(Decision::HashMatches)
    } else {
        Ok(Decision::HashDiffers)
    }
}

/// Boolean form of [`compare`].
pub fn needs_copy(source: &Path, replica: &Path, mode: CompareMode) -> Result<bool, EngineError> {
    compare(source, replica, mode).map(Decision::needs_copy)
}
