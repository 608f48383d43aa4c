//! # mirrorsync-engine
//!
//! One-way mirroring of a source tree onto a replica tree.
//!
//! Call [`run_pass`] for one full reconciliation (forward pass, then
//! cleanup pass). The building blocks are public for callers that need
//! finer control: [`detector::compare`] decides whether a file must be
//! copied, [`transfer::copy_file`] performs an atomic whole-file replace.

pub mod detector;
pub mod error;
pub mod log;
pub mod reconcile;
pub mod transfer;

pub use detector::{needs_copy, Decision, FileDescriptor};
pub use error::EngineError;
pub use log::{LogLevel, MemoryLog, SyncLog};
pub use reconcile::{cleanup_pass, forward_pass, run_pass};
pub use transfer::copy_file;
