//! Configuration, pre-flight validation and per-iteration accounting shared
//! by the engine, the runtime and the CLI.
//!
//! - [`config`]: [`SyncConfig`], [`SyncOptions`], [`CompareMode`], pre-flight
//! - [`stats`]: [`IterationStats`], [`RunReport`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod stats;

pub use config::{CompareMode, Preflight, SyncConfig, SyncOptions};
pub use error::ConfigError;
pub use stats::{IterationStats, RunReport, RunTotals};
