//! Sync driver: pre-flight, the iteration loop, the inter-iteration wait,
//! and the process-level logging setup.

mod error;
pub mod log_rotation;
mod runtime;

pub use error::DaemonError;
pub use log_rotation::RotationPolicy;
pub use runtime::{init_tracing, run, start_blocking, TracingLog};
