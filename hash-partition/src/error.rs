//! Re-exports the crate-local error type shared with [`gpu_runtime`].
//!
//! The partitioning core raises nothing beyond what `gpu_runtime::Error` already taxonomizes:
//! precondition violations, resource exhaustion, and device faults all have a home there.

pub use gpu_runtime::error::{Error, Result};
