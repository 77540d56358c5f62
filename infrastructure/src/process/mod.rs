//! Child process execution.

pub mod executor;

pub use executor::{DEFAULT_MAX_OUTPUT_BYTES, TokioProcessExecutor};
