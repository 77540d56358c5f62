//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the command-line tool adapter, the tokio process
//! executor, configuration file loading, secret resolution and the JSONL
//! audit log.

pub mod bootstrap;
pub mod config;
#[cfg(feature = "webhooks")]
pub mod hooks;
pub mod logging;
pub mod process;
pub mod secrets;
pub mod tools;

// Re-export commonly used types
pub use bootstrap::{build_manager, build_validator};
pub use config::{ConfigLoader, FileConfig, FileOutputConfig};
pub use logging::JsonlAuditLog;
pub use process::TokioProcessExecutor;
pub use secrets::{SecretBinding, SecretSource};
pub use tools::{CommandSpec, CommandTool};
