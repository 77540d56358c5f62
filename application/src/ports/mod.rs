//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_log;
pub mod hooks;
pub mod mcp_server;
pub mod middleware;
pub mod process_executor;
pub mod tool;
