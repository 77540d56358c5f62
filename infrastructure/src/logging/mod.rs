//! Logging infrastructure — structured audit logging.
//!
//! Provides [`JsonlAuditLog`], a JSONL file writer that implements
//! the [`AuditLog`](toolgate_application::AuditLog) port.

mod jsonl_audit;

pub use jsonl_audit::JsonlAuditLog;
