//! Port for the structured dispatch audit log.
//!
//! Defines the [`AuditLog`] trait for recording one record per dispatched
//! call (tool, outcome, duration, redacted arguments).
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures a
//! machine-readable trail (JSONL) that operators can grep by error code.

use serde::Serialize;
use serde_json::Value;

/// One dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Exposed tool name as requested.
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// `"ok"` or the error code.
    pub outcome: String,
    pub duration_ms: u64,
    pub dry_run: bool,
    /// Call arguments with secrets replaced.
    pub arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Port for writing audit records.
///
/// The `record` method is synchronous and non-fallible so a failing log
/// never changes the outcome of a call.
pub trait AuditLog: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLog;

impl AuditLog for NoAuditLog {
    fn record(&self, _record: AuditRecord) {}
}
