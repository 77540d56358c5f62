//! Built-in middleware.
//!
//! - [`TracingMiddleware`] — duration and structured log per call
//! - [`AuditMiddleware`] — one [`AuditRecord`](crate::ports::audit_log::AuditRecord) per call

pub mod audit;
pub mod timing;

pub use audit::AuditMiddleware;
pub use timing::TracingMiddleware;
