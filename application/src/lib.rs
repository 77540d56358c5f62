//! Application layer for toolgate
//!
//! This crate contains port definitions, the tool registry / dispatch
//! manager, the built-in hooks and middleware, and the use cases the CLI
//! drives. It depends only on the domain layer.

pub mod config;
pub mod middleware;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use config::DispatchParams;
pub use middleware::{AuditMiddleware, TracingMiddleware};
pub use ports::{
    audit_log::{AuditLog, AuditRecord, NoAuditLog},
    hooks::{HookAction, HookDecision, PostCallHook, PreCallHook},
    mcp_server::{McpCallHandler, McpServerPort, McpToolDescriptor},
    middleware::{Endpoint, Middleware, Next},
    process_executor::{ProcessError, ProcessExecutor, ProcessOutput, ProcessSpec},
    tool::{CallContext, Tool},
};
pub use registry::{CallPolicy, PolicyHook, PolicyRule, ServiceInfo, ToolManager};
pub use use_cases::check_invocation::{
    CheckInvocationError, CheckInvocationInput, CheckInvocationUseCase, CheckReport,
    SubstitutionReport,
};
