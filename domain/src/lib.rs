//! Domain layer for toolgate
//!
//! This crate contains the pure core: deciding whether a caller-supplied
//! value may be substituted into a configured command line, and the tool
//! entities the registry works with. It has no dependencies on
//! infrastructure or presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Argument security
//!
//! - **Quote-Context Scanner**: where a `{{placeholder}}` sits in its
//!   template (unquoted, single-quoted, double-quoted)
//! - **Command Classifier**: shell, interpreter or plain binary, with
//!   wrappers (`env`, `nice`, `sudo`) resolved
//! - **Injection Validator**: the ordered rule chain producing a [`Verdict`]
//! - **Environment/Secret Guard**: env-value rules and output redaction
//!
//! ## Tools
//!
//! - [`ToolDefinition`], [`ExecutionRequest`], [`ToolOutput`], [`ToolError`]
//! - Namespaced naming (`<service>.<tool>`) and profile filtering

pub mod config;
pub mod core;
pub mod security;
pub mod tool;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::error::ConfigError;
pub use security::{
    CommandProfile, ExecutionTarget, InjectionValidator, InterpreterKind, Invocation, ParamRole,
    QuoteContext, RejectKind, Rejection, SecretRedactor, SsrfPolicy, StaticUrlOracle,
    SubstitutionSite, UrlSafetyOracle, Verdict, check_env_name, classify, classify_invocation,
    locate_context,
};
pub use tool::{
    ArgumentTemplate, DefaultToolValidator, ExecutionRequest, OutputMetadata, ProfileDefinition,
    ProfileFilter, ProfileSelector, ToolAnnotations, ToolDefinition, ToolError, ToolOutput,
    ToolParameter, ToolValidator, parse_tool_name, sanitize_id,
};
