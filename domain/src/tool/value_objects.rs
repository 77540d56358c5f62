//! Tool domain value objects — call outputs and the dispatch error taxonomy
//!
//! Every error carries a stable code. Callers and operators classify
//! failures by the code or by the category phrase embedded in the message,
//! never by parsing free text.
//!
//! | Code | Retryable? | Raised by |
//! |------|-----------|-----------|
//! | `CONFIGURATION_ERROR` | No | bad template, missing schema, unresolvable secret |
//! | `VALIDATION_REJECTED` | No | injection validator, environment guard |
//! | `POLICY_DENIED` | No | call policies, pre-call hooks |
//! | `SERVICE_UNHEALTHY` | Yes | registry health gate |
//! | `NOT_FOUND` | No | name resolution |
//! | `EXECUTOR_FAILURE` | No | spawn or I/O error |
//! | `UPSTREAM_ERROR` | No | non-zero exit, remote error |
//! | `TIMEOUT` | Yes | per-call deadline |
//! | `CANCELLED` | No | caller cancellation |
//! | `INVALID_INPUT` | No | malformed call payload |
//!
//! Retryable only means an outer layer *may* retry with backoff; the
//! dispatch core never retries on its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::error::ConfigError;
use crate::security::verdict::Rejection;

/// Error returned from a tool call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolError {
    #[error("[CONFIGURATION_ERROR] {message}")]
    #[serde(rename = "CONFIGURATION_ERROR")]
    Configuration { message: String },

    #[error("[VALIDATION_REJECTED] {rejection}")]
    #[serde(rename = "VALIDATION_REJECTED")]
    ValidationRejection { rejection: Rejection },

    #[error("[POLICY_DENIED] {message}")]
    PolicyDenied { message: String },

    #[error("[SERVICE_UNHEALTHY] service {service} is currently unhealthy")]
    ServiceUnhealthy { service: String },

    #[error("[NOT_FOUND] tool '{name}' not found{}", suggestion_suffix(.suggestion))]
    #[serde(rename = "NOT_FOUND")]
    ToolNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("[EXECUTOR_FAILURE] {message}")]
    ExecutorFailure { message: String },

    #[error("[UPSTREAM_ERROR] {message}{}", exit_code_suffix(.exit_code))]
    UpstreamError {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("[TIMEOUT] tool '{tool}' timed out after {after_ms}ms")]
    Timeout { tool: String, after_ms: u64 },

    #[error("[CANCELLED] tool call was cancelled")]
    Cancelled,

    #[error("[INVALID_INPUT] {message}")]
    InvalidInput { message: String },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

fn exit_code_suffix(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

impl ToolError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn policy_denied(message: impl Into<String>) -> Self {
        Self::PolicyDenied {
            message: message.into(),
        }
    }

    pub fn unhealthy(service: impl Into<String>) -> Self {
        Self::ServiceUnhealthy {
            service: service.into(),
        }
    }

    pub fn not_found(name: impl Into<String>, suggestion: Option<String>) -> Self {
        Self::ToolNotFound {
            name: name.into(),
            suggestion,
        }
    }

    pub fn executor(message: impl Into<String>) -> Self {
        Self::ExecutorFailure {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::UpstreamError {
            message: message.into(),
            exit_code,
        }
    }

    pub fn timeout(tool: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Configuration { .. } => "CONFIGURATION_ERROR",
            ToolError::ValidationRejection { .. } => "VALIDATION_REJECTED",
            ToolError::PolicyDenied { .. } => "POLICY_DENIED",
            ToolError::ServiceUnhealthy { .. } => "SERVICE_UNHEALTHY",
            ToolError::ToolNotFound { .. } => "NOT_FOUND",
            ToolError::ExecutorFailure { .. } => "EXECUTOR_FAILURE",
            ToolError::UpstreamError { .. } => "UPSTREAM_ERROR",
            ToolError::Timeout { .. } => "TIMEOUT",
            ToolError::Cancelled => "CANCELLED",
            ToolError::InvalidInput { .. } => "INVALID_INPUT",
        }
    }

    /// Whether an outer orchestration layer may retry the call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolError::ServiceUnhealthy { .. } | ToolError::Timeout { .. }
        )
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ToolError::ValidationRejection { rejection } => Some(rejection),
            _ => None,
        }
    }

    /// Apply `f` to every free-text field. Used to scrub secrets from
    /// errors before they reach the caller.
    pub fn map_text(self, f: impl Fn(&str) -> String) -> Self {
        match self {
            ToolError::Configuration { message } => ToolError::Configuration {
                message: f(&message),
            },
            ToolError::ValidationRejection { mut rejection } => {
                rejection.detail = f(&rejection.detail);
                ToolError::ValidationRejection { rejection }
            }
            ToolError::PolicyDenied { message } => ToolError::PolicyDenied {
                message: f(&message),
            },
            ToolError::ExecutorFailure { message } => ToolError::ExecutorFailure {
                message: f(&message),
            },
            ToolError::UpstreamError { message, exit_code } => ToolError::UpstreamError {
                message: f(&message),
                exit_code,
            },
            ToolError::InvalidInput { message } => ToolError::InvalidInput {
                message: f(&message),
            },
            other => other,
        }
    }
}

impl From<Rejection> for ToolError {
    fn from(rejection: Rejection) -> Self {
        ToolError::ValidationRejection { rejection }
    }
}

impl From<ConfigError> for ToolError {
    fn from(error: ConfigError) -> Self {
        ToolError::configuration(error.to_string())
    }
}

/// Structured metadata about a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// Duration of execution in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Process exit code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Bytes of captured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

/// Successful result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub value: Value,
    #[serde(default)]
    pub metadata: OutputMetadata,
}

impl ToolOutput {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            metadata: OutputMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: OutputMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.metadata.dry_run
    }
}
