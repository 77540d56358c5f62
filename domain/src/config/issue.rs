//! Structured configuration issues.
//!
//! Validation collects every problem it finds instead of stopping at the
//! first one, so `toolgate config --validate` can show them all at once.

use serde::Serialize;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigIssueCode {
    EmptyServiceId,
    DuplicateService,
    DuplicateTool,
    EmptyCommand,
    InvalidTemplate,
    UndeclaredParameter,
    UnusedParameter,
    InvalidPolicyRegex,
    InvalidEnvName,
    DangerousEnvName,
    InvalidSecret,
    UnknownProfile,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_severity() {
        assert!(ConfigIssue::error(ConfigIssueCode::EmptyCommand, "x").is_error());
        assert!(!ConfigIssue::warning(ConfigIssueCode::UnusedParameter, "x").is_error());
    }
}
