//! Configuration error types

use thiserror::Error;

/// Errors in static tool configuration.
///
/// These are raised while tools are being built from configuration, never
/// while a call is being validated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("id cannot be empty")]
    EmptyId,

    #[error("unclosed placeholder in template \"{template}\"")]
    UnclosedPlaceholder { template: String },

    #[error("empty placeholder in template \"{template}\"")]
    EmptyPlaceholder { template: String },

    #[error("template \"{template}\" references undeclared parameter '{name}'")]
    UnknownParameter { template: String, name: String },

    #[error("invalid tool name regex \"{pattern}\": {reason}")]
    InvalidNameRegex { pattern: String, reason: String },

    #[error("invalid argument regex \"{pattern}\": {reason}")]
    InvalidArgumentRegex { pattern: String, reason: String },

    #[error("invalid environment variable name '{0}'")]
    InvalidEnvName(String),

    #[error("environment variable '{0}' cannot be set by a tool")]
    DangerousEnvName(String),

    #[error("failed to resolve secret '{name}': {reason}")]
    Secret { name: String, reason: String },

    #[error("{0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_error_display() {
        let error = ConfigError::InvalidNameRegex {
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        };
        assert!(error.to_string().starts_with("invalid tool name regex \"(\""));
    }

    #[test]
    fn test_secret_error_names_secret_only() {
        let error = ConfigError::Secret {
            name: "api_key".to_string(),
            reason: "environment variable API_KEY is not set".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to resolve secret 'api_key': environment variable API_KEY is not set"
        );
    }
}
