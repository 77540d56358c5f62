//! Tool domain traits
//!
//! Contains pure domain logic traits for call-payload validation.
//! The async `Tool` port is defined in the application layer (ports).

use serde_json::{Map, Value};

use super::entities::ToolDefinition;
use super::value_objects::ToolError;

/// Validator for call payloads
///
/// This is a pure domain trait that checks a payload against its tool
/// definition without any I/O operations. Value-level security checks are
/// the job of [`crate::security::InjectionValidator`].
pub trait ToolValidator {
    fn validate(&self, arguments: &Map<String, Value>, definition: &ToolDefinition) -> Result<(), ToolError>;
}

/// Default implementation of ToolValidator
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, arguments: &Map<String, Value>, definition: &ToolDefinition) -> Result<(), ToolError> {
        for param in definition.parameters.iter().filter(|p| !p.secret) {
            if param.required && arguments.get(&param.name).is_none_or(Value::is_null) {
                return Err(ToolError::invalid_input(format!(
                    "missing required parameter '{}' for tool '{}'",
                    param.name, definition.name
                )));
            }
        }

        for name in arguments.keys() {
            if name == "args" && definition.allow_args {
                continue;
            }
            match definition.parameter(name) {
                Some(p) if p.secret => {
                    return Err(ToolError::invalid_input(format!(
                        "parameter '{}' is a secret and cannot be supplied by the caller",
                        name
                    )));
                }
                Some(_) => {}
                None if name == "args" => {
                    return Err(ToolError::invalid_input(
                        "'args' parameter is not allowed for this tool",
                    ));
                }
                None => {
                    return Err(ToolError::invalid_input(format!(
                        "unknown parameter '{}' for tool '{}'",
                        name, definition.name
                    )));
                }
            }
        }

        Ok(())
    }
}
