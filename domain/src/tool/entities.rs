//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::naming::exposed_name;
use super::value_objects::ToolError;
use crate::core::error::ConfigError;

/// Behavioral hints about a tool, used by profile selectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
}

impl ToolAnnotations {
    /// Look up a hint by its selector key.
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "read_only" => Some(self.read_only),
            "destructive" => Some(self.destructive),
            "idempotent" => Some(self.idempotent),
            "open_world" => Some(self.open_world),
            _ => None,
        }
    }
}

/// Definition of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Bare tool name as configured (e.g., "status")
    pub name: String,
    /// Owning service; `None` only for internal tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Profiles this tool is explicitly assigned to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub annotations: ToolAnnotations,
    /// Accepts a caller-supplied `args` array
    #[serde(default)]
    pub allow_args: bool,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// JSON schema type hint (e.g., "string", "number", "boolean")
    pub param_type: String,
    /// Value names a filesystem path
    #[serde(default)]
    pub path: bool,
    /// Value comes from a secret source, never from the caller
    #[serde(default)]
    pub secret: bool,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_id: None,
            description: description.into(),
            parameters: Vec::new(),
            tags: Vec::new(),
            profiles: Vec::new(),
            annotations: ToolAnnotations::default(),
            allow_args: false,
        }
    }

    pub fn with_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.push(profile.into());
        self
    }

    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_allow_args(mut self, allow: bool) -> Self {
        self.allow_args = allow;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The namespaced name the tool is reachable under.
    pub fn exposed_name(&self) -> Result<String, ConfigError> {
        exposed_name(self.service_id.as_deref(), &self.name)
    }

    /// JSON schema of the call payload, as advertised to MCP clients.
    ///
    /// Secret parameters are not part of the schema; callers cannot set them.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for p in self.parameters.iter().filter(|p| !p.secret) {
            properties.insert(
                p.name.clone(),
                json!({ "type": p.param_type, "description": p.description }),
            );
            if p.required {
                required.push(Value::String(p.name.clone()));
            }
        }
        if self.allow_args {
            properties.insert(
                "args".to_string(),
                json!({
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Additional command-line arguments",
                }),
            );
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
            path: false,
            secret: false,
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    pub fn as_path(mut self) -> Self {
        self.path = true;
        self
    }

    pub fn as_secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// One call into the registry.
///
/// Immutable during dispatch; pre-call hooks may replace it with a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Exposed name of the tool to call
    pub tool_name: String,
    /// Raw JSON payload as received
    pub tool_inputs: Value,
    /// Pre-parsed arguments; takes precedence over `tool_inputs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
    /// Validate and report without running anything
    #[serde(default)]
    pub dry_run: bool,
    /// Exposed name of a tool resolved ahead of dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_tool: Option<String>,
}

impl ExecutionRequest {
    pub fn new(tool_name: impl Into<String>, tool_inputs: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_inputs,
            arguments: None,
            dry_run: false,
            resolved_tool: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_resolved_tool(mut self, exposed_name: impl Into<String>) -> Self {
        self.resolved_tool = Some(exposed_name.into());
        self
    }

    /// The argument object. `null` inputs are an empty object; anything else
    /// that is not an object is invalid input.
    pub fn arguments(&self) -> Result<Map<String, Value>, ToolError> {
        if let Some(arguments) = &self.arguments {
            return Ok(arguments.clone());
        }
        match &self.tool_inputs {
            Value::Object(map) => Ok(map.clone()),
            Value::Null => Ok(Map::new()),
            other => Err(ToolError::invalid_input(format!(
                "tool inputs must be a JSON object, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments()
            .ok()
            .and_then(|args| args.get(key).and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Get a required string argument
    pub fn require_string(&self, key: &str) -> Result<String, ToolError> {
        self.get_string(key)
            .ok_or_else(|| ToolError::invalid_input(format!("missing required argument: {}", key)))
    }

    /// Payload text used for argument-regex policy matching.
    pub fn inputs_text(&self) -> String {
        match &self.arguments {
            Some(arguments) => Value::Object(arguments.clone()).to_string(),
            None => self.tool_inputs.to_string(),
        }
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
