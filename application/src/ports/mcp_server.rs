//! MCP server bridge port
//!
//! Every registered tool is also advertised to an MCP server when one is
//! attached. The server calls back through an [`McpCallHandler`], which routes
//! the call into the full dispatch pipeline.

use std::sync::Weak;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use toolgate_domain::tool::{ExecutionRequest, ToolAnnotations, ToolError, ToolOutput};

use crate::ports::tool::CallContext;
use crate::registry::ToolManager;

/// A tool as advertised to MCP clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

pub trait McpServerPort: Send + Sync {
    fn register_tool(&self, descriptor: McpToolDescriptor, handler: McpCallHandler);

    fn unregister_tools(&self, names: &[String]);
}

/// Routes an MCP tool call back into the manager.
///
/// Holds a weak reference so the server does not keep the manager alive.
#[derive(Clone)]
pub struct McpCallHandler {
    manager: Weak<ToolManager>,
    tool_name: String,
    timeout: Duration,
}

impl std::fmt::Debug for McpCallHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpCallHandler")
            .field("tool_name", &self.tool_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl McpCallHandler {
    pub(crate) fn new(manager: Weak<ToolManager>, tool_name: String, timeout: Duration) -> Self {
        Self {
            manager,
            tool_name,
            timeout,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Dispatch one MCP call. The arguments become the pre-parsed argument map.
    pub async fn call(&self, arguments: Map<String, Value>) -> Result<ToolOutput, ToolError> {
        let manager = self
            .manager
            .upgrade()
            .ok_or_else(|| ToolError::executor("tool manager is no longer available"))?;
        let request = ExecutionRequest::new(&self.tool_name, Value::Object(arguments.clone()))
            .with_arguments(arguments);
        let ctx = CallContext::new().with_deadline(tokio::time::Instant::now() + self.timeout);
        match tokio::time::timeout(self.timeout, manager.execute_tool(&ctx, request)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::timeout(&self.tool_name, self.timeout)),
        }
    }
}
