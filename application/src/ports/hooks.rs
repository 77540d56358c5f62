//! Pre-call and post-call hook ports.
//!
//! Pre-call hooks run after resolution and before execution. They may deny
//! the call, replace the request with a new one, or record a cache-control
//! action. Post-call hooks may replace the result or fail the whole call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use toolgate_domain::tool::{ExecutionRequest, ToolError, ToolOutput};

use super::tool::CallContext;

/// What a pre-call hook or call policy decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    #[default]
    Allow,
    Deny,
    SaveCache,
    DeleteCache,
}

impl HookAction {
    pub fn is_cache_action(&self) -> bool {
        matches!(self, HookAction::SaveCache | HookAction::DeleteCache)
    }
}

impl std::fmt::Display for HookAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HookAction::Allow => "allow",
            HookAction::Deny => "deny",
            HookAction::SaveCache => "save_cache",
            HookAction::DeleteCache => "delete_cache",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookDecision {
    pub action: HookAction,
    /// A new request to continue with. The original is never mutated.
    pub replacement: Option<ExecutionRequest>,
    /// Denial message; defaults to "tool execution denied by hook".
    pub message: Option<String>,
}

impl HookDecision {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            action: HookAction::Deny,
            replacement: None,
            message: Some(message.into()),
        }
    }

    pub fn with_action(action: HookAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_replacement(mut self, request: ExecutionRequest) -> Self {
        self.replacement = Some(request);
        self
    }
}

#[async_trait]
pub trait PreCallHook: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn before(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
    ) -> Result<HookDecision, ToolError>;
}

#[async_trait]
pub trait PostCallHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
        output: ToolOutput,
    ) -> Result<ToolOutput, ToolError>;
}
