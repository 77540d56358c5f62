//! Webhook hook: asks an HTTP endpoint before and after each call.
//!
//! The endpoint receives `{kind, tool_name, inputs}` before a call and
//! `{kind, tool_name, result}` after it, and answers with
//! `{allowed, status: {code, message}, replacement_object}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use toolgate_application::ports::hooks::{HookDecision, PostCallHook, PreCallHook};
use toolgate_application::ports::tool::CallContext;
use toolgate_domain::tool::{ExecutionRequest, ToolError, ToolOutput};
use tracing::{debug, warn};

use crate::config::FileWebhookConfig;

const PRE_CALL: &str = "pre_call";
const POST_CALL: &str = "post_call";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookResponse {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub status: Option<WebhookStatus>,
    #[serde(default)]
    pub replacement_object: Option<Value>,
}

impl WebhookResponse {
    /// Decision for a pre-call response.
    pub fn into_pre_decision(self, request: &ExecutionRequest) -> Result<HookDecision, ToolError> {
        if !self.allowed {
            let message = match self.status {
                Some(status) if !status.message.is_empty() => {
                    format!("denied by webhook: {}", status.message)
                }
                _ => "denied by webhook".to_string(),
            };
            return Ok(HookDecision::deny(message));
        }
        match self.replacement_object {
            None | Some(Value::Null) => Ok(HookDecision::allow()),
            Some(Value::Object(inputs)) => Ok(HookDecision::allow().with_replacement(
                ExecutionRequest {
                    tool_inputs: Value::Object(inputs),
                    arguments: None,
                    ..request.clone()
                },
            )),
            Some(_) => Err(ToolError::policy_denied(
                "webhook replacement inputs must be a JSON object",
            )),
        }
    }

    /// Result after a post-call response. A replacement object whose only
    /// key is `value` is unwrapped.
    pub fn into_post_output(self, output: ToolOutput) -> ToolOutput {
        let value = match self.replacement_object {
            None | Some(Value::Null) => return output,
            Some(Value::Object(mut map)) if map.len() == 1 && map.contains_key("value") => {
                map.remove("value").unwrap_or(Value::Null)
            }
            Some(other) => other,
        };
        ToolOutput {
            value,
            metadata: output.metadata,
        }
    }
}

pub struct WebhookHook {
    url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for WebhookHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookHook").field("url", &self.url).finish()
    }
}

impl WebhookHook {
    pub fn new(config: &FileWebhookConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ToolError::configuration(format!("failed to build webhook client: {}", e)))?;
        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    async fn send(&self, ctx: &CallContext, body: Value) -> Result<WebhookResponse, ToolError> {
        let request = self.client.post(&self.url).json(&body).send();
        let response = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => return Err(ToolError::Cancelled),
            r = request => r.map_err(|e| ToolError::executor(format!("webhook error: {}", e)))?,
        };
        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "Webhook returned an error status");
            return Err(ToolError::executor(format!(
                "webhook error: HTTP {}",
                status.as_u16()
            )));
        }
        response
            .json::<WebhookResponse>()
            .await
            .map_err(|e| ToolError::executor(format!("failed to decode webhook response: {}", e)))
    }
}

#[async_trait]
impl PreCallHook for WebhookHook {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn before(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
    ) -> Result<HookDecision, ToolError> {
        let body = json!({
            "kind": PRE_CALL,
            "tool_name": request.tool_name,
            "inputs": Value::Object(request.arguments()?),
        });
        debug!(url = %self.url, tool = %request.tool_name, "Calling pre-call webhook");
        self.send(ctx, body).await?.into_pre_decision(request)
    }
}

#[async_trait]
impl PostCallHook for WebhookHook {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn after(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
        output: ToolOutput,
    ) -> Result<ToolOutput, ToolError> {
        let body = json!({
            "kind": POST_CALL,
            "tool_name": request.tool_name,
            "result": output.value,
        });
        debug!(url = %self.url, tool = %request.tool_name, "Calling post-call webhook");
        Ok(self.send(ctx, body).await?.into_post_output(output))
    }
}
