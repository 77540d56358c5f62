//! Call policies.
//!
//! A policy is an ordered list of rules plus a default action. Rules match on
//! the exposed tool name and on the raw call payload; the first matching rule
//! decides. Regexes are compiled when the service is configured.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use toolgate_domain::ConfigError;
use toolgate_domain::tool::{ExecutionRequest, ToolError};

use crate::ports::hooks::{HookAction, HookDecision, PreCallHook};
use crate::ports::tool::CallContext;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRule {
    /// Matched against the exposed tool name. Empty matches every tool.
    pub name_regex: String,
    /// Matched against the JSON payload text. Empty matches every payload.
    pub argument_regex: String,
    pub action: HookAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallPolicy {
    /// Only `allow` lets unmatched calls through; anything else denies.
    pub default_action: HookAction,
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug)]
struct CompiledRule {
    name: Option<Regex>,
    argument: Option<Regex>,
    action: HookAction,
}

impl CompiledRule {
    fn matches(&self, request: &ExecutionRequest, payload: &str) -> bool {
        self.name
            .as_ref()
            .is_none_or(|re| re.is_match(&request.tool_name))
            && self.argument.as_ref().is_none_or(|re| re.is_match(payload))
    }
}

/// Pre-call hook enforcing one [`CallPolicy`].
#[derive(Debug)]
pub struct PolicyHook {
    default_allows: bool,
    rules: Vec<CompiledRule>,
}

fn compile(pattern: &str, on_error: impl Fn(String) -> ConfigError) -> Result<Option<Regex>, ConfigError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|e| on_error(e.to_string()))
}

impl PolicyHook {
    pub fn compile(policy: &CallPolicy) -> Result<Self, ConfigError> {
        let rules = policy
            .rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    name: compile(&rule.name_regex, |reason| ConfigError::InvalidNameRegex {
                        pattern: rule.name_regex.clone(),
                        reason,
                    })?,
                    argument: compile(&rule.argument_regex, |reason| {
                        ConfigError::InvalidArgumentRegex {
                            pattern: rule.argument_regex.clone(),
                            reason,
                        }
                    })?,
                    action: rule.action,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            default_allows: policy.default_action == HookAction::Allow,
            rules,
        })
    }

    /// Decide a call without going through the hook interface.
    pub fn evaluate(&self, request: &ExecutionRequest) -> Result<HookAction, ToolError> {
        let payload = request.inputs_text();
        match self.rules.iter().find(|r| r.matches(request, &payload)) {
            Some(rule) if rule.action == HookAction::Deny => Err(ToolError::policy_denied(
                format!("tool execution denied by policy rule: {}", request.tool_name),
            )),
            Some(rule) => Ok(rule.action),
            None if self.default_allows => Ok(HookAction::Allow),
            None => Err(ToolError::policy_denied(format!(
                "tool execution denied by default policy: {}",
                request.tool_name
            ))),
        }
    }
}

#[async_trait]
impl PreCallHook for PolicyHook {
    fn name(&self) -> &str {
        "policy"
    }

    async fn before(
        &self,
        _ctx: &CallContext,
        request: &ExecutionRequest,
    ) -> Result<HookDecision, ToolError> {
        self.evaluate(request).map(HookDecision::with_action)
    }
}
