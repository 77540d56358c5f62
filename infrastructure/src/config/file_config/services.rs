//! Service and tool configuration from TOML (`[[services]]` array)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toolgate_application::CallPolicy;
use toolgate_domain::{ConfigError, ToolAnnotations, ToolDefinition, ToolParameter};

use super::execution::FileExecutionConfig;
use crate::secrets::{SecretBinding, SecretSource};
use crate::tools::{CommandSpec, Communication, ContainerSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServiceConfig {
    pub id: String,
    pub healthy: bool,
    /// Per-call deadline for every tool of this service
    pub timeout_secs: Option<u64>,
    /// Run the tools inside this image instead of on the host
    pub container_image: Option<String>,
    pub working_dir: Option<PathBuf>,
    /// Literal environment shared by every tool of the service
    pub env: BTreeMap<String, String>,
    pub secrets: Vec<FileSecretConfig>,
    pub policies: Vec<CallPolicy>,
    pub webhooks: Vec<FileWebhookConfig>,
    pub tools: BTreeMap<String, FileToolConfig>,
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            healthy: true,
            timeout_secs: None,
            container_image: None,
            working_dir: None,
            env: BTreeMap::new(),
            secrets: Vec::new(),
            policies: Vec::new(),
            webhooks: Vec::new(),
            tools: BTreeMap::new(),
        }
    }
}

/// A secret with exactly one of `value`, `env` or `file`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSecretConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWebhookConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Consult the webhook before each call
    pub pre_call: bool,
    /// Pass each result through the webhook
    pub post_call: bool,
}

impl Default for FileWebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 5,
            pre_call: true,
            post_call: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolConfig {
    pub command: String,
    /// Argument templates, one argv slot each
    pub args: Vec<String>,
    /// Environment templates
    pub env: BTreeMap<String, String>,
    pub description: String,
    pub tags: Vec<String>,
    pub profiles: Vec<String>,
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
    /// Accept a caller-supplied `args` array
    pub allow_args: bool,
    pub communication: Communication,
    pub parameters: BTreeMap<String, FileParameterConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParameterConfig {
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
    /// Filled from the service secret of the same name, never by the caller
    pub secret: bool,
    /// The value is a filesystem path
    pub path: bool,
}

impl Default for FileParameterConfig {
    fn default() -> Self {
        Self {
            param_type: "string".to_string(),
            description: String::new(),
            required: false,
            secret: false,
            path: false,
        }
    }
}

impl FileSecretConfig {
    pub fn to_binding(&self) -> Result<SecretBinding, ConfigError> {
        let invalid = |reason: &str| ConfigError::Secret {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        let source = match (&self.value, &self.env, &self.file) {
            (Some(v), None, None) => SecretSource::Value(v.clone()),
            (None, Some(e), None) => SecretSource::Env(e.clone()),
            (None, None, Some(f)) => SecretSource::File(f.clone()),
            (None, None, None) => return Err(invalid("no source configured")),
            _ => return Err(invalid("set exactly one of value, env or file")),
        };
        Ok(SecretBinding::new(self.name.clone(), source))
    }
}

impl FileServiceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Definition of tool `name` as exposed under this service.
    pub fn tool_definition(&self, name: &str, tool: &FileToolConfig) -> ToolDefinition {
        let mut definition = ToolDefinition::new(name, tool.description.clone())
            .with_service(self.id.clone())
            .with_allow_args(tool.allow_args)
            .with_annotations(ToolAnnotations {
                read_only: tool.read_only,
                destructive: tool.destructive,
                idempotent: tool.idempotent,
                open_world: tool.open_world,
            });
        for tag in &tool.tags {
            definition = definition.with_tag(tag.clone());
        }
        for profile in &tool.profiles {
            definition = definition.with_profile(profile.clone());
        }
        for (param_name, p) in &tool.parameters {
            let mut param = ToolParameter::new(param_name.clone(), p.description.clone(), p.required)
                .with_type(p.param_type.clone());
            if p.path {
                param = param.as_path();
            }
            if p.secret {
                param = param.as_secret();
            }
            definition = definition.with_parameter(param);
        }
        definition
    }

    /// Secret bindings for the secret parameters of `tool`.
    pub fn tool_secrets(&self, tool: &FileToolConfig) -> Result<Vec<SecretBinding>, ConfigError> {
        let mut bindings = Vec::new();
        for (name, _) in tool.parameters.iter().filter(|(_, p)| p.secret) {
            let Some(secret) = self.secrets.iter().find(|s| &s.name == name) else {
                return Err(ConfigError::Secret {
                    name: name.clone(),
                    reason: format!("service '{}' has no secret of that name", self.id),
                });
            };
            bindings.push(secret.to_binding()?);
        }
        Ok(bindings)
    }

    pub fn command_spec(
        &self,
        tool: &FileToolConfig,
        execution: &FileExecutionConfig,
    ) -> Result<CommandSpec, ConfigError> {
        Ok(CommandSpec {
            command: tool.command.clone(),
            args: tool.args.clone(),
            env: tool.env.clone(),
            service_env: self.env.clone(),
            secrets: self.tool_secrets(tool)?,
            working_dir: self.working_dir.clone(),
            container: self.container_image.as_ref().map(|image| ContainerSpec {
                runtime: execution.container_runtime.clone(),
                image: image.clone(),
                use_sudo: execution.use_sudo_for_container,
            }),
            communication: tool.communication,
            max_output_bytes: execution.effective_max_output_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_application::ports::hooks::HookAction;

    const SERVICE: &str = r#"
[[services]]
id = "git"
timeout_secs = 10
env = { GIT_PAGER = "cat" }

[[services.secrets]]
name = "GITHUB_TOKEN"
env = "GH_TOKEN"

[[services.policies]]
default_action = "allow"

[[services.policies.rules]]
name_regex = "push$"
action = "deny"

[services.tools.log]
command = "git"
args = ["log", "-n", "{{count}}", "--", "{{path}}"]
description = "Show history"
tags = ["inspect"]
read_only = true

[services.tools.log.parameters.count]
type = "integer"
required = true

[services.tools.log.parameters.path]
path = true

[services.tools.push]
command = "git"
args = ["push"]
env = { GIT_ASKPASS_TOKEN = "{{GITHUB_TOKEN}}" }

[services.tools.push.parameters.GITHUB_TOKEN]
secret = true
"#;

    fn service() -> FileServiceConfig {
        let config: super::super::FileConfig = toml::from_str(SERVICE).unwrap();
        config.services.into_iter().next().unwrap()
    }

    #[test]
    fn test_deserialize_service() {
        let svc = service();
        assert_eq!(svc.id, "git");
        assert!(svc.healthy);
        assert_eq!(svc.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(svc.env.get("GIT_PAGER").map(String::as_str), Some("cat"));
        assert_eq!(svc.policies[0].rules[0].action, HookAction::Deny);
        assert_eq!(svc.tools.len(), 2);
        assert_eq!(svc.tools["log"].parameters["count"].param_type, "integer");
        assert_eq!(svc.tools["log"].communication, Communication::Stdio);
    }

    #[test]
    fn test_tool_definition() {
        let svc = service();
        let def = svc.tool_definition("log", &svc.tools["log"]);
        assert_eq!(def.exposed_name().unwrap(), "git.log");
        assert!(def.annotations.read_only);
        assert_eq!(def.tags, vec!["inspect"]);
        assert!(def.parameter("path").unwrap().path);
        assert!(def.parameter("count").unwrap().required);
    }

    #[test]
    fn test_command_spec_binds_only_tool_secrets() {
        let svc = service();
        let execution = FileExecutionConfig::default();
        let log = svc.command_spec(&svc.tools["log"], &execution).unwrap();
        assert!(log.secrets.is_empty());
        assert!(log.container.is_none());

        let push = svc.command_spec(&svc.tools["push"], &execution).unwrap();
        assert_eq!(push.secrets.len(), 1);
        assert_eq!(push.secrets[0].source, SecretSource::Env("GH_TOKEN".to_string()));
    }

    #[test]
    fn test_container_image_switches_target() {
        let mut svc = service();
        svc.container_image = Some("alpine/git".to_string());
        let spec = svc
            .command_spec(&svc.tools["log"], &FileExecutionConfig::default())
            .unwrap();
        let container = spec.container.unwrap();
        assert_eq!(container.image, "alpine/git");
        assert_eq!(container.runtime, "docker");
    }

    #[test]
    fn test_secret_needs_exactly_one_source() {
        let both = FileSecretConfig {
            name: "t".to_string(),
            value: Some("a".to_string()),
            env: Some("B".to_string()),
            file: None,
        };
        assert!(matches!(both.to_binding(), Err(ConfigError::Secret { .. })));
        let none = FileSecretConfig {
            name: "t".to_string(),
            ..FileSecretConfig::default()
        };
        assert!(none.to_binding().is_err());
    }
}
