//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod audit;
mod execution;
mod output;
mod profiles;
mod services;

pub use audit::FileAuditConfig;
pub use execution::{FileExecutionConfig, MAX_OUTPUT_ENV};
pub use output::FileOutputConfig;
pub use profiles::FileProfilesConfig;
pub use services::{
    FileParameterConfig, FileSecretConfig, FileServiceConfig, FileToolConfig, FileWebhookConfig,
};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use toolgate_application::PolicyHook;
use toolgate_domain::{
    ConfigError, ConfigIssue, ConfigIssueCode, SsrfPolicy, check_env_name, sanitize_id,
};

use crate::tools::{Communication, compile_template};

const REDACTED: &str = "[REDACTED]";

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Timeouts, output limits and container runtime
    pub execution: FileExecutionConfig,
    /// Address classes URL-shaped values may point at
    pub ssrf: SsrfPolicy,
    /// JSONL audit log
    pub audit: FileAuditConfig,
    /// Profile filtering
    pub profiles: FileProfilesConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Upstream services and their tools
    pub services: Vec<FileServiceConfig>,
}

/// Map a build-time error to the issue code `config --validate` reports.
fn issue_for(error: &ConfigError, location: &str) -> ConfigIssue {
    let code = match error {
        ConfigError::EmptyId => ConfigIssueCode::EmptyServiceId,
        ConfigError::UnclosedPlaceholder { .. } | ConfigError::EmptyPlaceholder { .. } => {
            ConfigIssueCode::InvalidTemplate
        }
        ConfigError::UnknownParameter { .. } => ConfigIssueCode::UndeclaredParameter,
        ConfigError::InvalidNameRegex { .. } | ConfigError::InvalidArgumentRegex { .. } => {
            ConfigIssueCode::InvalidPolicyRegex
        }
        ConfigError::InvalidEnvName(_) => ConfigIssueCode::InvalidEnvName,
        ConfigError::DangerousEnvName(_) => ConfigIssueCode::DangerousEnvName,
        ConfigError::Secret { .. } | ConfigError::Invalid(_) => ConfigIssueCode::InvalidSecret,
    };
    ConfigIssue::error(code, format!("{}: {}", location, error))
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks, per service and tool:
    /// 1. Service ids: empty or duplicated after sanitizing
    /// 2. Call policy regexes
    /// 3. Tool names colliding after sanitizing, empty commands
    /// 4. Templates: syntax, undeclared parameters, secrets in argv
    /// 5. Environment names, secret bindings
    /// 6. Declared parameters that no template uses
    ///
    /// and finally enabled profiles that nothing defines or references.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut service_ids = HashSet::new();

        for (index, service) in self.services.iter().enumerate() {
            let location = if service.id.is_empty() {
                format!("services[{}]", index)
            } else {
                format!("service '{}'", service.id)
            };

            match sanitize_id(&service.id) {
                Ok(id) if !service_ids.insert(id.clone()) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateService,
                    format!("{}: service id '{}' is used more than once", location, id),
                )),
                Ok(_) => {}
                Err(e) => issues.push(issue_for(&e, &location)),
            }

            for policy in &service.policies {
                if let Err(e) = PolicyHook::compile(policy) {
                    issues.push(issue_for(&e, &location));
                }
            }

            for name in service.env.keys() {
                if let Err(e) = check_env_name(name) {
                    issues.push(issue_for(&e, &location));
                }
            }

            for secret in &service.secrets {
                if let Err(e) = secret.to_binding() {
                    issues.push(issue_for(&e, &location));
                }
            }

            self.validate_tools(service, &location, &mut issues);
        }

        let referenced: HashSet<&str> = self
            .services
            .iter()
            .flat_map(|s| s.tools.values())
            .flat_map(|t| t.profiles.iter().map(String::as_str))
            .collect();
        for profile in &self.profiles.enabled {
            if !self.profiles.is_defined(profile) && !referenced.contains(profile.as_str()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownProfile,
                    format!(
                        "profiles.enabled: '{}' is neither defined nor assigned to any tool",
                        profile
                    ),
                ));
            }
        }

        issues
    }

    /// Copy with every literal secret value masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for secret in config.services.iter_mut().flat_map(|s| s.secrets.iter_mut()) {
            if secret.value.is_some() {
                secret.value = Some(REDACTED.to_string());
            }
        }
        config
    }

    fn validate_tools(
        &self,
        service: &FileServiceConfig,
        location: &str,
        issues: &mut Vec<ConfigIssue>,
    ) {
        let mut tool_ids = HashSet::new();
        for (name, tool) in &service.tools {
            let tool_location = format!("{} tool '{}'", location, name);

            match sanitize_id(name) {
                Ok(id) if !tool_ids.insert(id.clone()) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateTool,
                    format!("{}: exposed name '{}' is already taken", tool_location, id),
                )),
                Ok(_) => {}
                Err(e) => issues.push(issue_for(&e, &tool_location)),
            }

            if tool.command.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyCommand,
                    format!("{}: command is empty", tool_location),
                ));
            }

            let definition = service.tool_definition(name, tool);
            let mut used = HashSet::new();
            for raw in &tool.args {
                match compile_template(raw, &definition, false) {
                    Ok(t) => used.extend(t.placeholders().map(|(n, _)| n.to_string())),
                    Err(e) => issues.push(issue_for(&e, &tool_location)),
                }
            }
            for (env_name, raw) in &tool.env {
                if let Err(e) = check_env_name(env_name) {
                    issues.push(issue_for(&e, &tool_location));
                }
                match compile_template(raw, &definition, true) {
                    Ok(t) => used.extend(t.placeholders().map(|(n, _)| n.to_string())),
                    Err(e) => issues.push(issue_for(&e, &tool_location)),
                }
            }

            if let Err(e) = service.tool_secrets(tool) {
                issues.push(issue_for(&e, &tool_location));
            }

            if tool.communication == Communication::Stdio {
                for (param, p) in &tool.parameters {
                    if !p.secret && !used.contains(param) {
                        issues.push(ConfigIssue::warning(
                            ConfigIssueCode::UnusedParameter,
                            format!(
                                "{}: parameter '{}' is not used by any template",
                                tool_location, param
                            ),
                        ));
                    }
                }
            }
        }
    }
}
