//! Check Invocation use case
//!
//! Validates caller values against a command line without running it, and
//! reports the verdict for every substitution site.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use toolgate_domain::{
    ArgumentTemplate, ConfigError, ExecutionTarget, InjectionValidator, QuoteContext, Rejection,
    SubstitutionSite, check_env_name, classify_invocation,
};
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckInvocationError {
    #[error("empty command")]
    EmptyCommand,

    #[error(transparent)]
    Template(#[from] ConfigError),
}

/// Input for the CheckInvocation use case
#[derive(Debug, Clone, Default)]
pub struct CheckInvocationInput {
    pub command: String,
    /// Argument templates, one argv slot each
    pub args: Vec<String>,
    /// Environment templates
    pub env: BTreeMap<String, String>,
    /// Caller values by parameter name; missing ones render empty
    pub params: BTreeMap<String, String>,
    /// Parameters declared as filesystem paths
    pub path_params: Vec<String>,
    pub target: ExecutionTarget,
}

impl CheckInvocationInput {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_arg(mut self, template: impl Into<String>) -> Self {
        self.args.push(template.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.env.insert(name.into(), template.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>) -> Self {
        self.path_params.push(name.into());
        self
    }

    pub fn with_target(mut self, target: ExecutionTarget) -> Self {
        self.target = target;
        self
    }
}

/// Verdict for one placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstitutionReport {
    pub param: String,
    /// Argument index, or `None` for an environment template
    pub arg_index: Option<usize>,
    /// Environment variable name for environment templates
    pub env_name: Option<String>,
    pub context: QuoteContext,
    pub script_position: bool,
    pub rejection: Option<Rejection>,
}

impl SubstitutionReport {
    pub fn is_allowed(&self) -> bool {
        self.rejection.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub command: String,
    /// Command that finally runs once wrappers are peeled off
    pub effective: String,
    pub wrappers: Vec<String>,
    pub opaque: bool,
    /// Refusal that applies to the whole invocation
    pub blocked: Option<Rejection>,
    pub substitutions: Vec<SubstitutionReport>,
    /// Argv as it would be spawned, present only when everything passed
    pub argv: Option<Vec<String>>,
}

impl CheckReport {
    pub fn is_allowed(&self) -> bool {
        self.blocked.is_none() && self.substitutions.iter().all(SubstitutionReport::is_allowed)
    }
}

/// Use case for dry-checking a command line against caller values
pub struct CheckInvocationUseCase {
    validator: InjectionValidator,
}

impl CheckInvocationUseCase {
    pub fn new(validator: InjectionValidator) -> Self {
        Self { validator }
    }

    pub fn execute(&self, input: CheckInvocationInput) -> Result<CheckReport, CheckInvocationError> {
        if input.command.trim().is_empty() {
            return Err(CheckInvocationError::EmptyCommand);
        }
        let templates = input
            .args
            .iter()
            .map(ArgumentTemplate::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let invocation = classify_invocation(&input.command, &input.args);
        let value = |name: &str| input.params.get(name).map(String::as_str).unwrap_or_default();
        let is_path = |name: &str| input.path_params.iter().any(|p| p == name);

        let mut substitutions = Vec::new();
        for (index, template) in templates.iter().enumerate() {
            for (name, offset) in template.placeholders() {
                let site = SubstitutionSite::locate(template.raw(), offset, &invocation, index)
                    .with_target(input.target)
                    .with_path_argument(is_path(name));
                let rejection = self
                    .validator
                    .validate(value(name), &site)
                    .into_result()
                    .err()
                    .map(|r| r.for_parameter(name));
                substitutions.push(SubstitutionReport {
                    param: name.to_string(),
                    arg_index: Some(index),
                    env_name: None,
                    context: site.context,
                    script_position: site.script_position,
                    rejection,
                });
            }
        }

        for (env_name, raw) in &input.env {
            check_env_name(env_name)?;
            let template = ArgumentTemplate::parse(raw.as_str())?;
            let forwarded = templates.iter().any(|t| t.references_variable(env_name));
            for (name, _) in template.placeholders() {
                let site = SubstitutionSite::environment(invocation.profile.clone())
                    .with_target(input.target)
                    .with_forwarded_to_args(forwarded);
                let rejection = self
                    .validator
                    .validate(value(name), &site)
                    .into_result()
                    .err()
                    .map(|r| r.for_parameter(name));
                substitutions.push(SubstitutionReport {
                    param: name.to_string(),
                    arg_index: None,
                    env_name: Some(env_name.clone()),
                    context: QuoteContext::Unquoted,
                    script_position: false,
                    rejection,
                });
            }
        }

        let (sandbox, blocked) = match invocation.sandbox_flag() {
            Ok(flag) => (flag, None),
            Err(rejection) => (None, Some(rejection)),
        };

        let mut report = CheckReport {
            command: input.command.clone(),
            effective: invocation.effective.clone(),
            wrappers: invocation.wrappers.clone(),
            opaque: invocation.opaque,
            blocked,
            substitutions,
            argv: None,
        };
        if report.is_allowed() {
            let values: std::collections::HashMap<String, String> =
                input.params.clone().into_iter().collect();
            let mut argv = vec![input.command.clone()];
            argv.extend(sandbox.map(str::to_string));
            argv.extend(templates.iter().map(|t| t.render(&values)));
            report.argv = Some(argv);
        }
        debug!(
            command = %report.command,
            effective = %report.effective,
            allowed = report.is_allowed(),
            "Checked invocation"
        );
        Ok(report)
    }
}
