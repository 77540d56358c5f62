//! Command-line tool adapter.
//!
//! Every placeholder is checked by the [`InjectionValidator`] against the
//! site it lands in before anything is spawned. The rendered argv goes to a
//! [`ProcessExecutor`] directly, never through a shell of our own.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolgate_application::ports::process_executor::{
    ProcessError, ProcessExecutor, ProcessOutput, ProcessSpec,
};
use toolgate_application::ports::tool::{CallContext, Tool};
use toolgate_domain::core::string::truncate;
use toolgate_domain::security::env::check_env_name;
use toolgate_domain::tool::entities::json_type_name;
use toolgate_domain::{
    ArgumentTemplate, ConfigError, DefaultToolValidator, ExecutionRequest, ExecutionTarget,
    InjectionValidator, Invocation, OutputMetadata, QuoteContext, SecretRedactor,
    SubstitutionSite, ToolDefinition, ToolError, ToolOutput, ToolValidator, classify_invocation,
};
use tracing::{debug, info, warn};

use crate::process::DEFAULT_MAX_OUTPUT_BYTES;
use crate::secrets::{SecretBinding, resolve_all};

/// Host variables forwarded to locally executed commands.
pub const FORWARDED_HOST_ENV: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "SHELL",
    "TMPDIR",
    "SYSTEMROOT",
    "WINDIR",
    "LANG",
];

/// Longest stderr excerpt carried in an error message.
const MAX_ERROR_EXCERPT: usize = 2048;

/// How a command exchanges data with its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Communication {
    /// Arguments on the command line, text output wrapped in a result object.
    #[default]
    Stdio,
    /// Input object on stdin, stdout parsed as JSON.
    Json,
}

/// Container runtime invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub runtime: String,
    pub image: String,
    pub use_sudo: bool,
}

/// Everything a command tool needs besides its definition.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub command: String,
    /// Argument templates, one argv slot each.
    pub args: Vec<String>,
    /// Environment templates of the tool.
    pub env: BTreeMap<String, String>,
    /// Literal environment of the owning service.
    pub service_env: BTreeMap<String, String>,
    /// Bindings for the tool's secret parameters.
    pub secrets: Vec<SecretBinding>,
    pub working_dir: Option<PathBuf>,
    pub container: Option<ContainerSpec>,
    pub communication: Communication,
    pub max_output_bytes: usize,
}

/// Parse `raw` and check that every placeholder names a declared parameter.
///
/// Secret parameters may only be referenced where `allow_secrets` is set;
/// argument templates end up in argv, which other users can read.
pub fn compile_template(
    raw: &str,
    definition: &ToolDefinition,
    allow_secrets: bool,
) -> Result<ArgumentTemplate, ConfigError> {
    let template = ArgumentTemplate::parse(raw)?;
    for (name, _) in template.placeholders() {
        match definition.parameter(name) {
            None => {
                return Err(ConfigError::UnknownParameter {
                    template: raw.to_string(),
                    name: name.to_string(),
                });
            }
            Some(p) if p.secret && !allow_secrets => {
                return Err(ConfigError::Invalid(format!(
                    "secret parameter '{}' cannot be used in argument template \"{}\"",
                    name, raw
                )));
            }
            Some(_) => {}
        }
    }
    Ok(template)
}

/// A configured command exposed as a tool.
pub struct CommandTool {
    definition: ToolDefinition,
    exposed_name: String,
    command: String,
    args: Vec<ArgumentTemplate>,
    env: Vec<(String, ArgumentTemplate)>,
    service_env: Vec<(String, String)>,
    secrets: Vec<SecretBinding>,
    working_dir: Option<PathBuf>,
    container: Option<ContainerSpec>,
    communication: Communication,
    max_output_bytes: usize,
    invocation: Invocation,
    validator: InjectionValidator,
    executor: Arc<dyn ProcessExecutor>,
}

impl std::fmt::Debug for CommandTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTool")
            .field("name", &self.exposed_name)
            .field("command", &self.command)
            .field("effective", &self.invocation.effective)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl CommandTool {
    pub fn new(
        definition: ToolDefinition,
        spec: CommandSpec,
        validator: InjectionValidator,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Result<Self, ConfigError> {
        if spec.command.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "tool '{}' has an empty command",
                definition.name
            )));
        }
        let exposed_name = definition.exposed_name()?;

        let args = spec
            .args
            .iter()
            .map(|raw| compile_template(raw, &definition, false))
            .collect::<Result<Vec<_>, _>>()?;

        let mut env = Vec::with_capacity(spec.env.len());
        for (name, raw) in &spec.env {
            check_env_name(name)?;
            env.push((name.clone(), compile_template(raw, &definition, true)?));
        }
        for name in spec.service_env.keys() {
            check_env_name(name)?;
        }

        for param in definition.parameters.iter().filter(|p| p.secret) {
            if !spec.secrets.iter().any(|b| b.name == param.name) {
                return Err(ConfigError::Secret {
                    name: param.name.clone(),
                    reason: "no binding configured for this secret parameter".to_string(),
                });
            }
        }
        for binding in &spec.secrets {
            check_env_name(&binding.name)?;
        }

        let invocation = classify_invocation(&spec.command, &spec.args);
        debug!(
            tool = %exposed_name,
            effective = %invocation.effective,
            wrappers = ?invocation.wrappers,
            opaque = invocation.opaque,
            "Classified command"
        );

        Ok(Self {
            exposed_name,
            command: spec.command,
            args,
            env,
            service_env: spec.service_env.into_iter().collect(),
            secrets: spec.secrets,
            working_dir: spec.working_dir,
            container: spec.container,
            communication: spec.communication,
            max_output_bytes: if spec.max_output_bytes == 0 {
                DEFAULT_MAX_OUTPUT_BYTES
            } else {
                spec.max_output_bytes
            },
            invocation,
            validator,
            executor,
            definition,
        })
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    fn target(&self) -> ExecutionTarget {
        if self.container.is_some() {
            ExecutionTarget::Container
        } else {
            ExecutionTarget::Local
        }
    }

    fn check(&self, value: &str, site: &SubstitutionSite, param: &str) -> Result<(), ToolError> {
        self.validator
            .validate(value, site)
            .into_result()
            .map_err(|rejection| {
                warn!(
                    tool = %self.exposed_name,
                    param = %param,
                    kind = ?rejection.kind,
                    "Rejected substitution"
                );
                ToolError::from(rejection.for_parameter(param))
            })
    }

    /// Scalar caller values keyed by parameter name. Missing optional
    /// parameters render as the empty string.
    fn parameter_values(
        &self,
        arguments: &Map<String, Value>,
    ) -> Result<HashMap<String, String>, ToolError> {
        let mut values = HashMap::new();
        for param in self.definition.parameters.iter().filter(|p| !p.secret) {
            let text = match arguments.get(&param.name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
                Some(other) => {
                    return Err(ToolError::invalid_input(format!(
                        "parameter '{}' must be a scalar, got {}",
                        param.name,
                        json_type_name(other)
                    )));
                }
            };
            values.insert(param.name.clone(), text);
        }
        Ok(values)
    }

    fn extra_args(&self, arguments: &Map<String, Value>) -> Result<Vec<String>, ToolError> {
        if !self.definition.allow_args {
            return Ok(Vec::new());
        }
        match arguments.get("args") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(ToolError::invalid_input("non-string value in 'args' array")),
                })
                .collect(),
            Some(other) => Err(ToolError::invalid_input(format!(
                "'args' must be an array of strings, got {}",
                json_type_name(other)
            ))),
        }
    }

    fn build_args(
        &self,
        values: &HashMap<String, String>,
        extra: Vec<String>,
    ) -> Result<Vec<String>, ToolError> {
        let target = self.target();
        let mut argv = Vec::with_capacity(self.args.len() + extra.len() + 1);
        if let Some(flag) = self.invocation.sandbox_flag()? {
            argv.push(flag.to_string());
        }

        for (index, template) in self.args.iter().enumerate() {
            for (name, offset) in template.placeholders() {
                let value = values.get(name).map(String::as_str).unwrap_or_default();
                let site = SubstitutionSite::locate(template.raw(), offset, &self.invocation, index)
                    .with_target(target)
                    .with_path_argument(self.definition.parameter(name).is_some_and(|p| p.path));
                self.check(value, &site, name)?;
            }
            argv.push(template.render(values));
        }

        for (k, value) in extra.into_iter().enumerate() {
            let index = self.args.len() + k;
            let site =
                SubstitutionSite::argument(QuoteContext::Unquoted, self.invocation.profile.clone())
                    .with_target(target)
                    .with_script_position(self.invocation.is_script_argument(index));
            self.check(&value, &site, "args")?;
            argv.push(value);
        }
        Ok(argv)
    }

    /// Variables the command itself sees, host variables excluded.
    fn build_env(
        &self,
        values: &HashMap<String, String>,
        secrets: &[(String, String)],
    ) -> Result<Vec<(String, String)>, ToolError> {
        let mut scope = values.clone();
        scope.extend(secrets.iter().cloned());

        let mut env = self.service_env.clone();
        for (name, template) in &self.env {
            let forwarded = self.args.iter().any(|t| t.references_variable(name));
            for (param, _) in template.placeholders() {
                if self.definition.parameter(param).is_some_and(|p| p.secret) {
                    continue;
                }
                let value = values.get(param).map(String::as_str).unwrap_or_default();
                let site = SubstitutionSite::environment(self.invocation.profile.clone())
                    .with_target(self.target())
                    .with_forwarded_to_args(forwarded);
                self.check(value, &site, param)?;
            }
            env.push((name.clone(), template.render(&scope)));
        }
        env.extend(secrets.iter().cloned());
        Ok(env)
    }

    /// Program, argv and process environment actually handed to the executor.
    fn launch_line(
        &self,
        args: Vec<String>,
        env: Vec<(String, String)>,
    ) -> (String, Vec<String>, Vec<(String, String)>, Vec<String>) {
        let mut process_env: Vec<(String, String)> = FORWARDED_HOST_ENV
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();
        let names: Vec<String> = env.iter().map(|(k, _)| k.clone()).collect();

        let Some(container) = &self.container else {
            process_env.extend(env);
            let visible = process_env.iter().map(|(k, _)| k.clone()).collect();
            return (self.command.clone(), args, process_env, visible);
        };

        let mut argv = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
        ];
        if let Some(dir) = &self.working_dir {
            argv.push("-w".to_string());
            argv.push(dir.to_string_lossy().into_owned());
        }
        for name in &names {
            argv.push("-e".to_string());
            argv.push(name.clone());
        }
        argv.push(container.image.clone());
        argv.push(self.command.clone());
        argv.extend(args);
        process_env.extend(env);

        if container.use_sudo {
            let mut sudo_args = Vec::with_capacity(argv.len() + 2);
            if !names.is_empty() {
                sudo_args.push(format!("--preserve-env={}", names.join(",")));
            }
            sudo_args.push(container.runtime.clone());
            sudo_args.extend(argv);
            ("sudo".to_string(), sudo_args, process_env, names)
        } else {
            (container.runtime.clone(), argv, process_env, names)
        }
    }

    fn map_process_error(&self, error: ProcessError) -> ToolError {
        match error {
            ProcessError::TimedOut(after) => ToolError::timeout(&self.exposed_name, after),
            ProcessError::Cancelled => ToolError::Cancelled,
            other => ToolError::executor(other.to_string()),
        }
    }

    fn render_output(
        &self,
        args: &[String],
        output: ProcessOutput,
        redactor: &SecretRedactor,
    ) -> Result<ToolOutput, ToolError> {
        let stdout = String::from_utf8_lossy(&redactor.redact_bytes(&output.stdout)).into_owned();
        let stderr = String::from_utf8_lossy(&redactor.redact_bytes(&output.stderr)).into_owned();
        if output.truncated {
            debug!(tool = %self.exposed_name, limit = self.max_output_bytes, "Output truncated");
        }

        if !output.success() {
            let message = match output.exit_code {
                Some(code) => format!(
                    "command exited with code {}: {}",
                    code,
                    truncate(stderr.trim(), MAX_ERROR_EXCERPT)
                ),
                None => format!(
                    "command terminated by signal: {}",
                    truncate(stderr.trim(), MAX_ERROR_EXCERPT)
                ),
            };
            return Err(ToolError::upstream(message, output.exit_code));
        }

        let metadata = OutputMetadata {
            duration_ms: Some(output.duration_ms()),
            exit_code: output.exit_code,
            bytes: Some(output.stdout.len() + output.stderr.len()),
            dry_run: false,
        };

        let value = match self.communication {
            Communication::Json => {
                let parsed: Value = serde_json::from_str(&stdout).map_err(|e| {
                    ToolError::upstream(
                        format!("command output is not valid JSON: {}", e),
                        output.exit_code,
                    )
                })?;
                redactor.redact_json(parsed)
            }
            Communication::Stdio => json!({
                "command": redactor.redact_str(&self.command),
                "args": args.iter().map(|a| redactor.redact_str(a)).collect::<Vec<_>>(),
                "combined_output": format!("{}{}", stdout, stderr),
                "stdout": stdout,
                "stderr": stderr,
                "start_time": timestamp(output.started_at),
                "end_time": timestamp(output.finished_at),
                "return_code": output.exit_code,
                "status": "success",
            }),
        };
        Ok(ToolOutput::new(value).with_metadata(metadata))
    }

    async fn run(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
        arguments: Map<String, Value>,
        secrets: &[(String, String)],
        redactor: &SecretRedactor,
    ) -> Result<ToolOutput, ToolError> {
        let values = self.parameter_values(&arguments)?;
        let extra = self.extra_args(&arguments)?;
        let args = self.build_args(&values, extra)?;
        let env = self.build_env(&values, secrets)?;
        let (program, argv, process_env, env_names) = self.launch_line(args.clone(), env);

        if request.dry_run {
            info!(tool = %self.exposed_name, program = %program, "Dry run");
            let value = json!({
                "dry_run": true,
                "command": program,
                "args": argv.iter().map(|a| redactor.redact_str(a)).collect::<Vec<_>>(),
                "env": env_names,
            });
            return Ok(ToolOutput::new(value).with_metadata(OutputMetadata {
                dry_run: true,
                ..OutputMetadata::default()
            }));
        }

        let mut spec = ProcessSpec::new(program)
            .with_args(argv)
            .with_env(process_env)
            .with_max_output_bytes(self.max_output_bytes);
        if let Some(timeout) = ctx.remaining() {
            spec = spec.with_timeout(timeout);
        }
        if self.container.is_none()
            && let Some(dir) = &self.working_dir
        {
            spec = spec.with_working_dir(dir.clone());
        }
        if self.communication == Communication::Json {
            let input = serde_json::to_vec(&Value::Object(arguments))
                .map_err(|e| ToolError::executor(format!("failed to encode input: {}", e)))?;
            spec = spec.with_stdin(input);
        }

        let output = self
            .executor
            .run(ctx, spec)
            .await
            .map_err(|e| self.map_process_error(e))?;
        self.render_output(&args, output, redactor)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl Tool for CommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
    ) -> Result<ToolOutput, ToolError> {
        let arguments = request.arguments()?;
        DefaultToolValidator.validate(&arguments, &self.definition)?;

        let secrets = resolve_all(&self.secrets).await?;
        let redactor = SecretRedactor::new(secrets.iter().map(|(_, v)| v.as_str()));

        self.run(ctx, request, arguments, &secrets, &redactor)
            .await
            .map_err(|e| e.map_text(|text| redactor.redact_str(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretSource;
    use parking_lot::Mutex;
    use std::time::Duration;
    use toolgate_domain::{RejectKind, ToolParameter};

    struct FakeExecutor {
        seen: Mutex<Vec<ProcessSpec>>,
        reply: Mutex<Option<Result<ProcessOutput, ProcessError>>>,
    }

    impl FakeExecutor {
        fn replying(exit_code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
            let now = Utc::now();
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                reply: Mutex::new(Some(Ok(ProcessOutput {
                    exit_code: Some(exit_code),
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: stderr.as_bytes().to_vec(),
                    truncated: false,
                    started_at: now,
                    finished_at: now,
                }))),
            })
        }

        fn failing(error: ProcessError) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                reply: Mutex::new(Some(Err(error))),
            })
        }

        fn last(&self) -> ProcessSpec {
            self.seen.lock().last().cloned().unwrap()
        }

        fn calls(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl ProcessExecutor for FakeExecutor {
        async fn run(
            &self,
            _ctx: &CallContext,
            spec: ProcessSpec,
        ) -> Result<ProcessOutput, ProcessError> {
            self.seen.lock().push(spec);
            self.reply
                .lock()
                .take()
                .unwrap_or(Err(ProcessError::Io("no reply configured".to_string())))
        }
    }

    fn definition() -> ToolDefinition {
        ToolDefinition::new("greet", "Say hello")
            .with_service("demo")
            .with_parameter(ToolParameter::new("name", "Who to greet", true))
            .with_parameter(ToolParameter::new("suffix", "Optional suffix", false))
    }

    fn spec(command: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..CommandSpec::default()
        }
    }

    fn tool(def: ToolDefinition, spec: CommandSpec, exec: Arc<FakeExecutor>) -> CommandTool {
        CommandTool::new(def, spec, InjectionValidator::default(), exec).unwrap()
    }

    fn call(inputs: Value) -> ExecutionRequest {
        ExecutionRequest::new("demo.greet", inputs)
    }

    #[tokio::test]
    async fn test_template_renders_into_single_slot() {
        let exec = FakeExecutor::replying(0, "hi\n", "");
        let t = tool(definition(), spec("echo", &["--name={{name}}{{suffix}}"]), exec.clone());
        let out = t
            .execute(&CallContext::new(), &call(json!({"name": "Ada Lovelace"})))
            .await
            .unwrap();

        let seen = exec.last();
        assert_eq!(seen.program, "echo");
        assert_eq!(seen.args, vec!["--name=Ada Lovelace"]);
        assert_eq!(out.value["stdout"], "hi\n");
        assert_eq!(out.value["status"], "success");
        assert_eq!(out.value["return_code"], 0);
        assert_eq!(out.metadata.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_injection_is_rejected_before_spawn() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), spec("sh", &["-c", "echo {{name}}"]), exec.clone());
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "x; rm -rf /"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_REJECTED");
        assert!(err.to_string().contains("parameter 'name'"));
        assert_eq!(exec.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), spec("echo", &["{{name}}"]), exec.clone());
        let err = t
            .execute(&CallContext::new(), &call(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(exec.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_scalar_parameter_is_invalid_input() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), spec("echo", &["{{name}}"]), exec);
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": ["a"]})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { ref message } if message.contains("array")));
    }

    #[tokio::test]
    async fn test_extra_args() {
        let def = definition().with_allow_args(true);

        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(def.clone(), spec("echo", &["{{name}}"]), exec.clone());
        t.execute(
            &CallContext::new(),
            &call(json!({"name": "a", "args": ["b", "c d"]})),
        )
        .await
        .unwrap();
        assert_eq!(exec.last().args, vec!["a", "b", "c d"]);

        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(def.clone(), spec("echo", &["{{name}}"]), exec.clone());
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a", "args": [1]})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::invalid_input("non-string value in 'args' array"));

        // echo never re-parses its argv, so shell syntax is plain data.
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(def.clone(), spec("echo", &["{{name}}"]), exec.clone());
        t.execute(&CallContext::new(), &call(json!({"name": "a", "args": ["$(id)"]})))
            .await
            .unwrap();
        assert_eq!(exec.last().args, vec!["a", "$(id)"]);

        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(def, spec("echo", &["{{name}}"]), exec.clone());
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a", "args": ["-rf"]})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_REJECTED");
        assert!(err.to_string().contains("argument injection detected"));
        assert_eq!(exec.calls(), 0);
    }

    #[tokio::test]
    async fn test_args_refused_when_not_allowed() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), spec("echo", &["{{name}}"]), exec.clone());
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a", "args": ["x"]})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    fn secret_definition() -> ToolDefinition {
        definition().with_parameter(ToolParameter::new("API_TOKEN", "Token", true).as_secret())
    }

    fn secret_spec(command: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            secrets: vec![SecretBinding::new(
                "API_TOKEN",
                SecretSource::Value("tok-123456".to_string()),
            )],
            ..spec(command, args)
        }
    }

    #[tokio::test]
    async fn test_secret_goes_to_env_and_is_redacted() {
        let exec = FakeExecutor::replying(0, "using tok-123456\n", "");
        let t = tool(secret_definition(), secret_spec("client", &["{{name}}"]), exec.clone());
        let out = t
            .execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap();

        let seen = exec.last();
        assert!(seen.env.contains(&("API_TOKEN".to_string(), "tok-123456".to_string())));
        assert!(!seen.args.iter().any(|a| a.contains("tok-123456")));
        let text = out.value.to_string();
        assert!(!text.contains("tok-123456"));
        assert!(text.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_secret_redacted_from_error() {
        let exec = FakeExecutor::replying(3, "", "auth tok-123456 rejected");
        let t = tool(secret_definition(), secret_spec("client", &["{{name}}"]), exec);
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UpstreamError { exit_code: Some(3), .. }));
        let text = err.to_string();
        assert!(!text.contains("tok-123456"));
        assert!(text.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_caller_cannot_supply_secret() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(secret_definition(), secret_spec("client", &["{{name}}"]), exec);
        let err = t
            .execute(
                &CallContext::new(),
                &call(json!({"name": "a", "API_TOKEN": "mine"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_config_errors() {
        let exec = FakeExecutor::replying(0, "", "");
        let build = |def: ToolDefinition, spec: CommandSpec| {
            CommandTool::new(def, spec, InjectionValidator::default(), exec.clone()).unwrap_err()
        };

        assert!(matches!(
            build(definition(), spec("echo", &["{{nope}}"])),
            ConfigError::UnknownParameter { .. }
        ));
        assert!(matches!(
            build(secret_definition(), secret_spec("echo", &["--token={{API_TOKEN}}"])),
            ConfigError::Invalid(_)
        ));
        assert!(matches!(
            build(secret_definition(), spec("echo", &["{{name}}"])),
            ConfigError::Secret { .. }
        ));
        let mut dangerous = spec("echo", &["{{name}}"]);
        dangerous.env.insert("LD_PRELOAD".to_string(), "{{name}}".to_string());
        assert_eq!(
            build(definition(), dangerous),
            ConfigError::DangerousEnvName("LD_PRELOAD".to_string())
        );
        assert!(matches!(build(definition(), spec("  ", &[])), ConfigError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_env_template_forwarded_to_args_refuses_flags() {
        let mut s = spec("sh", &["-c", "grep -- \"$PATTERN\" notes.txt"]);
        s.env.insert("PATTERN".to_string(), "{{name}}".to_string());

        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), s.clone(), exec.clone());
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "--exec=x"})))
            .await
            .unwrap_err();
        assert_eq!(err.rejection().map(|r| r.kind), Some(RejectKind::ArgumentInjection));

        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), s, exec.clone());
        t.execute(&CallContext::new(), &call(json!({"name": "needle"})))
            .await
            .unwrap();
        assert!(exec.last().env.contains(&("PATTERN".to_string(), "needle".to_string())));
    }

    #[tokio::test]
    async fn test_only_allowlisted_host_env_is_forwarded() {
        let exec = FakeExecutor::replying(0, "", "");
        let mut s = spec("echo", &["{{name}}"]);
        s.service_env.insert("MODE".to_string(), "fast".to_string());
        let t = tool(definition(), s, exec.clone());
        t.execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap();
        let seen = exec.last();
        assert!(
            seen.env
                .iter()
                .all(|(k, _)| k == "MODE" || FORWARDED_HOST_ENV.contains(&k.as_str()))
        );
        assert!(seen.env.contains(&("MODE".to_string(), "fast".to_string())));
    }

    #[tokio::test]
    async fn test_sed_runs_sandboxed() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(definition(), spec("sed", &["-e", "s/a/b/", "{{name}}"]), exec.clone());
        t.execute(&CallContext::new(), &call(json!({"name": "notes.txt"})))
            .await
            .unwrap();
        assert_eq!(exec.last().args, vec!["--sandbox", "-e", "s/a/b/", "notes.txt"]);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_spawn() {
        let exec = FakeExecutor::replying(0, "", "");
        let t = tool(secret_definition(), secret_spec("client", &["{{name}}"]), exec.clone());
        let out = t
            .execute(
                &CallContext::new(),
                &call(json!({"name": "a"})).with_dry_run(true),
            )
            .await
            .unwrap();
        assert_eq!(exec.calls(), 0);
        assert!(out.is_dry_run());
        assert_eq!(out.value["dry_run"], true);
        assert_eq!(out.value["args"], json!(["a"]));
        let env = out.value["env"].as_array().unwrap();
        assert!(env.contains(&json!("API_TOKEN")));
        assert!(!out.value.to_string().contains("tok-123456"));
    }

    #[tokio::test]
    async fn test_container_launch_line() {
        let exec = FakeExecutor::replying(0, "", "");
        let mut s = secret_spec("cat", &["{{name}}"]);
        s.working_dir = Some(PathBuf::from("/work"));
        s.container = Some(ContainerSpec {
            runtime: "docker".to_string(),
            image: "alpine:3".to_string(),
            use_sudo: false,
        });
        let def = ToolDefinition::new("greet", "Read a file")
            .with_service("demo")
            .with_parameter(ToolParameter::new("name", "File", true).as_path())
            .with_parameter(ToolParameter::new("API_TOKEN", "Token", true).as_secret());
        let t = tool(def, s, exec.clone());
        t.execute(&CallContext::new(), &call(json!({"name": "/data/in.txt"})))
            .await
            .unwrap();

        let seen = exec.last();
        assert_eq!(seen.program, "docker");
        assert_eq!(
            seen.args,
            vec![
                "run", "--rm", "-i", "-w", "/work", "-e", "API_TOKEN", "alpine:3", "cat",
                "/data/in.txt"
            ]
        );
        assert!(seen.working_dir.is_none());
        assert!(seen.env.contains(&("API_TOKEN".to_string(), "tok-123456".to_string())));
    }

    #[tokio::test]
    async fn test_container_with_sudo_preserves_env() {
        let exec = FakeExecutor::replying(0, "", "");
        let mut s = secret_spec("env", &[]);
        s.container = Some(ContainerSpec {
            runtime: "podman".to_string(),
            image: "busybox".to_string(),
            use_sudo: true,
        });
        let t = tool(secret_definition(), s, exec.clone());
        t.execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap();
        let seen = exec.last();
        assert_eq!(seen.program, "sudo");
        assert_eq!(seen.args[..2], ["--preserve-env=API_TOKEN", "podman"]);
    }

    #[tokio::test]
    async fn test_json_communication() {
        let exec = FakeExecutor::replying(0, "{\"count\": 2}", "");
        let mut s = spec("counter", &[]);
        s.communication = Communication::Json;
        let t = tool(definition(), s, exec.clone());
        let out = t
            .execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap();
        assert_eq!(out.value, json!({"count": 2}));
        let stdin: Value = serde_json::from_slice(&exec.last().stdin.unwrap()).unwrap();
        assert_eq!(stdin, json!({"name": "a"}));

        let exec = FakeExecutor::replying(0, "not json", "");
        let mut s = spec("counter", &[]);
        s.communication = Communication::Json;
        let t = tool(definition(), s, exec);
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn test_process_errors_map_to_taxonomy() {
        let t = tool(
            definition(),
            spec("echo", &[]),
            FakeExecutor::failing(ProcessError::TimedOut(Duration::from_secs(2))),
        );
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::timeout("demo.greet", Duration::from_secs(2)));

        let t = tool(
            definition(),
            spec("echo", &[]),
            FakeExecutor::failing(ProcessError::NotFound("echo".to_string())),
        );
        let err = t
            .execute(&CallContext::new(), &call(json!({"name": "a"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EXECUTOR_FAILURE");
        assert!(err.to_string().contains("command not found: echo"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_real_process() {
        let t = CommandTool::new(
            definition(),
            spec("echo", &["hello {{name}}"]),
            InjectionValidator::default(),
            Arc::new(crate::process::TokioProcessExecutor::new()),
        )
        .unwrap();
        let out = t
            .execute(&CallContext::new(), &call(json!({"name": "world"})))
            .await
            .unwrap();
        assert_eq!(out.value["stdout"], "hello world\n");
        assert_eq!(out.value["combined_output"], "hello world\n");
    }
}
