//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use toolgate_application::{CallContext, CheckInvocationInput, CheckInvocationUseCase};
use toolgate_domain::{ExecutionRequest, ExecutionTarget, OutputFormat};
use toolgate_infrastructure::{
    ConfigLoader, FileConfig, TokioProcessExecutor, build_manager, build_validator,
};
use toolgate_presentation::{
    CallArgs, CheckArgs, Cli, Command, ConfigArgs, OutputFormatter, formatter_for,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting toolgate");

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")?
    };

    colored::control::set_override(config.output.color);
    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(config.output.format)
        .unwrap_or_default();
    let formatter = formatter_for(format);
    let explicit_config = cli.config.clone();

    match cli.command {
        Command::Check(args) => run_check(args, &config, formatter.as_ref()),
        Command::List => run_list(&config, formatter.as_ref()),
        Command::Call(args) => run_call(args, &config, formatter.as_ref()).await,
        Command::Config(args) => {
            run_config(args, explicit_config.as_ref(), &config, formatter.as_ref())
        }
    }
}

/// Initialize logging based on verbosity level.
///
/// Without `-v`, `RUST_LOG` is honoured and the default is `warn`. Logs go
/// to stderr so stdout carries only results.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let stderr_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("invalid log file path: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

fn run_check(
    args: CheckArgs,
    config: &FileConfig,
    formatter: &dyn OutputFormatter,
) -> Result<ExitCode> {
    let mut input = CheckInvocationInput::new(args.command).with_target(if args.container {
        ExecutionTarget::Container
    } else {
        ExecutionTarget::Local
    });
    for arg in args.args {
        input = input.with_arg(arg);
    }
    for (name, template) in args.env {
        input = input.with_env(name, template);
    }
    for (name, value) in args.params {
        input = input.with_param(name, value);
    }
    for name in args.path_params {
        input = input.with_path_param(name);
    }

    let use_case = CheckInvocationUseCase::new(build_validator(&config.ssrf));
    let report = use_case.execute(input)?;
    print!("{}", with_newline(formatter.format_check(&report)));

    Ok(if report.is_allowed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn executor(config: &FileConfig) -> Arc<TokioProcessExecutor> {
    Arc::new(TokioProcessExecutor::new().with_default_timeout(config.execution.default_timeout()))
}

fn run_list(config: &FileConfig, formatter: &dyn OutputFormatter) -> Result<ExitCode> {
    let manager = build_manager(config, executor(config)).context("invalid tool configuration")?;
    let tools = manager.list_mcp_tools();
    print!("{}", with_newline(formatter.format_tools(&tools)));
    Ok(ExitCode::SUCCESS)
}

async fn run_call(
    args: CallArgs,
    config: &FileConfig,
    formatter: &dyn OutputFormatter,
) -> Result<ExitCode> {
    let inputs: serde_json::Value =
        serde_json::from_str(&args.input).context("--input is not valid JSON")?;
    if !inputs.is_object() {
        bail!("--input must be a JSON object");
    }

    let manager = build_manager(config, executor(config)).context("invalid tool configuration")?;

    let mut ctx = CallContext::new();
    if let Some(secs) = args.timeout {
        ctx = ctx.with_deadline(tokio::time::Instant::now() + Duration::from_secs(secs));
    }

    let cancel = ctx.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling tool call");
            cancel.cancel();
        }
    });

    let request = ExecutionRequest::new(args.tool.clone(), inputs).with_dry_run(args.dry_run);
    match manager.execute_tool(&ctx, request).await {
        Ok(output) => {
            print!("{}", with_newline(formatter.format_output(&args.tool, &output)));
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            print!("{}", with_newline(formatter.format_error(&args.tool, &error)));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_config(
    args: ConfigArgs,
    explicit_config: Option<&PathBuf>,
    config: &FileConfig,
    formatter: &dyn OutputFormatter,
) -> Result<ExitCode> {
    if args.sources {
        ConfigLoader::print_config_sources(explicit_config);
        return Ok(ExitCode::SUCCESS);
    }

    if args.validate {
        let issues = config.validate();
        print!("{}", with_newline(formatter.format_issues(&issues)));
        return Ok(if issues.iter().any(|i| i.is_error()) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let merged = toml::to_string_pretty(&config.redacted())
        .context("failed to render configuration")?;
    print!("{}", with_newline(merged));
    Ok(ExitCode::SUCCESS)
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
