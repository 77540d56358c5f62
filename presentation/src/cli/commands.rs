//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolgate_domain::OutputFormat as DomainOutputFormat;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON document
    Json,
}

impl From<OutputFormat> for DomainOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => DomainOutputFormat::Text,
            OutputFormat::Json => DomainOutputFormat::Json,
        }
    }
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Validated dispatch of configured command-line tools")]
#[command(long_about = r#"
toolgate exposes configured command-line programs as namespaced tools and
refuses caller values that could inject shell syntax, extra options,
traversing paths, internal URLs or interpreter code.

Configuration files are loaded from (in priority order):
1. TOOLGATE_* environment variables (use __ for nesting)
2. --config <path>     Explicit config file
3. ./toolgate.toml     Project-level config
4. ~/.config/toolgate/config.toml   Global config

Example:
  toolgate check --command sh --arg -c --arg 'echo {{msg}}' --param 'msg=hi; id'
  toolgate list
  toolgate call git.log --input '{"count": "5"}'
  toolgate config --validate
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format (overrides `[output] format` from the config)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check caller values against a command line without running it
    Check(CheckArgs),

    /// List the tools the current configuration exposes
    List,

    /// Call a configured tool
    Call(CallArgs),

    /// Inspect the configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Program to run
    #[arg(long, value_name = "PROGRAM")]
    pub command: String,

    /// Argument template, one per argv slot (repeatable)
    #[arg(long = "arg", value_name = "TEMPLATE", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Environment template as NAME=TEMPLATE (repeatable)
    #[arg(long = "env", value_name = "NAME=TEMPLATE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Caller value as NAME=VALUE (repeatable)
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_value, allow_hyphen_values = true)]
    pub params: Vec<(String, String)>,

    /// Treat this parameter as a filesystem path (repeatable)
    #[arg(long = "path-param", value_name = "NAME")]
    pub path_params: Vec<String>,

    /// Validate as if the command ran inside a container
    #[arg(long)]
    pub container: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Exposed tool name, `<service>.<tool>`
    pub tool: String,

    /// Call inputs as a JSON object
    #[arg(short, long, value_name = "JSON", default_value = "{}")]
    pub input: String,

    /// Validate and render without spawning anything
    #[arg(long)]
    pub dry_run: bool,

    /// Overall deadline for the call in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show configuration file locations
    #[arg(long)]
    pub sources: bool,

    /// Report every problem in the configuration
    #[arg(long)]
    pub validate: bool,
}

/// Parse `NAME=VALUE`; the value may itself contain `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}
