//! Environment and secret guard.
//!
//! Values bound for environment variables get a narrower rule set than
//! arguments: no quoting context applies, but control characters and
//! `NAME=value` smuggling are refused. Secret values are scrubbed from every
//! string that leaves a tool call.

use serde_json::Value;

use super::verdict::{RejectKind, Rejection, Verdict};
use crate::core::error::ConfigError;

/// Replacement for every occurrence of a secret value.
pub const REDACTED: &str = "[REDACTED]";

/// Variables that change how a program or its loader behaves. A tool may
/// never set these from a template.
const DANGEROUS_ENV_NAMES: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "LD_AUDIT",
    "BASH_ENV",
    "ENV",
    "IFS",
    "PS4",
    "PROMPT_COMMAND",
    "SHELLOPTS",
    "BASHOPTS",
    "PYTHONSTARTUP",
    "PYTHONPATH",
    "PYTHONHOME",
    "PYTHONINSPECT",
    "NODE_OPTIONS",
    "NODE_PATH",
    "PERL5OPT",
    "PERL5LIB",
    "PERLLIB",
    "RUBYOPT",
    "RUBYLIB",
    "GIT_SSH_COMMAND",
    "GIT_EXEC_PATH",
    "GIT_CONFIG_GLOBAL",
    "JAVA_TOOL_OPTIONS",
    "_JAVA_OPTIONS",
    "GCONV_PATH",
    "EDITOR",
    "VISUAL",
    "PAGER",
];

const DANGEROUS_ENV_PREFIXES: &[&str] = &["LD_", "DYLD_", "BASH_FUNC_"];

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_env_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// True for loader and interpreter hook variables.
pub fn is_dangerous_env_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    DANGEROUS_ENV_NAMES.contains(&upper.as_str())
        || DANGEROUS_ENV_PREFIXES.iter().any(|p| upper.starts_with(p))
}

/// Reject names that are malformed or reserved for loaders and interpreters.
pub fn check_env_name(name: &str) -> Result<(), ConfigError> {
    if !is_valid_env_name(name) {
        return Err(ConfigError::InvalidEnvName(name.to_string()));
    }
    if is_dangerous_env_name(name) {
        return Err(ConfigError::DangerousEnvName(name.to_string()));
    }
    Ok(())
}

/// Validate a value destined for an environment variable.
pub fn validate_env_value(value: &str) -> Verdict {
    check_env_value(value).into()
}

/// Validate an environment value that the argument templates also expand
/// (`$NAME` on the command line), so it must not read as a flag either.
pub fn validate_forwarded_env_value(value: &str) -> Verdict {
    check_env_value(value)
        .and_then(|()| check_leading_flag(value))
        .into()
}

pub(crate) fn check_env_value(value: &str) -> Result<(), Rejection> {
    if let Some(c) = value
        .chars()
        .find(|c| (c.is_control() && *c != '\t') || *c == '\u{7f}')
    {
        return Err(Rejection::new(
            RejectKind::ControlCharacter,
            format!("environment value contains {:?}", c),
        ));
    }
    if value.starts_with('=') {
        return Err(Rejection::new(
            RejectKind::EnvironmentInjection,
            "value starts with '='",
        ));
    }
    if let Some((name, _)) = value.split_once('=')
        && is_valid_env_name(name)
    {
        return Err(Rejection::new(
            RejectKind::EnvironmentInjection,
            format!("value looks like an assignment to '{}'", name),
        ));
    }
    Ok(())
}

pub(crate) fn check_leading_flag(value: &str) -> Result<(), Rejection> {
    if value.starts_with('-') || value.starts_with('+') {
        return Err(Rejection::new(
            RejectKind::ArgumentInjection,
            "environment value is expanded into the arguments and starts with a flag character",
        ));
    }
    Ok(())
}

/// Replaces known secret values in captured output and error text.
///
/// Longer secrets are matched first so a secret that contains another is
/// replaced whole.
#[derive(Debug, Clone, Default)]
pub struct SecretRedactor {
    secrets: Vec<Vec<u8>>,
}

impl SecretRedactor {
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut secrets: Vec<Vec<u8>> = secrets
            .into_iter()
            .map(|s| s.as_ref().to_vec())
            .filter(|s| !s.is_empty())
            .collect();
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();
        Self { secrets }
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn redact_bytes(&self, input: &[u8]) -> Vec<u8> {
        if self.secrets.is_empty() {
            return input.to_vec();
        }
        let mut out = Vec::with_capacity(input.len());
        let mut i = 0;
        'outer: while i < input.len() {
            for secret in &self.secrets {
                if input[i..].starts_with(secret) {
                    out.extend_from_slice(REDACTED.as_bytes());
                    i += secret.len();
                    continue 'outer;
                }
            }
            out.push(input[i]);
            i += 1;
        }
        out
    }

    pub fn redact_str(&self, input: &str) -> String {
        if self.secrets.is_empty() {
            return input.to_string();
        }
        match String::from_utf8(self.redact_bytes(input.as_bytes())) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Redact every string inside a JSON value, keys included.
    pub fn redact_json(&self, value: Value) -> Value {
        if self.secrets.is_empty() {
            return value;
        }
        match value {
            Value::String(s) => Value::String(self.redact_str(&s)),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.redact_json(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (self.redact_str(&k), self.redact_json(v)))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Replace every byte-exact occurrence of each secret in `output`.
pub fn redact<S: AsRef<[u8]>>(output: &[u8], secrets: &[S]) -> Vec<u8> {
    SecretRedactor::new(secrets.iter().map(AsRef::as_ref)).redact_bytes(output)
}
