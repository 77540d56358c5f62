//! Secret resolution.
//!
//! Secrets are resolved at call time, so rotating an environment variable
//! or a mounted file takes effect without a reload. Errors name the secret
//! and its source, never the value.

use std::path::PathBuf;

use toolgate_domain::ConfigError;

#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Literal value from the configuration file.
    Value(String),
    /// Host environment variable.
    Env(String),
    /// File contents with the trailing newline stripped.
    File(PathBuf),
}

impl std::fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::Value(_) => f.write_str("Value([REDACTED])"),
            SecretSource::Env(name) => f.debug_tuple("Env").field(name).finish(),
            SecretSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// A named secret and where to read it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBinding {
    pub name: String,
    pub source: SecretSource,
}

impl SecretBinding {
    pub fn new(name: impl Into<String>, source: SecretSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Secret {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    pub async fn resolve(&self) -> Result<String, ConfigError> {
        let value = match &self.source {
            SecretSource::Value(v) => v.clone(),
            SecretSource::Env(var) => std::env::var(var)
                .map_err(|_| self.error(format!("environment variable {} is not set", var)))?,
            SecretSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| self.error(format!("cannot read {}: {}", path.display(), e)))?
                .trim_end_matches(['\n', '\r'])
                .to_string(),
        };
        if value.is_empty() {
            return Err(self.error("resolved to an empty value"));
        }
        Ok(value)
    }
}

/// Resolve every binding, failing on the first that cannot be read.
pub async fn resolve_all(bindings: &[SecretBinding]) -> Result<Vec<(String, String)>, ConfigError> {
    let mut resolved = Vec::with_capacity(bindings.len());
    for binding in bindings {
        resolved.push((binding.name.clone(), binding.resolve().await?));
    }
    Ok(resolved)
}
