//! Execution configuration from TOML (`[execution]` section)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::process::DEFAULT_MAX_OUTPUT_BYTES;

/// Overrides `max_output_bytes` when set to a positive integer.
pub const MAX_OUTPUT_ENV: &str = "TOOLGATE_MAX_COMMAND_OUTPUT_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutionConfig {
    /// Per-call deadline when the service sets none
    pub default_timeout_secs: u64,
    /// Capture limit per output stream
    pub max_output_bytes: usize,
    /// Container runtime binary (`docker`, `podman`)
    pub container_runtime: String,
    /// Prefix container runs with `sudo`
    pub use_sudo_for_container: bool,
}

impl Default for FileExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 60,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            container_runtime: "docker".to_string(),
            use_sudo_for_container: false,
        }
    }
}

impl FileExecutionConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs.max(1))
    }

    /// The capture limit, honoring the environment override.
    pub fn effective_max_output_bytes(&self) -> usize {
        Self::parse_override(std::env::var(MAX_OUTPUT_ENV).ok().as_deref())
            .unwrap_or(self.max_output_bytes)
    }

    fn parse_override(raw: Option<&str>) -> Option<usize> {
        let raw = raw?.trim();
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                warn!(value = raw, "Ignoring invalid {}", MAX_OUTPUT_ENV);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileExecutionConfig::default();
        assert_eq!(config.default_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_output_bytes, 1024 * 1024);
        assert_eq!(config.container_runtime, "docker");
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(FileExecutionConfig::parse_override(Some("4096")), Some(4096));
        assert_eq!(FileExecutionConfig::parse_override(Some("0")), None);
        assert_eq!(FileExecutionConfig::parse_override(Some("lots")), None);
        assert_eq!(FileExecutionConfig::parse_override(None), None);
    }
}
