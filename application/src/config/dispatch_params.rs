//! Dispatch parameters — per-call deadline control.
//!
//! [`DispatchParams`] groups the static parameters the
//! [`ToolManager`](crate::registry::ToolManager) applies to every call.
//! A service may override the default timeout for its own tools.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchParams {
    /// Deadline for one call when the owning service sets none.
    pub default_timeout: Duration,
    /// Outer deadline for calls arriving through the MCP bridge.
    pub mcp_call_timeout: Duration,
}

impl Default for DispatchParams {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            mcp_call_timeout: Duration::from_secs(60),
        }
    }
}

impl DispatchParams {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_mcp_call_timeout(mut self, timeout: Duration) -> Self {
        self.mcp_call_timeout = timeout;
        self
    }

    /// The deadline for a call, given the service's own setting.
    pub fn timeout_for(&self, service_timeout: Option<Duration>) -> Duration {
        service_timeout.unwrap_or(self.default_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = DispatchParams::default();
        assert_eq!(params.default_timeout, Duration::from_secs(60));
        assert_eq!(params.mcp_call_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_service_override() {
        let params = DispatchParams::default().with_default_timeout(Duration::from_secs(5));
        assert_eq!(params.timeout_for(None), Duration::from_secs(5));
        assert_eq!(
            params.timeout_for(Some(Duration::from_millis(250))),
            Duration::from_millis(250)
        );
    }
}
