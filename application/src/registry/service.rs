//! Per-service registry metadata.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use toolgate_domain::ConfigError;

use super::policy::{CallPolicy, PolicyHook};
use crate::ports::hooks::{PostCallHook, PreCallHook};

/// Health, deadline and hook lists for one upstream service.
///
/// Read on every call; replaced wholesale on reconfiguration. Health is the
/// only field that changes in place.
pub struct ServiceInfo {
    id: String,
    healthy: AtomicBool,
    timeout: Option<Duration>,
    pre_hooks: Vec<Arc<dyn PreCallHook>>,
    post_hooks: Vec<Arc<dyn PostCallHook>>,
}

impl std::fmt::Debug for ServiceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInfo")
            .field("id", &self.id)
            .field("healthy", &self.is_healthy())
            .field("timeout", &self.timeout)
            .field(
                "pre_hooks",
                &self.pre_hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field(
                "post_hooks",
                &self.post_hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ServiceInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            healthy: AtomicBool::new(true),
            timeout: None,
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
        }
    }

    pub fn with_healthy(self, healthy: bool) -> Self {
        self.set_healthy(healthy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Compile call policies into pre-call hooks, ahead of any other hooks.
    pub fn with_policies(mut self, policies: &[CallPolicy]) -> Result<Self, ConfigError> {
        let compiled = policies
            .iter()
            .map(|p| PolicyHook::compile(p).map(|h| Arc::new(h) as Arc<dyn PreCallHook>))
            .collect::<Result<Vec<_>, _>>()?;
        self.pre_hooks.splice(0..0, compiled);
        Ok(self)
    }

    pub fn with_pre_hook(mut self, hook: Arc<dyn PreCallHook>) -> Self {
        self.pre_hooks.push(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: Arc<dyn PostCallHook>) -> Self {
        self.post_hooks.push(hook);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn pre_hooks(&self) -> &[Arc<dyn PreCallHook>] {
        &self.pre_hooks
    }

    pub fn post_hooks(&self) -> &[Arc<dyn PostCallHook>] {
        &self.post_hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::policy::PolicyRule;

    #[test]
    fn test_policies_compile_ahead_of_hooks() {
        let info = ServiceInfo::new("git")
            .with_policies(&[CallPolicy::default()])
            .unwrap();
        assert_eq!(info.pre_hooks().len(), 1);
        assert_eq!(info.pre_hooks()[0].name(), "policy");
        assert!(info.is_healthy());
    }

    #[test]
    fn test_bad_policy_fails_configuration() {
        let policy = CallPolicy {
            rules: vec![PolicyRule {
                argument_regex: "[".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = ServiceInfo::new("git").with_policies(&[policy]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgumentRegex { .. }));
    }

    #[test]
    fn test_health_toggle() {
        let info = ServiceInfo::new("svc").with_healthy(false);
        assert!(!info.is_healthy());
        info.set_healthy(true);
        assert!(info.is_healthy());
    }
}
