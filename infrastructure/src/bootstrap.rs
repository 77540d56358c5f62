//! Builds a ready-to-dispatch [`ToolManager`] from a [`FileConfig`].

use std::sync::Arc;

use toolgate_application::ports::process_executor::ProcessExecutor;
use toolgate_application::{
    AuditMiddleware, DispatchParams, ServiceInfo, ToolManager, TracingMiddleware,
};
use toolgate_domain::{ConfigError, InjectionValidator, SecretRedactor, SsrfPolicy, StaticUrlOracle};
use tracing::{info, warn};

use crate::config::{FileConfig, FileServiceConfig};
use crate::logging::JsonlAuditLog;
use crate::secrets::SecretSource;
use crate::tools::CommandTool;

/// Validator wired to the configured URL policy.
pub fn build_validator(policy: &SsrfPolicy) -> InjectionValidator {
    InjectionValidator::new(Arc::new(StaticUrlOracle::new(policy.clone())))
}

/// Secret values known without running anything, for scrubbing audit records.
fn static_secret_values(config: &FileConfig) -> SecretRedactor {
    let values = config
        .services
        .iter()
        .flat_map(|s| s.secrets.iter())
        .filter_map(|s| s.to_binding().ok())
        .filter_map(|b| match b.source {
            SecretSource::Value(v) => Some(v),
            SecretSource::Env(var) => std::env::var(var).ok(),
            SecretSource::File(_) => None,
        });
    SecretRedactor::new(values)
}

fn service_info(service: &FileServiceConfig) -> Result<ServiceInfo, ConfigError> {
    let mut info = ServiceInfo::new(service.id.clone())
        .with_healthy(service.healthy)
        .with_policies(&service.policies)?;
    if let Some(timeout) = service.timeout() {
        info = info.with_timeout(timeout);
    }

    for webhook in service.webhooks.iter().filter(|w| !w.url.is_empty()) {
        #[cfg(feature = "webhooks")]
        {
            let hook = Arc::new(
                crate::hooks::WebhookHook::new(webhook)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            );
            if webhook.pre_call {
                info = info.with_pre_hook(hook.clone());
            }
            if webhook.post_call {
                info = info.with_post_hook(hook);
            }
        }
        #[cfg(not(feature = "webhooks"))]
        warn!(
            service = %service.id,
            url = %webhook.url,
            "Webhook configured but this build has no `webhooks` feature; ignoring"
        );
    }
    Ok(info)
}

/// Register every configured service and tool.
pub fn build_manager(
    config: &FileConfig,
    executor: Arc<dyn ProcessExecutor>,
) -> Result<Arc<ToolManager>, ConfigError> {
    let params = DispatchParams::default().with_default_timeout(config.execution.default_timeout());
    let manager = ToolManager::new(params);
    manager.set_profiles(config.profiles.to_filter());
    manager.add_middleware(Arc::new(TracingMiddleware));

    if config.audit.enabled {
        let path = config.audit.resolved_path();
        match JsonlAuditLog::open(&path) {
            Some(log) => {
                info!(path = %path.display(), "Audit log enabled");
                manager.add_middleware(Arc::new(
                    AuditMiddleware::new(Arc::new(log)).with_redactor(static_secret_values(config)),
                ));
            }
            None => warn!(path = %path.display(), "Audit log unavailable; continuing without it"),
        }
    }

    let validator = build_validator(&config.ssrf);
    let mut registered = 0usize;
    let mut skipped = 0usize;

    for service in &config.services {
        manager.add_service_info(service_info(service)?);
        for (name, tool_config) in &service.tools {
            let definition = service.tool_definition(name, tool_config);
            let spec = service.command_spec(tool_config, &config.execution)?;
            let tool = CommandTool::new(definition, spec, validator.clone(), executor.clone())?;
            match manager.add_tool(Arc::new(tool))? {
                Some(_) => registered += 1,
                None => skipped += 1,
            }
        }
    }

    info!(
        services = config.services.len(),
        tools = registered,
        skipped,
        "Tool manager ready"
    );
    Ok(manager)
}
