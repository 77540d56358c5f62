//! Tool Registry / Dispatch Manager
//!
//! Thread-safe name → tool map plus the per-call pipeline:
//!
//! ```text
//! Resolve ─▶ health gate ─▶ [middleware ─▶ pre-hooks ─▶ execute ─▶ post-hooks]
//!    │                       └──────────── deadline + cancellation ───────────┘
//!    └─ unknown name: suffix / edit-distance suggestion
//! ```
//!
//! A tool carrying a service id is reachable only by its namespaced
//! `<service>.<tool>` name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use toolgate_domain::ConfigError;
use toolgate_domain::tool::{ExecutionRequest, ProfileFilter, ToolError, ToolOutput};
use tracing::{debug, info, warn};

use super::service::ServiceInfo;
use super::suggest::suggest;
use crate::config::DispatchParams;
use crate::ports::hooks::HookAction;
use crate::ports::mcp_server::{McpCallHandler, McpServerPort, McpToolDescriptor};
use crate::ports::middleware::{Endpoint, Middleware, Next};
use crate::ports::tool::{CallContext, Tool};

const HOOK_DENIED: &str = "tool execution denied by hook";

#[derive(Default)]
struct Entries {
    /// Exposed name → tool.
    by_name: BTreeMap<String, Arc<dyn Tool>>,
    /// Service id → exposed names.
    by_service: HashMap<String, BTreeSet<String>>,
}

/// Central tool registry and dispatcher.
///
/// Construct with [`ToolManager::new`]; the manager is always shared behind
/// an `Arc` so the MCP bridge can call back into it.
pub struct ToolManager {
    weak_self: Weak<ToolManager>,
    params: DispatchParams,
    entries: RwLock<Entries>,
    services: RwLock<HashMap<String, Arc<ServiceInfo>>>,
    profiles: RwLock<ProfileFilter>,
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
    mcp_server: RwLock<Option<Arc<dyn McpServerPort>>>,
    tool_cache: RwLock<Option<Arc<Vec<Arc<dyn Tool>>>>>,
    mcp_cache: RwLock<Option<Arc<Vec<McpToolDescriptor>>>>,
}

impl std::fmt::Debug for ToolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolManager")
            .field("params", &self.params)
            .field("tools", &self.tool_names())
            .field("services", &self.services.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn descriptor(exposed: &str, tool: &dyn Tool) -> McpToolDescriptor {
    let definition = tool.definition();
    McpToolDescriptor {
        name: exposed.to_string(),
        description: definition.description.clone(),
        input_schema: definition.input_schema(),
        annotations: definition.annotations,
    }
}

impl ToolManager {
    pub fn new(params: DispatchParams) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            params,
            entries: RwLock::new(Entries::default()),
            services: RwLock::new(HashMap::new()),
            profiles: RwLock::new(ProfileFilter::default()),
            middlewares: RwLock::new(Vec::new()),
            mcp_server: RwLock::new(None),
            tool_cache: RwLock::new(None),
            mcp_cache: RwLock::new(None),
        })
    }

    pub fn params(&self) -> &DispatchParams {
        &self.params
    }

    // ==================== Configuration ====================

    /// Applies to tools added afterwards.
    pub fn set_profiles(&self, filter: ProfileFilter) {
        *self.profiles.write() = filter;
    }

    /// Append a middleware. Earlier registrations wrap later ones.
    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) {
        debug!(middleware = middleware.name(), "Registered middleware");
        self.middlewares.write().push(middleware);
    }

    /// Attach an MCP server and advertise every tool already registered.
    pub fn set_mcp_server(&self, server: Arc<dyn McpServerPort>) {
        *self.mcp_server.write() = Some(Arc::clone(&server));
        let tools: Vec<(String, Arc<dyn Tool>)> = self
            .entries
            .read()
            .by_name
            .iter()
            .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
            .collect();
        for (name, tool) in tools {
            server.register_tool(descriptor(&name, tool.as_ref()), self.mcp_handler(&name));
        }
    }

    pub fn add_service_info(&self, info: ServiceInfo) {
        debug!(service = info.id(), "Registered service");
        self.services
            .write()
            .insert(info.id().to_string(), Arc::new(info));
    }

    pub fn service_info(&self, service_id: &str) -> Option<Arc<ServiceInfo>> {
        self.services.read().get(service_id).cloned()
    }

    /// Returns false when the service is unknown.
    pub fn set_service_health(&self, service_id: &str, healthy: bool) -> bool {
        match self.service_info(service_id) {
            Some(info) => {
                info.set_healthy(healthy);
                info!(service = service_id, healthy, "Service health changed");
                true
            }
            None => false,
        }
    }

    fn mcp_handler(&self, exposed: &str) -> McpCallHandler {
        McpCallHandler::new(
            self.weak_self.clone(),
            exposed.to_string(),
            self.params.mcp_call_timeout,
        )
    }

    fn invalidate_caches(&self) {
        *self.tool_cache.write() = None;
        *self.mcp_cache.write() = None;
    }

    // ==================== Registry ====================

    /// Register a tool under its exposed name.
    ///
    /// Returns `Ok(None)` when the enabled profiles filter the tool out.
    pub fn add_tool(&self, tool: Arc<dyn Tool>) -> Result<Option<String>, ConfigError> {
        let definition = tool.definition();
        if !self.profiles.read().allows(definition) {
            info!(
                tool = %definition.name,
                service = definition.service_id.as_deref().unwrap_or(""),
                "Skipping tool not in any enabled profile"
            );
            return Ok(None);
        }

        let exposed = definition.exposed_name()?;
        {
            let mut entries = self.entries.write();
            if entries
                .by_name
                .insert(exposed.clone(), Arc::clone(&tool))
                .is_some()
            {
                warn!(tool = %exposed, "Replacing previously registered tool");
            }
            if let Some(service) = &definition.service_id {
                entries
                    .by_service
                    .entry(service.clone())
                    .or_default()
                    .insert(exposed.clone());
            }
        }
        self.invalidate_caches();

        let server = self.mcp_server.read().clone();
        if let Some(server) = server {
            server.register_tool(descriptor(&exposed, tool.as_ref()), self.mcp_handler(&exposed));
        }

        debug!(tool = %exposed, "Registered tool");
        Ok(Some(exposed))
    }

    pub fn get_tool(&self, exposed_name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.read().by_name.get(exposed_name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.entries.read().by_name.keys().cloned().collect()
    }

    /// All registered tools, ordered by exposed name.
    pub fn list_tools(&self) -> Arc<Vec<Arc<dyn Tool>>> {
        if let Some(cached) = self.tool_cache.read().as_ref() {
            return Arc::clone(cached);
        }
        let mut cache = self.tool_cache.write();
        if let Some(cached) = cache.as_ref() {
            return Arc::clone(cached);
        }
        let tools = Arc::new(self.entries.read().by_name.values().cloned().collect::<Vec<_>>());
        *cache = Some(Arc::clone(&tools));
        tools
    }

    /// MCP descriptors for all registered tools, ordered by exposed name.
    pub fn list_mcp_tools(&self) -> Arc<Vec<McpToolDescriptor>> {
        if let Some(cached) = self.mcp_cache.read().as_ref() {
            return Arc::clone(cached);
        }
        let mut cache = self.mcp_cache.write();
        if let Some(cached) = cache.as_ref() {
            return Arc::clone(cached);
        }
        let descriptors = Arc::new(
            self.entries
                .read()
                .by_name
                .iter()
                .map(|(name, tool)| descriptor(name, tool.as_ref()))
                .collect::<Vec<_>>(),
        );
        *cache = Some(Arc::clone(&descriptors));
        descriptors
    }

    /// Remove every tool of a service, and the service's info.
    pub fn clear_tools_for_service(&self, service_id: &str) -> usize {
        let removed: Vec<String> = {
            let mut entries = self.entries.write();
            let names = entries.by_service.remove(service_id).unwrap_or_default();
            for name in &names {
                entries.by_name.remove(name);
            }
            names.into_iter().collect()
        };
        self.services.write().remove(service_id);
        self.invalidate_caches();

        let server = self.mcp_server.read().clone();
        if let Some(server) = server.filter(|_| !removed.is_empty()) {
            server.unregister_tools(&removed);
        }

        info!(service = service_id, removed = removed.len(), "Cleared tools for service");
        removed.len()
    }

    // ==================== Dispatch ====================

    fn resolve(&self, request: &ExecutionRequest) -> Result<Arc<dyn Tool>, ToolError> {
        let name = request
            .resolved_tool
            .as_deref()
            .unwrap_or(&request.tool_name);
        let entries = self.entries.read();
        if let Some(tool) = entries.by_name.get(name) {
            return Ok(Arc::clone(tool));
        }
        let suggestion = suggest(name, entries.by_name.keys().map(String::as_str));
        debug!(tool = name, suggestion = ?suggestion, "Tool not found");
        Err(ToolError::not_found(name, suggestion))
    }

    /// Run one call through the full pipeline.
    pub async fn execute_tool(
        &self,
        ctx: &CallContext,
        request: ExecutionRequest,
    ) -> Result<ToolOutput, ToolError> {
        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let tool = self.resolve(&request)?;
        let service = tool
            .definition()
            .service_id
            .as_deref()
            .and_then(|id| self.service_info(id));

        if let Some(service) = service.as_ref().filter(|s| !s.is_healthy()) {
            warn!(service = service.id(), tool = %request.tool_name, "Rejecting call to unhealthy service");
            return Err(ToolError::unhealthy(service.id()));
        }

        let timeout = self
            .params
            .timeout_for(service.as_ref().and_then(|s| s.timeout()));
        let call_ctx = ctx.child(timeout);
        let tool_name = request.tool_name.clone();
        let middlewares = self.middlewares.read().clone();
        let endpoint = Dispatch { tool, service };

        debug!(tool = %tool_name, timeout_ms = timeout.as_millis() as u64, dry_run = request.dry_run, "Dispatching tool call");

        let pipeline = Next::new(&middlewares, &endpoint).run(&call_ctx, request);
        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => {
                call_ctx.cancel();
                debug!(tool = %tool_name, "Tool call cancelled");
                Err(ToolError::Cancelled)
            }
            result = tokio::time::timeout(timeout, pipeline) => match result {
                Ok(result) => result,
                Err(_) => {
                    call_ctx.cancel();
                    warn!(tool = %tool_name, timeout_ms = timeout.as_millis() as u64, "Tool call timed out");
                    Err(ToolError::timeout(tool_name, timeout))
                }
            }
        }
    }
}

/// Innermost step: hooks around the tool itself.
struct Dispatch {
    tool: Arc<dyn Tool>,
    service: Option<Arc<ServiceInfo>>,
}

#[async_trait]
impl Endpoint for Dispatch {
    async fn call(
        &self,
        ctx: &CallContext,
        request: ExecutionRequest,
    ) -> Result<ToolOutput, ToolError> {
        let mut request = request;
        let (pre_hooks, post_hooks) = match &self.service {
            Some(s) => (s.pre_hooks(), s.post_hooks()),
            None => (&[][..], &[][..]),
        };

        for hook in pre_hooks {
            if ctx.is_cancelled() {
                return Err(ToolError::Cancelled);
            }
            let decision = hook.before(ctx, &request).await.inspect_err(|e| {
                warn!(hook = hook.name(), tool = %request.tool_name, code = e.code(), "Pre-call hook failed");
            })?;
            match decision.action {
                HookAction::Deny => {
                    warn!(hook = hook.name(), tool = %request.tool_name, "Tool execution denied by pre-call hook");
                    return Err(ToolError::policy_denied(
                        decision.message.unwrap_or_else(|| HOOK_DENIED.to_string()),
                    ));
                }
                action if action.is_cache_action() => ctx.set_cache_action(action),
                _ => {}
            }
            if let Some(replacement) = decision.replacement {
                debug!(hook = hook.name(), "Pre-call hook replaced the request");
                request = replacement;
            }
        }

        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        let mut output = self.tool.execute(ctx, &request).await?;

        for hook in post_hooks {
            if ctx.is_cancelled() {
                return Err(ToolError::Cancelled);
            }
            output = hook.after(ctx, &request, output).await.inspect_err(|e| {
                warn!(hook = hook.name(), tool = %request.tool_name, code = e.code(), "Post-call hook failed");
            })?;
        }
        Ok(output)
    }
}
