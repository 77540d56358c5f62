//! Timing and structured logging around every call.

use std::time::Instant;

use async_trait::async_trait;
use toolgate_domain::tool::{ExecutionRequest, ToolError, ToolOutput};
use tracing::{debug, info, warn};

use crate::ports::middleware::{Middleware, Next};
use crate::ports::tool::CallContext;

/// Logs each call with its duration, and stamps the duration on successful
/// output that does not already carry one.
#[derive(Debug, Default)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn handle(
        &self,
        ctx: &CallContext,
        request: ExecutionRequest,
        next: Next<'_>,
    ) -> Result<ToolOutput, ToolError> {
        let tool = request.tool_name.clone();
        let dry_run = request.dry_run;
        debug!(tool = %tool, dry_run, "Tool call started");

        let started = Instant::now();
        let result = next.run(ctx, request).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(mut output) => {
                info!(tool = %tool, duration_ms, dry_run, "Tool call succeeded");
                if output.metadata.duration_ms.is_none() {
                    output.metadata.duration_ms = Some(duration_ms);
                }
                Ok(output)
            }
            Err(e) => {
                match &e {
                    ToolError::ValidationRejection { rejection } => {
                        warn!(tool = %tool, duration_ms, kind = ?rejection.kind, "Tool call rejected by validator");
                    }
                    other => {
                        warn!(tool = %tool, duration_ms, code = other.code(), "Tool call failed");
                    }
                }
                Err(e)
            }
        }
    }
}
