//! Middleware port
//!
//! Middleware wraps the hook-augmented execution of one call. The chain runs
//! in registration order: the first-registered middleware is outermost and
//! the last-registered sits closest to the core.

use std::sync::Arc;

use async_trait::async_trait;
use toolgate_domain::tool::{ExecutionRequest, ToolError, ToolOutput};

use super::tool::CallContext;

/// The innermost step of the chain.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(
        &self,
        ctx: &CallContext,
        request: ExecutionRequest,
    ) -> Result<ToolOutput, ToolError>;
}

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(
        &self,
        ctx: &CallContext,
        request: ExecutionRequest,
        next: Next<'_>,
    ) -> Result<ToolOutput, ToolError>;
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { chain, endpoint }
    }

    pub async fn run(
        self,
        ctx: &CallContext,
        request: ExecutionRequest,
    ) -> Result<ToolOutput, ToolError> {
        match self.chain.split_first() {
            Some((current, rest)) => {
                current
                    .handle(ctx, request, Next::new(rest, self.endpoint))
                    .await
            }
            None => self.endpoint.call(ctx, request).await,
        }
    }
}
