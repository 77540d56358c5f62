//! Tool port
//!
//! Defines the single capability every tool transport implements, and the
//! per-call context threaded through hooks, middleware and execution.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use toolgate_domain::tool::{ExecutionRequest, ToolDefinition, ToolError, ToolOutput};

use super::hooks::HookAction;

/// Per-call context.
///
/// Cloning shares the cancellation token and the cache-control slot, so a
/// middleware that holds a clone sees what a pre-call hook recorded.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    cache_action: Arc<Mutex<Option<HookAction>>>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// A context for one dispatch: child token, deadline tightened to `timeout`.
    pub fn child(&self, timeout: Duration) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            cache_action: Arc::clone(&self.cache_action),
        }
        .with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn set_cache_action(&self, action: HookAction) {
        *self.cache_action.lock() = Some(action);
    }

    /// Cache-control action recorded by a pre-call hook, if any.
    pub fn cache_action(&self) -> Option<HookAction> {
        *self.cache_action.lock()
    }
}

/// A callable tool.
///
/// Implementations live in the infrastructure layer (command-line adapter)
/// or in tests.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    async fn execute(
        &self,
        ctx: &CallContext,
        request: &ExecutionRequest,
    ) -> Result<ToolOutput, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_child_shares_cache_slot() {
        let ctx = CallContext::new();
        let child = ctx.child(Duration::from_secs(5));
        child.set_cache_action(HookAction::SaveCache);
        assert_eq!(ctx.cache_action(), Some(HookAction::SaveCache));
        assert!(child.remaining().is_some());
        assert!(ctx.remaining().is_none());
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_child() {
        let ctx = CallContext::new();
        let child = ctx.child(Duration::from_secs(5));
        ctx.cancel();
        assert!(child.is_cancelled());

        let other = CallContext::new();
        let other_child = other.child(Duration::from_secs(5));
        other_child.cancel();
        assert!(!other.is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_only_tightens() {
        let ctx = CallContext::new().with_deadline(Instant::now() + Duration::from_millis(100));
        let child = ctx.child(Duration::from_secs(60));
        assert!(child.remaining().unwrap() <= Duration::from_millis(100));
    }
}
