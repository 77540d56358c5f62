//! Writes one audit record per call.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use toolgate_domain::SecretRedactor;
use toolgate_domain::tool::{ExecutionRequest, ToolError, ToolOutput, parse_tool_name};

use crate::ports::audit_log::{AuditLog, AuditRecord};
use crate::ports::middleware::{Middleware, Next};
use crate::ports::tool::CallContext;

pub struct AuditMiddleware {
    log: Arc<dyn AuditLog>,
    redactor: SecretRedactor,
}

impl std::fmt::Debug for AuditMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditMiddleware").finish_non_exhaustive()
    }
}

impl AuditMiddleware {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self {
            log,
            redactor: SecretRedactor::default(),
        }
    }

    /// Scrub these values from recorded arguments and error messages.
    pub fn with_redactor(mut self, redactor: SecretRedactor) -> Self {
        self.redactor = redactor;
        self
    }
}

#[async_trait]
impl Middleware for AuditMiddleware {
    fn name(&self) -> &str {
        "audit"
    }

    async fn handle(
        &self,
        ctx: &CallContext,
        request: ExecutionRequest,
        next: Next<'_>,
    ) -> Result<ToolOutput, ToolError> {
        let tool = request.tool_name.clone();
        let dry_run = request.dry_run;
        let arguments = self.redactor.redact_json(
            request
                .arguments()
                .map(Value::Object)
                .unwrap_or_else(|_| request.tool_inputs.clone()),
        );

        let started = Instant::now();
        let result = next.run(ctx, request).await;

        let (outcome, error) = match &result {
            Ok(_) => ("ok".to_string(), None),
            Err(e) => (
                e.code().to_string(),
                Some(self.redactor.redact_str(&e.to_string())),
            ),
        };
        self.log.record(AuditRecord {
            service: parse_tool_name(&tool).0.map(str::to_string),
            tool,
            outcome,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            dry_run,
            arguments,
            error,
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::middleware::Endpoint;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct MemoryLog(Mutex<Vec<AuditRecord>>);

    impl AuditLog for MemoryLog {
        fn record(&self, record: AuditRecord) {
            self.0.lock().push(record);
        }
    }

    struct Failing;

    #[async_trait]
    impl Endpoint for Failing {
        async fn call(
            &self,
            _ctx: &CallContext,
            _request: ExecutionRequest,
        ) -> Result<ToolOutput, ToolError> {
            Err(ToolError::upstream("login with hunter2 failed", Some(1)))
        }
    }

    #[tokio::test]
    async fn test_records_redacted_failure() {
        let log = Arc::new(MemoryLog::default());
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(
            AuditMiddleware::new(log.clone()).with_redactor(SecretRedactor::new(["hunter2"])),
        )];

        let err = Next::new(&chain, &Failing)
            .run(
                &CallContext::new(),
                ExecutionRequest::new("svc.login", json!({"note": "hunter2"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_ERROR");

        let records = log.0.lock();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.tool, "svc.login");
        assert_eq!(record.service.as_deref(), Some("svc"));
        assert_eq!(record.outcome, "UPSTREAM_ERROR");
        assert_eq!(record.arguments, json!({"note": "[REDACTED]"}));
        let error = record.error.as_deref().unwrap();
        assert!(!error.contains("hunter2"));
        assert!(error.contains("[REDACTED]"));
    }
}
