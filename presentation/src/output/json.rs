//! JSON output formatter

use serde::Serialize;
use serde_json::json;
use toolgate_application::{CheckReport, McpToolDescriptor};
use toolgate_domain::{ConfigIssue, ToolError, ToolOutput};

use crate::output::formatter::OutputFormatter;

/// Formats results as pretty-printed JSON documents
pub struct JsonFormatter;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

impl OutputFormatter for JsonFormatter {
    fn format_tools(&self, tools: &[McpToolDescriptor]) -> String {
        to_json(tools)
    }

    fn format_output(&self, tool: &str, output: &ToolOutput) -> String {
        to_json(&json!({
            "tool": tool,
            "result": output.value,
            "metadata": output.metadata,
        }))
    }

    fn format_error(&self, tool: &str, error: &ToolError) -> String {
        to_json(&json!({
            "tool": tool,
            "error": error,
            "message": error.to_string(),
            "retryable": error.is_retryable(),
        }))
    }

    fn format_check(&self, report: &CheckReport) -> String {
        let mut value = serde_json::to_value(report).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.insert("allowed".to_string(), report.is_allowed().into());
        }
        to_json(&value)
    }

    fn format_issues(&self, issues: &[ConfigIssue]) -> String {
        to_json(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use toolgate_domain::{OutputMetadata, RejectKind, Rejection};

    #[test]
    fn test_output_document() {
        let output = ToolOutput {
            value: json!({"stdout": "hi\n"}),
            metadata: OutputMetadata {
                exit_code: Some(0),
                ..OutputMetadata::default()
            },
        };
        let doc: Value = serde_json::from_str(&JsonFormatter.format_output("x.echo", &output)).unwrap();
        assert_eq!(doc["tool"], "x.echo");
        assert_eq!(doc["result"]["stdout"], "hi\n");
        assert_eq!(doc["metadata"]["exit_code"], 0);
    }

    #[test]
    fn test_error_document_carries_code() {
        let error = ToolError::from(Rejection::new(RejectKind::ShellInjection, "';' outside quotes"));
        let doc: Value = serde_json::from_str(&JsonFormatter.format_error("x.sh", &error)).unwrap();
        assert_eq!(doc["error"]["code"], "VALIDATION_REJECTED");
        assert_eq!(doc["retryable"], false);
        assert!(doc["message"].as_str().unwrap().contains("shell injection detected"));
    }
}
