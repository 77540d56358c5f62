//! Output formatter trait

use toolgate_application::{CheckReport, McpToolDescriptor};
use toolgate_domain::{ConfigIssue, ToolError, ToolOutput};

/// Renders command results for one output format
pub trait OutputFormatter {
    /// Format the exposed tools
    fn format_tools(&self, tools: &[McpToolDescriptor]) -> String;

    /// Format a successful tool call
    fn format_output(&self, tool: &str, output: &ToolOutput) -> String;

    /// Format a failed tool call
    fn format_error(&self, tool: &str, error: &ToolError) -> String;

    /// Format the verdict of `toolgate check`
    fn format_check(&self, report: &CheckReport) -> String;

    /// Format configuration issues
    fn format_issues(&self, issues: &[ConfigIssue]) -> String;
}
