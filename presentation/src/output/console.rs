//! Console output formatter

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use serde_json::Value;
use toolgate_application::{CheckReport, McpToolDescriptor};
use toolgate_domain::{ConfigIssue, Severity, ToolError, ToolOutput};

/// Formats results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn hints(tool: &McpToolDescriptor) -> String {
        let a = &tool.annotations;
        [
            (a.read_only, "read-only"),
            (a.destructive, "destructive"),
            (a.idempotent, "idempotent"),
            (a.open_world, "open-world"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, label)| *label)
        .collect::<Vec<_>>()
        .join(", ")
    }

    fn parameters(schema: &Value) -> Vec<String> {
        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        schema["properties"]
            .as_object()
            .map(|props| {
                props
                    .iter()
                    .map(|(name, p)| {
                        let ty = p["type"].as_str().unwrap_or("string");
                        if required.contains(&name.as_str()) {
                            format!("{}: {} {}", name.bold(), ty, "(required)".yellow())
                        } else {
                            format!("{}: {}", name.bold(), ty)
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_tools(&self, tools: &[McpToolDescriptor]) -> String {
        if tools.is_empty() {
            return format!("{}\n", "No tools are exposed by the current configuration.".dimmed());
        }
        let mut output = Self::header("Tools");
        output.push('\n');
        for tool in tools {
            output.push_str(&format!("\n{}", tool.name.green().bold()));
            let hints = Self::hints(tool);
            if !hints.is_empty() {
                output.push_str(&format!(" {}", format!("[{}]", hints).dimmed()));
            }
            output.push('\n');
            if !tool.description.is_empty() {
                output.push_str(&format!("  {}\n", tool.description));
            }
            for param in Self::parameters(&tool.input_schema) {
                output.push_str(&format!("    - {}\n", param));
            }
        }
        output
    }

    fn format_output(&self, tool: &str, output: &ToolOutput) -> String {
        let mut text = String::new();
        if output.metadata.dry_run {
            text.push_str(&format!("{} {}\n", "Dry run:".yellow().bold(), tool));
            text.push_str(&format!("  {} {}\n", "command:".cyan(), output.value["command"]));
            text.push_str(&format!("  {} {}\n", "args:".cyan(), output.value["args"]));
            text.push_str(&format!("  {} {}\n", "env:".cyan(), output.value["env"]));
            return text;
        }

        match output.value.get("combined_output").and_then(Value::as_str) {
            Some(combined) => text.push_str(combined),
            None => text.push_str(
                &serde_json::to_string_pretty(&output.value).unwrap_or_else(|_| "{}".to_string()),
            ),
        }
        if !text.ends_with('\n') {
            text.push('\n');
        }

        let mut facts = Vec::new();
        if let Some(code) = output.metadata.exit_code {
            facts.push(format!("exit {}", code));
        }
        if let Some(ms) = output.metadata.duration_ms {
            facts.push(format!("{}ms", ms));
        }
        if let Some(bytes) = output.metadata.bytes {
            facts.push(format!("{} bytes", bytes));
        }
        if !facts.is_empty() {
            text.push_str(&format!("{}\n", format!("── {} ({}) ──", tool, facts.join(", ")).dimmed()));
        }
        text
    }

    fn format_error(&self, tool: &str, error: &ToolError) -> String {
        let mut text = format!("{} {}\n", format!("{} failed:", tool).red().bold(), error);
        if error.is_retryable() {
            text.push_str(&format!("{}\n", "  (the call may succeed if retried)".dimmed()));
        }
        text
    }

    fn format_check(&self, report: &CheckReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "Command:".cyan().bold(), report.command));
        if !report.wrappers.is_empty() {
            output.push_str(&format!(
                "{} {} -> {}\n",
                "Wrappers:".cyan().bold(),
                report.wrappers.join(" -> "),
                report.effective
            ));
        }
        if report.opaque {
            output.push_str(&format!(
                "{}\n",
                "Command could not be fully resolved; strictest rules apply".yellow()
            ));
        }
        if let Some(blocked) = &report.blocked {
            output.push_str(&format!("{} {}\n", "Blocked:".red().bold(), blocked));
        }

        if !report.substitutions.is_empty() {
            output.push_str(&Self::section_header("Substitutions"));
            for sub in &report.substitutions {
                let location = match (&sub.env_name, sub.arg_index) {
                    (Some(name), _) => format!("env {}", name),
                    (None, Some(i)) => format!("arg {}", i),
                    (None, None) => "-".to_string(),
                };
                let script = if sub.script_position { ", script" } else { "" };
                let line = format!("{{{{{}}}}} at {} ({}{})", sub.param, location, sub.context, script);
                match &sub.rejection {
                    None => output.push_str(&format!("  {} {}\n", "ok".green(), line)),
                    Some(r) => {
                        output.push_str(&format!("  {} {}\n", "rejected".red().bold(), line));
                        output.push_str(&format!("      {}\n", r.detail));
                    }
                }
            }
        }

        output.push('\n');
        match &report.argv {
            Some(argv) if report.is_allowed() => {
                output.push_str(&format!("{}\n", "ALLOWED".green().bold()));
                output.push_str(&format!("{} {:?}\n", "argv:".dimmed(), argv));
            }
            _ => output.push_str(&format!("{}\n", "REJECTED".red().bold())),
        }
        output
    }

    fn format_issues(&self, issues: &[ConfigIssue]) -> String {
        if issues.is_empty() {
            return format!("{}\n", "Configuration is valid.".green());
        }
        let mut output = String::new();
        for issue in issues {
            let label = match issue.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warning".yellow().bold(),
            };
            output.push_str(&format!("{}: {}\n", label, issue.message));
        }
        let errors = issues.iter().filter(|i| i.is_error()).count();
        output.push_str(&format!(
            "\n{} error(s), {} warning(s)\n",
            errors,
            issues.len() - errors
        ));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolgate_domain::{ConfigIssueCode, ToolAnnotations};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_tools_lists_parameters() {
        plain();
        let tools = vec![McpToolDescriptor {
            name: "git.log".to_string(),
            description: "Show history".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"count": {"type": "integer"}, "path": {"type": "string"}},
                "required": ["count"],
            }),
            annotations: ToolAnnotations {
                read_only: true,
                ..ToolAnnotations::default()
            },
        }];
        let text = ConsoleFormatter.format_tools(&tools);
        assert!(text.contains("git.log [read-only]"));
        assert!(text.contains("count: integer (required)"));
        assert!(text.contains("path: string"));
    }

    #[test]
    fn test_format_issues_counts() {
        plain();
        let issues = vec![
            ConfigIssue::error(ConfigIssueCode::EmptyCommand, "service 'a' tool 'b': command is empty"),
            ConfigIssue::warning(ConfigIssueCode::UnusedParameter, "unused"),
        ];
        let text = ConsoleFormatter.format_issues(&issues);
        assert!(text.contains("error: service 'a' tool 'b': command is empty"));
        assert!(text.contains("1 error(s), 1 warning(s)"));
        assert!(ConsoleFormatter.format_issues(&[]).contains("valid"));
    }

    #[test]
    fn test_format_output_prefers_combined_output() {
        plain();
        let output = ToolOutput::new(json!({"combined_output": "hello", "stdout": "hello"}));
        assert_eq!(ConsoleFormatter.format_output("x.echo", &output), "hello\n");
    }
}
