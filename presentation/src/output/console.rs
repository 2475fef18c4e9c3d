//! Console output formatter for invocation results

use crate::cli::commands::OutputFormat;
use colored::Colorize;
use serde_json::{Value, json};
use toolgate_domain::{InvokeError, ToolDefinition};

/// Formats tool results, tool lists and errors for the terminal
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a successful tool result
    pub fn format_result(format: OutputFormat, tool: &str, result: &Value) -> String {
        match format {
            OutputFormat::Json => Self::to_json(&json!({
                "ok": true,
                "tool": tool,
                "result": result,
            })),
            OutputFormat::Text => match result {
                Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            },
        }
    }

    /// Format a failed invocation
    pub fn format_error(format: OutputFormat, tool: &str, error: &InvokeError) -> String {
        match format {
            OutputFormat::Json => Self::to_json(&json!({
                "ok": false,
                "tool": tool,
                "category": error.category(),
                "message": error.to_string(),
            })),
            OutputFormat::Text => format!(
                "{} {} {}",
                "Error".red().bold(),
                format!("[{}]", error.category()).dimmed(),
                error
            ),
        }
    }

    /// Format a tool listing
    pub fn format_tools(format: OutputFormat, tools: &[ToolDefinition]) -> String {
        match format {
            OutputFormat::Json => Self::to_json(&json!({ "tools": tools })),
            OutputFormat::Text => {
                if tools.is_empty() {
                    return "No tools available".dimmed().to_string();
                }
                let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
                let mut output = format!("{}\n", "Available tools:".cyan().bold());
                for tool in tools {
                    output.push_str(&format!(
                        "  {:<width$}  {}\n",
                        tool.name.yellow(),
                        tool.description,
                        width = width
                    ));
                }
                output
            }
        }
    }

    fn to_json(value: &Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}
