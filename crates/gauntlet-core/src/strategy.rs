//! Output formatting strategies
//!
//! A strategy turns events into text and knows nothing about where the text
//! goes. Observers own destinations; strategies own shape. "Minimal" output
//! is a console verbosity tier, not a strategy.

use crate::events::{TestResult, TestRunSummary, TestStatus};
use chrono::{DateTime, Local};
use serde_json::json;

/// Stateless event-to-text formatter.
pub trait OutputStrategy: Send {
    fn format_test_result(&self, result: &TestResult, verbosity: u8) -> String;
    fn format_run_summary(&self, summary: &TestRunSummary) -> String;
    fn format_header(&self, command: &str, start_time: &DateTime<Local>) -> String;
}

fn status_symbol(status: TestStatus) -> &'static str {
    match status {
        TestStatus::Pass => "✓",
        TestStatus::Fail => "✗",
        TestStatus::Error => "💥",
        TestStatus::Skip => "⊝",
    }
}

/// Compact one-line-per-test text output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardStrategy;

impl OutputStrategy for StandardStrategy {
    fn format_test_result(&self, result: &TestResult, verbosity: u8) -> String {
        let mut out = format!(
            "{} {}.{}",
            status_symbol(result.status),
            result.classname,
            result.name
        );

        if verbosity >= 1 {
            out.push_str(&format!(" ({:.3}s)", result.duration));
        }

        if verbosity >= 2 {
            if let Some(error) = &result.error_info {
                out.push_str(&format!(
                    "\n    Error: {}: {}",
                    error.error_type, error.message
                ));
            }
        }

        out
    }

    fn format_run_summary(&self, summary: &TestRunSummary) -> String {
        [
            "=== Test Run Summary ===".to_string(),
            format!("Total: {}", summary.total_tests),
            format!("Passed: {}", summary.passed),
            format!("Failed: {}", summary.failed),
            format!("Errors: {}", summary.errors),
            format!("Skipped: {}", summary.skipped),
            format!("Success Rate: {:.1}%", summary.success_rate()),
            format!("Duration: {:.3}s", summary.duration),
        ]
        .join("\n")
    }

    fn format_header(&self, command: &str, start_time: &DateTime<Local>) -> String {
        format!(
            "Running: {command}\nStarted: {}\n",
            start_time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Multi-line per-test text output with timing, metadata, and tracebacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerboseStrategy;

impl OutputStrategy for VerboseStrategy {
    fn format_test_result(&self, result: &TestResult, verbosity: u8) -> String {
        let mut lines = vec![
            format!("Test: {}.{}", result.classname, result.name),
            format!("Status: {}", result.status.as_str()),
            format!("Duration: {:.6}s", result.duration),
            format!("Timestamp: {}", result.timestamp.to_rfc3339()),
        ];

        if !result.metadata.is_empty() {
            lines.push(format!(
                "Metadata: {}",
                serde_json::to_string(&result.metadata).unwrap_or_default()
            ));
        }

        if let Some(error) = &result.error_info {
            lines.push(format!("Error Type: {}", error.error_type));
            lines.push(format!("Error Message: {}", error.message));
            if verbosity >= 3 {
                lines.push("Traceback:".to_string());
                lines.extend(
                    error
                        .traceback
                        .lines()
                        .take(10)
                        .map(|line| format!("  {line}")),
                );
            }
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn format_run_summary(&self, summary: &TestRunSummary) -> String {
        [
            "=== Detailed Test Run Summary ===".to_string(),
            format!("Command: {}", summary.command),
            format!("Start Time: {}", summary.start_time.to_rfc3339()),
            format!("End Time: {}", summary.end_time.to_rfc3339()),
            format!("Total Duration: {:.6}s", summary.duration),
            String::new(),
            "Test Counts:".to_string(),
            format!("  Total: {}", summary.total_tests),
            format!("  Passed: {}", summary.passed),
            format!("  Failed: {}", summary.failed),
            format!("  Errors: {}", summary.errors),
            format!("  Skipped: {}", summary.skipped),
            String::new(),
            format!("Success Rate: {:.2}%", summary.success_rate()),
            format!("Exit Code: {}", summary.exit_code),
        ]
        .join("\n")
    }

    fn format_header(&self, command: &str, start_time: &DateTime<Local>) -> String {
        let rule = "=".repeat(60);
        [
            rule.clone(),
            "GAUNTLET TEST EXECUTION".to_string(),
            rule.clone(),
            format!("Command: {command}"),
            format!("Started: {}", start_time.format("%Y-%m-%d %H:%M:%S")),
            format!("Process ID: {}", std::process::id()),
            rule,
            String::new(),
        ]
        .join("\n")
    }
}

/// Pretty-printed JSON fragments, one per event.
///
/// File sinks do not emit these fragments verbatim; the writer buffers
/// results and produces a single document at close.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStrategy;

impl OutputStrategy for JsonStrategy {
    fn format_test_result(&self, result: &TestResult, verbosity: u8) -> String {
        serde_json::to_string_pretty(&result.to_json(verbosity)).unwrap_or_default()
    }

    fn format_run_summary(&self, summary: &TestRunSummary) -> String {
        serde_json::to_string_pretty(&summary.to_json()).unwrap_or_default()
    }

    fn format_header(&self, command: &str, start_time: &DateTime<Local>) -> String {
        let header = json!({
            "run_info": {
                "command": command,
                "start_time": start_time.to_rfc3339(),
                "format": "json",
            }
        });
        serde_json::to_string_pretty(&header).unwrap_or_default()
    }
}
