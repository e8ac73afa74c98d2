//! Event model for the reporting pipeline
//!
//! Immutable value objects produced by the runner and consumed by
//! observers. [`TestEvent`] is the sole unit of communication between the
//! runner and the publisher.

use crate::discovery::TestMetadata;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{json, Value};

/// Execution status of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
    Skip,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
            TestStatus::Skip => "SKIP",
        }
    }
}

/// Details of a test failure or error, derived from the execution
/// framework's raised-exception triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    /// Exception type name, e.g. `AssertionError`.
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    /// Formatted traceback text.
    pub traceback: String,
}

/// Result of one test execution. Created exactly once per test and owned by
/// the reporting subsystem afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub classname: String,
    pub status: TestStatus,
    /// Execution time in seconds.
    pub duration: f64,
    pub timestamp: DateTime<Local>,
    pub metadata: TestMetadata,
    pub error_info: Option<ErrorInfo>,
    pub skip_reason: Option<String>,
}

impl TestResult {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.classname, self.name)
    }

    /// Tiered JSON rendering: level 1 carries the basic fields, level 2 and
    /// above adds error details and the fully qualified name.
    pub fn to_json(&self, verbosity: u8) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("name".to_string(), json!(self.name));
        map.insert("classname".to_string(), json!(self.classname));
        map.insert("status".to_string(), json!(self.status.as_str()));
        // Microsecond precision.
        map.insert(
            "duration".to_string(),
            json!((self.duration * 1e6).round() / 1e6),
        );
        map.insert("timestamp".to_string(), json!(self.timestamp.to_rfc3339()));
        map.insert("metadata".to_string(), json!(self.metadata));

        if verbosity >= 2 {
            if let Some(error) = &self.error_info {
                map.insert(
                    "error_info".to_string(),
                    serde_json::to_value(error).unwrap_or(Value::Null),
                );
            }
            map.insert("full_name".to_string(), Value::String(self.full_name()));
        }

        Value::Object(map)
    }
}

/// Aggregate outcome of a complete run. Built once at run end and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRunSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Command line that started the run.
    pub command: String,
    pub exit_code: i32,
}

impl TestRunSummary {
    /// Success rate as a percentage; an empty run counts as fully
    /// successful.
    pub fn success_rate(&self) -> f64 {
        if self.total_tests == 0 {
            return 100.0;
        }
        (self.passed as f64 / self.total_tests as f64) * 100.0
    }

    pub fn to_json(&self) -> Value {
        json!({
            "summary": {
                "total_tests": self.total_tests,
                "passed": self.passed,
                "failed": self.failed,
                "errors": self.errors,
                "skipped": self.skipped,
                "success_rate": (self.success_rate() * 100.0).round() / 100.0,
            },
            "timing": {
                "duration": self.duration,
                "start_time": self.start_time.to_rfc3339(),
                "end_time": self.end_time.to_rfc3339(),
            },
            "execution": {
                "command": self.command,
                "exit_code": self.exit_code,
            },
        })
    }
}

/// Complete run document for JSON file sinks: run info plus every result.
pub fn serialize_run_document(
    results: &[TestResult],
    summary: Option<&TestRunSummary>,
    verbosity: u8,
) -> Value {
    json!({
        "run_info": summary.map(TestRunSummary::to_json).unwrap_or(Value::Null),
        "test_results": results.iter().map(|r| r.to_json(verbosity)).collect::<Vec<_>>(),
    })
}

/// A test-lifecycle occurrence, fanned out to every observer.
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
    RunStart {
        command: String,
        start_time: DateTime<Local>,
        test_count: usize,
    },
    TestStart {
        name: String,
        classname: String,
    },
    TestEnd(TestResult),
    RunEnd(TestRunSummary),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_result(name: &str, status: TestStatus) -> TestResult {
        TestResult {
            name: name.to_string(),
            classname: "TestExample".to_string(),
            status,
            duration: 0.25,
            timestamp: Local::now(),
            metadata: TestMetadata::default(),
            error_info: None,
            skip_reason: None,
        }
    }

    #[test]
    fn test_success_rate_of_empty_run_is_full() {
        let summary = TestRunSummary {
            total_tests: 0,
            passed: 0,
            failed: 0,
            errors: 0,
            skipped: 0,
            duration: 0.0,
            start_time: Local::now(),
            end_time: Local::now(),
            command: "gauntlet".to_string(),
            exit_code: 0,
        };
        assert_eq!(summary.success_rate(), 100.0);
    }

    #[test]
    fn test_result_json_tiers() {
        let mut result = sample_result("test_math", TestStatus::Fail);
        result.error_info = Some(ErrorInfo {
            error_type: "AssertionError".to_string(),
            message: "1 != 2".to_string(),
            traceback: "Traceback (most recent call last): ...".to_string(),
        });

        let basic = result.to_json(1);
        assert!(basic.get("error_info").is_none());
        assert!(basic.get("full_name").is_none());

        let detailed = result.to_json(2);
        assert_eq!(detailed["full_name"], "TestExample.test_math");
        assert_eq!(detailed["error_info"]["type"], "AssertionError");
    }

    #[test]
    fn test_run_document_without_summary_is_valid() {
        let results = vec![sample_result("test_a", TestStatus::Pass)];
        let doc = serialize_run_document(&results, None, 1);
        assert!(doc["run_info"].is_null());
        assert_eq!(doc["test_results"].as_array().unwrap().len(), 1);
    }
}
