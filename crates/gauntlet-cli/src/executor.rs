//! Subprocess executor for Python unittest tests

use gauntlet_core::collab::{Outcome, TestExecutor};
use gauntlet_core::discovery::TestInfo;
use gauntlet_core::events::ErrorInfo;
use std::process::Command;

/// Runs one test at a time as `python -m unittest module.Class.method`
/// with the test's source directory as working directory.
///
/// Total by construction: a spawn failure or unclassifiable output is an
/// errored outcome, never a panic into the run loop.
pub struct UnittestExecutor {
    interpreter: String,
}

impl UnittestExecutor {
    pub fn new() -> Self {
        Self {
            interpreter: "python".to_string(),
        }
    }

    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for UnittestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TestExecutor for UnittestExecutor {
    fn execute(&self, test: &TestInfo) -> Outcome {
        let target = format!(
            "{}.{}.{}",
            test.module_name, test.class_name, test.method_name
        );

        let output = match Command::new(&self.interpreter)
            .args(["-m", "unittest", &target])
            .current_dir(&test.directory)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                return Outcome::Errored(ErrorInfo {
                    error_type: "ExecutorError".to_string(),
                    message: format!("failed to spawn {}: {e}", self.interpreter),
                    traceback: String::new(),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        classify_output(output.status.success(), &stderr)
    }
}

/// Map the unittest result tail to an outcome.
///
/// unittest prints its verdict as the last non-empty stderr line: `OK`,
/// `OK (skipped=N)`, `FAILED (failures=N)`, or `FAILED (errors=N)`.
fn classify_output(success: bool, stderr: &str) -> Outcome {
    let verdict = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string();

    if success {
        if verdict.starts_with("OK (skipped") {
            return Outcome::Skipped(skip_reason(stderr));
        }
        return Outcome::Passed;
    }

    if verdict.contains("failures=") {
        Outcome::Failed(ErrorInfo {
            error_type: "TestFailure".to_string(),
            message: verdict,
            traceback: stderr.to_string(),
        })
    } else {
        Outcome::Errored(ErrorInfo {
            error_type: "TestError".to_string(),
            message: verdict,
            traceback: stderr.to_string(),
        })
    }
}

/// Pull the framework's skip annotation, e.g. `... skipped 'needs gpu'`.
fn skip_reason(stderr: &str) -> String {
    stderr
        .lines()
        .find_map(|line| {
            line.split_once("skipped ")
                .map(|(_, reason)| reason.trim_matches('\'').to_string())
        })
        .unwrap_or_else(|| "skipped".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_pass() {
        let stderr = ".\n----------------------------------------------------------------------\nRan 1 test in 0.001s\n\nOK\n";
        assert_eq!(classify_output(true, stderr), Outcome::Passed);
    }

    #[test]
    fn test_classify_skip_with_reason() {
        let stderr = "s\ntest_gpu (test_x.TestX) ... skipped 'needs gpu'\nRan 1 test in 0.000s\n\nOK (skipped=1)\n";
        match classify_output(true, stderr) {
            Outcome::Skipped(reason) => assert_eq!(reason, "needs gpu"),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_failure() {
        let stderr = "F\nFAIL: test_math (test_x.TestX)\nAssertionError: 1 != 2\n\nRan 1 test in 0.001s\n\nFAILED (failures=1)\n";
        match classify_output(false, stderr) {
            Outcome::Failed(error) => {
                assert_eq!(error.error_type, "TestFailure");
                assert!(error.message.contains("failures=1"));
                assert!(error.traceback.contains("AssertionError"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_error() {
        let stderr = "E\nERROR: test_boom (test_x.TestX)\nValueError: boom\n\nRan 1 test in 0.001s\n\nFAILED (errors=1)\n";
        match classify_output(false, stderr) {
            Outcome::Errored(error) => assert_eq!(error.error_type, "TestError"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_failure_is_errored_outcome() {
        let executor = UnittestExecutor::with_interpreter("definitely-not-a-real-binary");
        let test = TestInfo {
            method_name: "test_a".to_string(),
            class_name: "TestA".to_string(),
            module_name: "test_a".to_string(),
            directory: std::env::temp_dir(),
            file_path: None,
            metadata: Default::default(),
        };
        match executor.execute(&test) {
            Outcome::Errored(error) => assert_eq!(error.error_type, "ExecutorError"),
            other => panic!("expected errored, got {other:?}"),
        }
    }
}
