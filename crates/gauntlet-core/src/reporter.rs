//! Run reporting façade
//!
//! [`RunReporter`] is the single entry point the runner talks to: it owns
//! the publisher, builds observers from configuration, bridges executor
//! callbacks into events, and computes the final summary and exit code.

use crate::discovery::TestInfo;
use crate::events::{ErrorInfo, TestEvent, TestResult, TestRunSummary, TestStatus};
use crate::observer::{ConsoleObserver, FileObserver, FileOutputConfig};
use crate::publisher::EventPublisher;
use crate::strategy::{JsonStrategy, OutputStrategy, StandardStrategy, VerboseStrategy};
use crate::writer::OutputError;
use chrono::{DateTime, Local};

/// Console output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleFormat {
    #[default]
    Standard,
    Verbose,
    Json,
    /// Standard strategy at its lowest verbosity tier.
    Minimal,
}

impl std::str::FromStr for ConsoleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ConsoleFormat::Standard),
            "verbose" => Ok(ConsoleFormat::Verbose),
            "json" => Ok(ConsoleFormat::Json),
            "minimal" => Ok(ConsoleFormat::Minimal),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Reporter configuration assembled by the CLI.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub format: ConsoleFormat,
    /// Console detail tier; file sinks carry their own.
    pub verbosity: u8,
    pub use_color: bool,
    pub quiet: bool,
    pub file_outputs: Vec<FileOutputConfig>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            format: ConsoleFormat::Standard,
            verbosity: 1,
            use_color: true,
            quiet: false,
            file_outputs: Vec::new(),
        }
    }
}

/// Bridges executor callbacks to the event pipeline and aggregates the run
/// outcome.
pub struct RunReporter {
    publisher: EventPublisher,
    results: Vec<TestResult>,
    command: String,
    start_time: Option<DateTime<Local>>,
    passed: usize,
    failed: usize,
    errors: usize,
    skipped: usize,
}

impl RunReporter {
    /// Build the observer set from configuration. A file sink that cannot
    /// be opened is a setup failure and aborts construction.
    pub fn new(config: &ReporterConfig) -> Result<Self, OutputError> {
        let mut publisher = EventPublisher::new();

        let (strategy, verbosity): (Box<dyn OutputStrategy>, u8) = match config.format {
            ConsoleFormat::Standard => (Box::new(StandardStrategy), config.verbosity),
            ConsoleFormat::Verbose => (Box::new(VerboseStrategy), config.verbosity.max(2)),
            ConsoleFormat::Json => (Box::new(JsonStrategy), config.verbosity),
            ConsoleFormat::Minimal => (Box::new(StandardStrategy), 0),
        };
        publisher.add_observer(Box::new(ConsoleObserver::new(
            strategy,
            verbosity,
            config.use_color,
            config.quiet,
        )));

        for file_config in &config.file_outputs {
            publisher.add_observer(Box::new(FileObserver::create(file_config)?));
        }

        Ok(Self {
            publisher,
            results: Vec::new(),
            command: String::new(),
            start_time: None,
            passed: 0,
            failed: 0,
            errors: 0,
            skipped: 0,
        })
    }

    /// Begin a run, resetting all per-run state.
    pub fn start_test_run(&mut self, command: &str, test_count: usize) {
        self.results.clear();
        self.passed = 0;
        self.failed = 0;
        self.errors = 0;
        self.skipped = 0;

        let start_time = Local::now();
        self.command = command.to_string();
        self.start_time = Some(start_time);

        self.publisher.notify_all(&TestEvent::RunStart {
            command: command.to_string(),
            start_time,
            test_count,
        });
    }

    pub fn test_started(&mut self, test: &TestInfo) {
        self.publisher.notify_all(&TestEvent::TestStart {
            name: test.method_name.clone(),
            classname: test.class_name.clone(),
        });
    }

    pub fn record_success(&mut self, test: &TestInfo, duration: f64) {
        self.passed += 1;
        self.record(test, TestStatus::Pass, duration, None, None);
    }

    pub fn record_failure(&mut self, test: &TestInfo, duration: f64, error: ErrorInfo) {
        self.failed += 1;
        self.record(test, TestStatus::Fail, duration, Some(error), None);
    }

    pub fn record_error(&mut self, test: &TestInfo, duration: f64, error: ErrorInfo) {
        self.errors += 1;
        self.record(test, TestStatus::Error, duration, Some(error), None);
    }

    pub fn record_skip(&mut self, test: &TestInfo, duration: f64, reason: String) {
        self.skipped += 1;
        self.record(test, TestStatus::Skip, duration, None, Some(reason));
    }

    /// End the run: compute the summary, publish it, and return it.
    /// Exit code is 1 exactly when any test failed or errored.
    pub fn end_test_run(&mut self) -> TestRunSummary {
        let end_time = Local::now();
        let start_time = self.start_time.unwrap_or(end_time);
        let duration = (end_time - start_time).as_seconds_f64();

        let summary = TestRunSummary {
            total_tests: self.results.len(),
            passed: self.passed,
            failed: self.failed,
            errors: self.errors,
            skipped: self.skipped,
            duration,
            start_time,
            end_time,
            command: self.command.clone(),
            exit_code: i32::from(self.failed > 0 || self.errors > 0),
        };

        self.publisher.notify_all(&TestEvent::RunEnd(summary.clone()));
        summary
    }

    /// Results recorded so far in the current run.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Flush and release every observer. Idempotent; also invoked on drop
    /// so an interrupted run still drains its file sinks.
    pub fn close(&mut self) {
        self.publisher.close_all();
    }

    fn record(
        &mut self,
        test: &TestInfo,
        status: TestStatus,
        duration: f64,
        error_info: Option<ErrorInfo>,
        skip_reason: Option<String>,
    ) {
        let result = TestResult {
            name: test.method_name.clone(),
            classname: test.class_name.clone(),
            status,
            duration,
            timestamp: Local::now(),
            metadata: test.metadata.clone(),
            error_info,
            skip_reason,
        };
        self.results.push(result.clone());
        self.publisher.notify_all(&TestEvent::TestEnd(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::TestMetadata;
    use crate::writer::FileFormat;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn test_info(method: &str) -> TestInfo {
        TestInfo {
            method_name: method.to_string(),
            class_name: "TestSuite".to_string(),
            module_name: "test_suite".to_string(),
            directory: PathBuf::from("tests"),
            file_path: None,
            metadata: TestMetadata::default(),
        }
    }

    fn quiet_config() -> ReporterConfig {
        ReporterConfig {
            quiet: true,
            ..ReporterConfig::default()
        }
    }

    fn assertion_error() -> ErrorInfo {
        ErrorInfo {
            error_type: "AssertionError".to_string(),
            message: "1 != 2".to_string(),
            traceback: String::new(),
        }
    }

    #[test]
    fn test_exit_code_zero_when_all_pass() {
        let mut reporter = RunReporter::new(&quiet_config()).unwrap();
        reporter.start_test_run("gauntlet", 2);
        reporter.record_success(&test_info("test_a"), 0.1);
        reporter.record_skip(&test_info("test_b"), 0.0, "not today".to_string());

        let summary = reporter.end_test_run();
        assert_eq!(summary.exit_code, 0);
        assert_eq!(summary.total_tests, 2);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_exit_code_one_on_failure_or_error() {
        let mut reporter = RunReporter::new(&quiet_config()).unwrap();
        reporter.start_test_run("gauntlet", 1);
        reporter.record_failure(&test_info("test_a"), 0.1, assertion_error());
        assert_eq!(reporter.end_test_run().exit_code, 1);

        reporter.start_test_run("gauntlet", 1);
        reporter.record_error(&test_info("test_b"), 0.1, assertion_error());
        assert_eq!(reporter.end_test_run().exit_code, 1);
    }

    #[test]
    fn test_start_run_resets_state() {
        let mut reporter = RunReporter::new(&quiet_config()).unwrap();
        reporter.start_test_run("gauntlet", 1);
        reporter.record_failure(&test_info("test_a"), 0.1, assertion_error());
        reporter.end_test_run();

        reporter.start_test_run("gauntlet", 1);
        reporter.record_success(&test_info("test_b"), 0.1);
        let summary = reporter.end_test_run();

        assert_eq!(summary.total_tests, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.exit_code, 0);
    }

    #[test]
    fn test_file_sink_receives_full_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        let config = ReporterConfig {
            quiet: true,
            file_outputs: vec![FileOutputConfig {
                filename: path.clone(),
                format: FileFormat::Json,
                verbosity: 1,
                append: false,
            }],
            ..ReporterConfig::default()
        };

        let mut reporter = RunReporter::new(&config).unwrap();
        reporter.start_test_run("gauntlet --format json", 2);
        reporter.record_success(&test_info("test_a"), 0.1);
        reporter.record_failure(&test_info("test_b"), 0.2, assertion_error());
        reporter.end_test_run();
        reporter.close();

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["run_info"]["summary"]["failed"], 1);
        assert_eq!(doc["test_results"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_unopenable_sink_is_setup_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let config = ReporterConfig {
            file_outputs: vec![FileOutputConfig::new(blocker.join("run.txt"))],
            ..ReporterConfig::default()
        };
        assert!(RunReporter::new(&config).is_err());
    }
}
