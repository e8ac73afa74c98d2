//! Sequential test execution

use crate::collab::{Outcome, TestExecutor};
use crate::discovery::TestInfo;
use crate::reporter::RunReporter;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Aggregate statistics of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub tests_run: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub success_rate: f64,
    /// Wall-clock seconds for the whole run.
    pub total_time: f64,
}

/// Drives the executor over a filtered test list, one test at a time, and
/// feeds every outcome to the reporter.
pub struct TestRunner {
    executor: Box<dyn TestExecutor>,
}

impl TestRunner {
    pub fn new(executor: Box<dyn TestExecutor>) -> Self {
        Self { executor }
    }

    /// The reporter is locked once per callback, never across a test
    /// execution, so an interrupt handler can always acquire it and flush.
    pub fn run(
        &self,
        tests: &[TestInfo],
        reporter: &Mutex<RunReporter>,
        command: &str,
    ) -> RunStats {
        let run_start = Instant::now();
        lock(reporter).start_test_run(command, tests.len());

        let mut failures = 0;
        let mut errors = 0;
        let mut skipped = 0;

        for test in tests {
            lock(reporter).test_started(test);
            let test_start = Instant::now();
            let outcome = self.executor.execute(test);
            let duration = test_start.elapsed().as_secs_f64();

            let mut reporter = lock(reporter);
            match outcome {
                Outcome::Passed => reporter.record_success(test, duration),
                Outcome::Failed(error) => {
                    failures += 1;
                    reporter.record_failure(test, duration, error);
                }
                Outcome::Errored(error) => {
                    errors += 1;
                    reporter.record_error(test, duration, error);
                }
                Outcome::Skipped(reason) => {
                    skipped += 1;
                    reporter.record_skip(test, duration, reason);
                }
            }
        }

        let summary = lock(reporter).end_test_run();

        RunStats {
            tests_run: tests.len(),
            failures,
            errors,
            skipped,
            success_rate: summary.success_rate(),
            total_time: run_start.elapsed().as_secs_f64(),
        }
    }
}

fn lock(reporter: &Mutex<RunReporter>) -> MutexGuard<'_, RunReporter> {
    reporter.lock().unwrap_or_else(PoisonError::into_inner)
}
