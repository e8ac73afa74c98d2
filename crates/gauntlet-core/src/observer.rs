//! Event observers
//!
//! Observers receive every [`TestEvent`] in publication order and render it
//! to their destination. The console observer writes synchronously; file
//! observers hand off to a background writer so disk latency never stalls
//! the run loop.

use crate::events::{TestEvent, TestStatus};
use crate::strategy::OutputStrategy;
use crate::writer::{FileFormat, OutputError, ThreadedFileWriter};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

/// A destination for run events.
///
/// An error return marks this observer broken; the publisher reports it and
/// keeps notifying the others. Observers are `Send` so a whole reporter can
/// be handed to an interrupt handler.
pub trait Observer: Send {
    fn on_event(&mut self, event: &TestEvent) -> Result<(), OutputError>;

    /// Flush and release resources. Must be idempotent.
    fn close(&mut self) -> Result<(), OutputError>;
}

/// Synchronous stdout observer.
pub struct ConsoleObserver {
    strategy: Box<dyn OutputStrategy>,
    verbosity: u8,
    use_color: bool,
    quiet: bool,
}

impl ConsoleObserver {
    pub fn new(strategy: Box<dyn OutputStrategy>, verbosity: u8, use_color: bool, quiet: bool) -> Self {
        Self {
            strategy,
            verbosity,
            use_color,
            quiet,
        }
    }

    fn colorize(&self, text: String, status: TestStatus) -> String {
        if !self.use_color {
            return text;
        }
        match status {
            TestStatus::Pass => text.green().to_string(),
            TestStatus::Fail | TestStatus::Error => text.red().to_string(),
            TestStatus::Skip => text.yellow().to_string(),
        }
    }
}

impl Observer for ConsoleObserver {
    fn on_event(&mut self, event: &TestEvent) -> Result<(), OutputError> {
        if self.quiet && !matches!(event, TestEvent::RunEnd(_)) {
            return Ok(());
        }

        match event {
            TestEvent::RunStart {
                command,
                start_time,
                ..
            } => {
                println!("{}", self.strategy.format_header(command, start_time));
            }
            TestEvent::TestStart { name, classname } => {
                if self.verbosity >= 2 {
                    print!("Starting {classname}.{name}... ");
                    let _ = std::io::stdout().flush();
                }
            }
            TestEvent::TestEnd(result) => {
                let text = self.strategy.format_test_result(result, self.verbosity);
                println!("{}", self.colorize(text, result.status));
            }
            TestEvent::RunEnd(summary) => {
                println!("{}", self.strategy.format_run_summary(summary));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Configuration for one file sink.
#[derive(Debug, Clone)]
pub struct FileOutputConfig {
    pub filename: PathBuf,
    pub format: FileFormat,
    /// Detail tier, 1 through 3.
    pub verbosity: u8,
    pub append: bool,
}

impl FileOutputConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            format: FileFormat::Txt,
            verbosity: 1,
            append: false,
        }
    }
}

/// Observer that forwards events to a [`ThreadedFileWriter`].
pub struct FileObserver {
    writer: ThreadedFileWriter,
}

impl FileObserver {
    pub fn create(config: &FileOutputConfig) -> Result<Self, OutputError> {
        let writer = ThreadedFileWriter::create(
            &config.filename,
            config.format,
            config.verbosity,
            config.append,
        )?;
        Ok(Self { writer })
    }
}

impl Observer for FileObserver {
    fn on_event(&mut self, event: &TestEvent) -> Result<(), OutputError> {
        match event {
            TestEvent::RunStart {
                command,
                start_time,
                ..
            } => self.writer.write_header(command, &start_time.to_rfc3339()),
            TestEvent::TestStart { .. } => Ok(()),
            TestEvent::TestEnd(result) => self.writer.write_test_result(result.clone()),
            TestEvent::RunEnd(summary) => self.writer.write_summary(summary.clone()),
        }
    }

    fn close(&mut self) -> Result<(), OutputError> {
        self.writer.close()
    }
}
