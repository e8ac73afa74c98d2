//! Threaded file writing
//!
//! Each file sink owns exactly one [`ThreadedFileWriter`]: a bounded
//! `std::sync::mpsc` queue drained by a single worker thread, so event
//! handling never blocks on disk I/O while per-sink write order stays FIFO.
//!
//! Text sinks write each result as it arrives and append the summary block
//! at run end. JSON sinks buffer every result and emit one well-formed
//! document when the channel closes, so an interrupted run still leaves a
//! parseable file (with `run_info: null` when no summary arrived).

use crate::events::{serialize_run_document, TestResult, TestRunSummary};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Queue capacity per writer. Senders block briefly rather than grow the
/// queue without bound when the disk falls behind.
const QUEUE_CAPACITY: usize = 1000;

/// On-disk format of a file sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Txt,
    Json,
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(FileFormat::Txt),
            "json" => Ok(FileFormat::Json),
            other => Err(format!("unknown log file format: {other}")),
        }
    }
}

/// Failures of a file sink. Fatal to that sink only; the publisher keeps
/// the other observers running.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file writer for {path} is closed")]
    WriterClosed { path: PathBuf },

    #[error("file writer thread for {path} panicked")]
    WorkerPanicked { path: PathBuf },
}

/// One queued write.
enum WriteOp {
    Header { command: String, start_time: String },
    Result(TestResult),
    Summary(TestRunSummary),
}

/// Background file writer with a single worker thread.
///
/// `close` is a synchronization barrier: it drops the sender, which lets
/// the worker drain the queue, finish the file, and exit; the join then
/// surfaces any deferred I/O error. Dropping the writer without closing
/// performs the same drain but discards the error.
pub struct ThreadedFileWriter {
    path: PathBuf,
    sender: Option<SyncSender<WriteOp>>,
    worker: Option<JoinHandle<Result<(), OutputError>>>,
}

impl ThreadedFileWriter {
    /// Open `path` (creating parent directories) and start the worker.
    pub fn create(
        path: impl Into<PathBuf>,
        format: FileFormat,
        verbosity: u8,
        append: bool,
    ) -> Result<Self, OutputError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| OutputError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|source| OutputError::Io {
                path: path.clone(),
                source,
            })?;

        let (sender, receiver) = mpsc::sync_channel(QUEUE_CAPACITY);
        let worker_path = path.clone();
        let worker = thread::Builder::new()
            .name(format!(
                "file-writer-{}",
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ))
            .spawn(move || {
                let mut sink = FileSink {
                    path: worker_path,
                    file,
                    format,
                    verbosity,
                    results: Vec::new(),
                    summary: None,
                };
                for op in receiver {
                    sink.apply(op)?;
                }
                sink.finish()
            })
            .map_err(|source| OutputError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_header(&self, command: &str, start_time: &str) -> Result<(), OutputError> {
        self.send(WriteOp::Header {
            command: command.to_string(),
            start_time: start_time.to_string(),
        })
    }

    pub fn write_test_result(&self, result: TestResult) -> Result<(), OutputError> {
        self.send(WriteOp::Result(result))
    }

    pub fn write_summary(&self, summary: TestRunSummary) -> Result<(), OutputError> {
        self.send(WriteOp::Summary(summary))
    }

    /// Drain the queue, finish the file, and join the worker. Idempotent.
    pub fn close(&mut self) -> Result<(), OutputError> {
        self.sender.take();
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| OutputError::WorkerPanicked {
                path: self.path.clone(),
            })?,
            None => Ok(()),
        }
    }

    fn send(&self, op: WriteOp) -> Result<(), OutputError> {
        let sender = self.sender.as_ref().ok_or_else(|| OutputError::WriterClosed {
            path: self.path.clone(),
        })?;
        sender.send(op).map_err(|_| OutputError::WriterClosed {
            path: self.path.clone(),
        })
    }
}

impl Drop for ThreadedFileWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Worker-side state: the open file plus buffered results for the final
/// document.
struct FileSink {
    path: PathBuf,
    file: File,
    format: FileFormat,
    verbosity: u8,
    results: Vec<TestResult>,
    summary: Option<TestRunSummary>,
}

impl FileSink {
    fn apply(&mut self, op: WriteOp) -> Result<(), OutputError> {
        match op {
            WriteOp::Header {
                command,
                start_time,
            } => {
                if self.format == FileFormat::Txt {
                    let header = format!(
                        "=== Gauntlet Test Run ===\nCommand: {command}\nStarted: {start_time}\n\n"
                    );
                    self.write_str(&header)?;
                }
                Ok(())
            }
            WriteOp::Result(result) => {
                if self.format == FileFormat::Txt {
                    self.write_text_result(&result)?;
                }
                self.results.push(result);
                Ok(())
            }
            WriteOp::Summary(summary) => {
                self.summary = Some(summary);
                Ok(())
            }
        }
    }

    /// Final output after the channel closes.
    fn finish(&mut self) -> Result<(), OutputError> {
        match self.format {
            FileFormat::Json => {
                let document =
                    serialize_run_document(&self.results, self.summary.as_ref(), self.verbosity);
                let text = serde_json::to_string_pretty(&document).unwrap_or_default();
                self.write_str(&text)?;
                self.write_str("\n")?;
            }
            FileFormat::Txt => {
                if let Some(summary) = self.summary.take() {
                    let block = format!(
                        "\n=== Summary ===\nTotal: {}\nPassed: {}\nFailed: {}\nErrors: {}\nSkipped: {}\nSuccess Rate: {:.1}%\nExit Code: {}\n",
                        summary.total_tests,
                        summary.passed,
                        summary.failed,
                        summary.errors,
                        summary.skipped,
                        summary.success_rate(),
                        summary.exit_code,
                    );
                    self.write_str(&block)?;
                }
            }
        }
        self.file.flush().map_err(|source| OutputError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn write_text_result(&mut self, result: &TestResult) -> Result<(), OutputError> {
        let mut text = format!(
            "{} {}.{} ({:.3}s)\n",
            result.status.as_str(),
            result.classname,
            result.name,
            result.duration
        );

        if self.verbosity >= 2 {
            if let Some(error) = &result.error_info {
                text.push_str(&format!(
                    "    Error: {}: {}\n",
                    error.error_type, error.message
                ));
                if self.verbosity >= 3 {
                    let lines: Vec<&str> = error.traceback.lines().collect();
                    for line in lines.iter().take(5).filter(|l| !l.trim().is_empty()) {
                        text.push_str(&format!("    {line}\n"));
                    }
                    if lines.len() > 5 {
                        text.push_str("    ... (traceback truncated)\n");
                    }
                }
            }
        }

        self.write_str(&text)
    }

    fn write_str(&mut self, text: &str) -> Result<(), OutputError> {
        self.file
            .write_all(text.as_bytes())
            .map_err(|source| OutputError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::TestMetadata;
    use crate::events::{ErrorInfo, TestStatus};
    use chrono::Local;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn result(name: &str, status: TestStatus) -> TestResult {
        TestResult {
            name: name.to_string(),
            classname: "TestSuite".to_string(),
            status,
            duration: 0.1,
            timestamp: Local::now(),
            metadata: TestMetadata::default(),
            error_info: None,
            skip_reason: None,
        }
    }

    fn summary(total: usize, passed: usize, failed: usize) -> TestRunSummary {
        TestRunSummary {
            total_tests: total,
            passed,
            failed,
            errors: 0,
            skipped: 0,
            duration: 1.0,
            start_time: Local::now(),
            end_time: Local::now(),
            command: "gauntlet".to_string(),
            exit_code: i32::from(failed > 0),
        }
    }

    #[test]
    fn test_text_sink_writes_results_and_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.txt");

        let mut writer =
            ThreadedFileWriter::create(&path, FileFormat::Txt, 1, false).unwrap();
        writer.write_header("gauntlet --category all", "2026-01-01T00:00:00").unwrap();
        writer.write_test_result(result("test_a", TestStatus::Pass)).unwrap();
        writer.write_test_result(result("test_b", TestStatus::Fail)).unwrap();
        writer.write_summary(summary(2, 1, 1)).unwrap();
        writer.close().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("=== Gauntlet Test Run ==="));
        assert!(text.contains("PASS TestSuite.test_a (0.100s)"));
        assert!(text.contains("FAIL TestSuite.test_b (0.100s)"));
        assert!(text.contains("=== Summary ==="));
        assert!(text.contains("Exit Code: 1"));
    }

    #[test]
    fn test_close_drains_all_queued_results() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.txt");

        let mut writer =
            ThreadedFileWriter::create(&path, FileFormat::Txt, 1, false).unwrap();
        for i in 0..100 {
            writer
                .write_test_result(result(&format!("test_{i:03}"), TestStatus::Pass))
                .unwrap();
        }
        writer.close().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 100);
        assert!(text.contains("test_099"));
    }

    #[test]
    fn test_json_sink_emits_single_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut writer =
            ThreadedFileWriter::create(&path, FileFormat::Json, 2, false).unwrap();
        let mut failed = result("test_bad", TestStatus::Fail);
        failed.error_info = Some(ErrorInfo {
            error_type: "ValueError".to_string(),
            message: "naïve input: héllo".to_string(),
            traceback: String::new(),
        });
        writer.write_test_result(result("test_good", TestStatus::Pass)).unwrap();
        writer.write_test_result(failed).unwrap();
        writer.write_summary(summary(2, 1, 1)).unwrap();
        writer.close().unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["run_info"]["summary"]["total_tests"], 2);
        assert_eq!(doc["test_results"].as_array().unwrap().len(), 2);
        assert_eq!(
            doc["test_results"][1]["error_info"]["message"],
            "naïve input: héllo"
        );
    }

    #[test]
    fn test_json_sink_without_summary_still_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");

        let mut writer =
            ThreadedFileWriter::create(&path, FileFormat::Json, 1, false).unwrap();
        writer.write_test_result(result("test_a", TestStatus::Pass)).unwrap();
        writer.close().unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc["run_info"].is_null());
        assert_eq!(doc["test_results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_append_mode_preserves_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "previous run\n").unwrap();

        let mut writer = ThreadedFileWriter::create(&path, FileFormat::Txt, 1, true).unwrap();
        writer.write_test_result(result("test_a", TestStatus::Pass)).unwrap();
        writer.close().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("previous run\n"));
        assert!(text.contains("test_a"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.txt");

        let mut writer =
            ThreadedFileWriter::create(&path, FileFormat::Txt, 1, false).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.write_summary(summary(0, 0, 0)).is_err());
    }
}
