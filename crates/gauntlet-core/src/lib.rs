//! Gauntlet test orchestration core
//!
//! Provides the discovery and reporting machinery behind the `gauntlet` CLI:
//! - Test discovery and categorization across repository layouts
//!   ([`discovery::DiscoveryEngine`])
//! - An event-driven reporting pipeline (publisher, observers, output
//!   strategies) that serves a synchronous console sink and threaded file
//!   sinks from one event stream
//! - Trait seams for the execution collaborators that actually load and run
//!   tests ([`collab::TestLoader`], [`collab::TestExecutor`])
//!
//! # Example
//!
//! ```no_run
//! use gauntlet_core::collab::StaticLoader;
//! use gauntlet_core::discovery::{DiscoveryEngine, DEFAULT_PATTERN};
//!
//! let mut engine = DiscoveryEngine::new(".", Box::new(StaticLoader::default()));
//! let discovered = engine.discover(DEFAULT_PATTERN);
//! for (category, tests) in &discovered {
//!     println!("{category}: {}", tests.len());
//! }
//! ```

pub mod category;
pub mod collab;
pub mod discovery;
pub mod discovery_report;
pub mod events;
pub mod import_error;
pub mod observer;
pub mod publisher;
pub mod reporter;
pub mod runner;
pub mod strategy;
pub mod writer;

pub use category::Category;
pub use collab::{DiscoveredEntity, LoadError, Outcome, SuiteNode, TestExecutor, TestLoader};
pub use discovery::{categorize, DiscoveredTests, DiscoveryEngine, FilterSpec, TestInfo, TestMetadata};
pub use events::{ErrorInfo, TestEvent, TestResult, TestRunSummary, TestStatus};
pub use import_error::ImportErrorRecord;
pub use observer::{ConsoleObserver, FileObserver, FileOutputConfig, Observer};
pub use publisher::EventPublisher;
pub use reporter::{ConsoleFormat, ReporterConfig, RunReporter};
pub use runner::{RunStats, TestRunner};
pub use strategy::{JsonStrategy, OutputStrategy, StandardStrategy, VerboseStrategy};
pub use writer::{FileFormat, OutputError, ThreadedFileWriter};
