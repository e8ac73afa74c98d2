//! Collaborator seams for the external test-execution framework
//!
//! Gauntlet does not load or run tests itself. Loading is delegated to a
//! [`TestLoader`] scoped to a single directory, and execution to a
//! [`TestExecutor`] invoked once per test. Both are trait objects so the
//! discovery engine and runner stay independent of any concrete framework.

use crate::discovery::TestInfo;
use crate::events::ErrorInfo;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by a loader for a single directory.
///
/// These never abort a discovery pass; the engine records them as warnings
/// and continues with the remaining directories.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// One entity produced by a loader: either a runnable test or a placeholder
/// for a module/fixture that failed to load.
///
/// Load failures are distinguished by this tag, never by sniffing type
/// names, and carry the loader's free-text description for best-effort
/// parsing downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveredEntity {
    Runnable(TestInfo),
    LoadFailure(String),
}

/// A node in the loader's nested suite structure (suites of suites of
/// cases). The discovery engine flattens this into individual entities.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteNode {
    Group(Vec<SuiteNode>),
    Leaf(DiscoveredEntity),
}

/// Directory-scoped discovery primitive of the execution framework.
pub trait TestLoader {
    /// Load every test entity in `directory` whose file name matches
    /// `pattern`. Must not recurse into subdirectories; the engine handles
    /// the directory tree itself.
    fn load(&self, directory: &Path, pattern: &str) -> Result<Vec<SuiteNode>, LoadError>;
}

/// Result of executing a single test.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(ErrorInfo),
    Errored(ErrorInfo),
    Skipped(String),
}

/// Executes one test entity to completion.
///
/// Implementations must be total: infrastructure problems (e.g. the
/// interpreter cannot be spawned) are reported as [`Outcome::Errored`],
/// never as a panic into the run loop.
pub trait TestExecutor: Send {
    fn execute(&self, test: &TestInfo) -> Outcome;
}

/// In-memory loader with a fixed set of entities per directory.
///
/// Useful for embedding and for exercising the discovery engine without a
/// real execution framework: entities registered for a directory are
/// returned for any pattern.
#[derive(Debug, Default)]
pub struct StaticLoader {
    suites: Vec<(PathBuf, Vec<SuiteNode>)>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the suite returned for `directory`.
    pub fn with_suite(mut self, directory: impl Into<PathBuf>, nodes: Vec<SuiteNode>) -> Self {
        self.suites.push((directory.into(), nodes));
        self
    }
}

impl TestLoader for StaticLoader {
    fn load(&self, directory: &Path, _pattern: &str) -> Result<Vec<SuiteNode>, LoadError> {
        Ok(self
            .suites
            .iter()
            .filter(|(dir, _)| dir == directory)
            .flat_map(|(_, nodes)| nodes.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{TestInfo, TestMetadata};

    fn runnable(name: &str, dir: &str) -> SuiteNode {
        SuiteNode::Leaf(DiscoveredEntity::Runnable(TestInfo {
            method_name: name.to_string(),
            class_name: "TestExample".to_string(),
            module_name: "test_example".to_string(),
            directory: PathBuf::from(dir),
            file_path: None,
            metadata: TestMetadata::default(),
        }))
    }

    #[test]
    fn test_static_loader_scopes_by_directory() {
        let loader = StaticLoader::new()
            .with_suite("/a", vec![runnable("test_one", "/a")])
            .with_suite("/b", vec![runnable("test_two", "/b")]);

        let nodes = loader.load(Path::new("/a"), "test*.py").unwrap();
        assert_eq!(nodes.len(), 1);

        let nodes = loader.load(Path::new("/c"), "test*.py").unwrap();
        assert!(nodes.is_empty());
    }
}
