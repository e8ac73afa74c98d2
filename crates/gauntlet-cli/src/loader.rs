//! Text-scanning test loader for Python unittest files
//!
//! Loads test entities without an interpreter: each matching file is
//! line-scanned for `unittest.TestCase` subclasses, their `test_*` methods,
//! and category decorators. The resulting suite is nested the way the
//! execution framework nests it (directory suite, class suites, method
//! leaves) and gets flattened by the discovery engine.

use gauntlet_core::collab::{DiscoveredEntity, LoadError, SuiteNode, TestLoader};
use gauntlet_core::discovery::{TestInfo, TestMetadata};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static CLASS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").expect("class pattern is valid")
});

static METHOD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+def\s+(test\w*)\s*\(").expect("method pattern is valid"));

static DECORATOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w+)").expect("decorator pattern is valid"));

/// Loads unittest-style tests from Python source files in one directory.
#[derive(Debug, Default)]
pub struct ScriptLoader;

impl ScriptLoader {
    pub fn new() -> Self {
        Self
    }
}

impl TestLoader for ScriptLoader {
    fn load(&self, directory: &Path, pattern: &str) -> Result<Vec<SuiteNode>, LoadError> {
        let compiled = glob::Pattern::new(pattern)
            .map_err(|e| LoadError::Other(format!("invalid file pattern '{pattern}': {e}")))?;

        let entries = fs::read_dir(directory).map_err(|source| LoadError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|name| compiled.matches(name))
            })
            .collect();
        files.sort();

        Ok(files
            .iter()
            .map(|path| load_file(path, directory))
            .collect())
    }
}

/// Scan one file into a suite node. An unreadable file becomes a single
/// load-failure leaf instead of aborting the directory.
fn load_file(path: &Path, directory: &Path) -> SuiteNode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            return SuiteNode::Leaf(DiscoveredEntity::LoadFailure(format!(
                "{}: {e}",
                path.display()
            )));
        }
    };

    let module_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut classes: Vec<SuiteNode> = Vec::new();
    let mut current_class: Option<String> = None;
    let mut current_methods: Vec<SuiteNode> = Vec::new();
    let mut pending = TestMetadata::default();

    for line in source.lines() {
        if let Some(caps) = CLASS_PATTERN.captures(line) {
            if !current_methods.is_empty() {
                classes.push(SuiteNode::Group(std::mem::take(&mut current_methods)));
            }
            pending = TestMetadata::default();
            // A class without TestCase bases (including a paren-less one)
            // ends the current test-class scope.
            current_class = caps
                .get(2)
                .is_some_and(|bases| bases.as_str().contains("TestCase"))
                .then(|| caps[1].to_string());
            continue;
        }

        // A dedent back to a module-level def also ends the class scope.
        if line.starts_with("def ") {
            if !current_methods.is_empty() {
                classes.push(SuiteNode::Group(std::mem::take(&mut current_methods)));
            }
            current_class = None;
            pending = TestMetadata::default();
            continue;
        }

        if let Some(caps) = DECORATOR_PATTERN.captures(line) {
            apply_decorator(&mut pending, &caps[1]);
            continue;
        }

        if let Some(caps) = METHOD_PATTERN.captures(line) {
            if let Some(class_name) = &current_class {
                current_methods.push(SuiteNode::Leaf(DiscoveredEntity::Runnable(TestInfo {
                    method_name: caps[1].to_string(),
                    class_name: class_name.clone(),
                    module_name: module_name.clone(),
                    directory: directory.to_path_buf(),
                    file_path: Some(path.to_path_buf()),
                    metadata: std::mem::take(&mut pending),
                })));
            }
            pending = TestMetadata::default();
            continue;
        }

        // Any other non-blank line breaks a decorator chain.
        if !line.trim().is_empty() {
            pending = TestMetadata::default();
        }
    }

    if !current_methods.is_empty() {
        classes.push(SuiteNode::Group(current_methods));
    }

    SuiteNode::Group(classes)
}

fn apply_decorator(metadata: &mut TestMetadata, name: &str) {
    match name {
        "regression_test" => metadata.category = Some("regression".to_string()),
        "integration_test" => metadata.category = Some("integration".to_string()),
        "development_test" => metadata.category = Some("development".to_string()),
        "slow_test" => metadata.slow = true,
        "skip_ci" => metadata.skip_ci = true,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn flatten(node: &SuiteNode, out: &mut Vec<TestInfo>) {
        match node {
            SuiteNode::Group(children) => children.iter().for_each(|c| flatten(c, out)),
            SuiteNode::Leaf(DiscoveredEntity::Runnable(info)) => out.push(info.clone()),
            SuiteNode::Leaf(DiscoveredEntity::LoadFailure(_)) => {}
        }
    }

    fn load_tests(dir: &Path) -> Vec<TestInfo> {
        let nodes = ScriptLoader::new().load(dir, "test*.py").unwrap();
        let mut out = Vec::new();
        for node in &nodes {
            flatten(node, &mut out);
        }
        out
    }

    #[test]
    fn test_extracts_methods_and_decorators() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("test_sample.py"),
            r#"
import unittest
from gauntlet_support import regression_test, slow_test


class TestSample(unittest.TestCase):
    @regression_test
    def test_tagged(self):
        self.assertTrue(True)

    @slow_test
    @skip_ci
    def test_flagged(self):
        pass

    def test_plain(self):
        pass


class Helper:
    def test_not_a_test(self):
        pass
"#,
        )
        .unwrap();

        let tests = load_tests(dir.path());
        assert_eq!(tests.len(), 3);

        assert_eq!(tests[0].method_name, "test_tagged");
        assert_eq!(tests[0].class_name, "TestSample");
        assert_eq!(tests[0].module_name, "test_sample");
        assert_eq!(tests[0].metadata.category.as_deref(), Some("regression"));

        assert!(tests[1].metadata.slow);
        assert!(tests[1].metadata.skip_ci);
        assert_eq!(tests[1].metadata.category, None);

        assert!(tests[2].metadata.is_empty());
    }

    #[test]
    fn test_parenless_class_ends_test_class_scope() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("test_scope.py"),
            r#"
import unittest


class TestReal(unittest.TestCase):
    def test_counted(self):
        pass


class Helper:
    def test_shadow(self):
        pass
"#,
        )
        .unwrap();

        let tests = load_tests(dir.path());
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].method_name, "test_counted");
        assert_eq!(tests[0].class_name, "TestReal");
    }

    #[test]
    fn test_module_level_def_ends_test_class_scope() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("test_dedent.py"),
            r#"
class TestReal(unittest.TestCase):
    def test_counted(self):
        pass


def make_fixture():
    def test_inner(self):
        pass
    return test_inner
"#,
        )
        .unwrap();

        let tests = load_tests(dir.path());
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].method_name, "test_counted");
    }

    #[test]
    fn test_decorator_chain_broken_by_other_code() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("test_gap.py"),
            r#"
class TestGap(unittest.TestCase):
    @slow_test
    HELPER = object()

    def test_untagged(self):
        pass
"#,
        )
        .unwrap();

        let tests = load_tests(dir.path());
        assert_eq!(tests.len(), 1);
        assert!(tests[0].metadata.is_empty());
    }

    #[test]
    fn test_only_matching_files_are_scanned() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("test_real.py"),
            "class TestReal(unittest.TestCase):\n    def test_a(self):\n        pass\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("helpers.py"),
            "class TestHidden(unittest.TestCase):\n    def test_b(self):\n        pass\n",
        )
        .unwrap();

        let tests = load_tests(dir.path());
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].method_name, "test_a");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(ScriptLoader::new().load(&missing, "test*.py").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(ScriptLoader::new().load(dir.path(), "test[").is_err());
    }
}
