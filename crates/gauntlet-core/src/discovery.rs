//! Test discovery and categorization
//!
//! Walks a repository for test-bearing directories, invokes the execution
//! collaborator's loader per directory, and buckets the results by
//! [`Category`]. Supports both hierarchical layouts (`tests/regression/`,
//! `tests/integration/`) and flat layouts with decorator-declared
//! categories.

use crate::category::Category;
use crate::collab::{DiscoveredEntity, SuiteNode, TestLoader};
use crate::import_error::ImportErrorRecord;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Default file pattern for test discovery.
pub const DEFAULT_PATTERN: &str = "test*.py";

/// Case variants probed for test directories under the root.
const DIR_VARIANTS: [&str; 4] = ["tests", "test", "Tests", "Test"];

/// Directory-name keywords that indicate a hierarchical layout.
const HIERARCHY_KEYWORDS: [&str; 4] = ["regression", "integration", "development", "unit"];

/// Category and execution flags attached to a test by the metadata
/// collaborator at discovery time. Absent flags mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub slow: bool,
    #[serde(default)]
    pub skip_ci: bool,
}

impl TestMetadata {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && !self.slow && !self.skip_ci
    }
}

/// A discovered runnable test entity.
///
/// Created once per discovery pass and replaced wholesale on the next one;
/// the category is never stored because [`categorize`] re-derives it from
/// the record alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestInfo {
    pub method_name: String,
    pub class_name: String,
    pub module_name: String,
    /// Immediate directory the test was discovered in.
    pub directory: PathBuf,
    pub file_path: Option<PathBuf>,
    pub metadata: TestMetadata,
}

impl TestInfo {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }
}

/// Categorized discovery result. Every category is present even when its
/// bucket is empty.
pub type DiscoveredTests = BTreeMap<Category, Vec<TestInfo>>;

/// Determine the category of a discovered test.
///
/// Deterministic and order-sensitive: decorator metadata wins over the
/// directory name, and the directory rule inspects the lowercased immediate
/// directory name for known substrings. Never fails; anything else is
/// [`Category::Uncategorized`].
pub fn categorize(test: &TestInfo) -> Category {
    if let Some(declared) = test.metadata.category.as_deref() {
        if let Some(category) = Category::from_keyword(declared) {
            return category;
        }
    }

    let dir_name = test
        .directory
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if dir_name.contains("regression") {
        Category::Regression
    } else if dir_name.contains("integration") {
        Category::Integration
    } else if dir_name.contains("development") || dir_name.contains("dev") {
        Category::Development
    } else {
        Category::Uncategorized
    }
}

/// Filtering criteria for [`DiscoveryEngine::filter`].
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Categories to include; `None` means no restriction.
    pub categories: Option<Vec<Category>>,
    pub exclude_slow: bool,
    pub exclude_ci: bool,
}

/// Core discovery engine.
///
/// Owns the discovered-test collection for its lifetime. Not safe for
/// concurrent mutation; callers needing concurrent discovery use separate
/// instances.
pub struct DiscoveryEngine {
    root: PathBuf,
    loader: Box<dyn TestLoader>,
    discovered: Vec<TestInfo>,
    import_errors: Vec<ImportErrorRecord>,
    warnings: Vec<String>,
    scanned: bool,
}

impl DiscoveryEngine {
    pub fn new(root: impl Into<PathBuf>, loader: Box<dyn TestLoader>) -> Self {
        Self {
            root: root.into(),
            loader,
            discovered: Vec::new(),
            import_errors: Vec::new(),
            warnings: Vec::new(),
            scanned: false,
        }
    }

    /// Discover all tests under the root, replacing any previous state.
    ///
    /// Never fails: an invalid pattern or a directory whose loader errors
    /// is recorded as a warning and the scan continues.
    pub fn discover(&mut self, pattern: &str) -> DiscoveredTests {
        self.discovered.clear();
        self.import_errors.clear();
        self.warnings.clear();
        self.scanned = true;

        let compiled = match Pattern::new(pattern) {
            Ok(compiled) => compiled,
            Err(e) => {
                self.warnings.push(format!("invalid file pattern '{pattern}': {e}"));
                return self.categorized();
            }
        };

        for directory in self.find_test_directories(&compiled) {
            match self.loader.load(&directory, pattern) {
                Ok(nodes) => {
                    for node in nodes {
                        self.collect(node, &directory);
                    }
                }
                Err(e) => {
                    self.warnings.push(format!(
                        "could not discover tests in {}: {e}",
                        directory.display()
                    ));
                }
            }
        }

        self.categorized()
    }

    /// Bucket the current discovered set by category.
    pub fn categorized(&self) -> DiscoveredTests {
        let mut buckets = empty_buckets();
        for test in &self.discovered {
            if let Some(bucket) = buckets.get_mut(&categorize(test)) {
                bucket.push(test.clone());
            }
        }
        buckets
    }

    /// Filter discovered tests, running discovery with the default pattern
    /// first if it has not happened yet.
    ///
    /// Category filtering uses inclusive-list semantics; slow/CI exclusion
    /// is default-permissive (an untagged test is never excluded).
    pub fn filter(&mut self, spec: &FilterSpec) -> Vec<TestInfo> {
        self.ensure_discovered();

        self.discovered
            .iter()
            .filter(|test| {
                if let Some(categories) = &spec.categories {
                    if !categories.contains(&categorize(test)) {
                        return false;
                    }
                }
                if spec.exclude_slow && test.metadata.slow {
                    return false;
                }
                if spec.exclude_ci && test.metadata.skip_ci {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Per-category test counts (lazy).
    pub fn test_count_summary(&mut self) -> BTreeMap<Category, usize> {
        self.ensure_discovered();
        self.categorized()
            .into_iter()
            .map(|(category, tests)| (category, tests.len()))
            .collect()
    }

    /// Whether any test directory name carries a known category keyword.
    pub fn supports_hierarchical_structure(&self) -> bool {
        let Ok(compiled) = Pattern::new(DEFAULT_PATTERN) else {
            return false;
        };

        self.find_test_directories(&compiled).iter().any(|dir| {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            HIERARCHY_KEYWORDS.iter().any(|keyword| name.contains(keyword))
        })
    }

    /// Whether any discovered test carries decorator metadata (lazy).
    pub fn supports_decorator_structure(&mut self) -> bool {
        self.ensure_discovered();
        self.discovered.iter().any(|test| !test.metadata.is_empty())
    }

    /// All discovered runnable tests, in discovery order.
    pub fn tests(&self) -> &[TestInfo] {
        &self.discovered
    }

    /// Load failures diverted out of the runnable set.
    pub fn import_errors(&self) -> &[ImportErrorRecord] {
        &self.import_errors
    }

    /// Warnings accumulated during the last discovery pass.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn ensure_discovered(&mut self) {
        if !self.scanned {
            self.discover(DEFAULT_PATTERN);
        }
    }

    fn collect(&mut self, node: SuiteNode, directory: &Path) {
        match node {
            SuiteNode::Group(children) => {
                for child in children {
                    self.collect(child, directory);
                }
            }
            SuiteNode::Leaf(DiscoveredEntity::Runnable(info)) => {
                self.discovered.push(info);
            }
            SuiteNode::Leaf(DiscoveredEntity::LoadFailure(description)) => {
                self.import_errors
                    .push(ImportErrorRecord::parse(&description, directory));
            }
        }
    }

    /// Find test-bearing directories: case variants of `tests`/`test`
    /// under the root, plus their immediate subdirectories (one level,
    /// skipping dot- and dunder-prefixed names). De-duplicated by resolved
    /// path so a directory reachable via multiple patterns is scanned once.
    fn find_test_directories(&self, pattern: &Pattern) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut directories = Vec::new();

        for variant in DIR_VARIANTS {
            let candidate = self.root.join(variant);
            if !candidate.is_dir() {
                continue;
            }

            try_add_directory(candidate.clone(), pattern, &mut seen, &mut directories);

            let Ok(entries) = fs::read_dir(&candidate) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') || name.starts_with("__") {
                    continue;
                }
                try_add_directory(path, pattern, &mut seen, &mut directories);
            }
        }

        directories
    }
}

/// Add `directory` if it has not been seen (by resolved path) and directly
/// contains at least one file matching the pattern.
fn try_add_directory(
    directory: PathBuf,
    pattern: &Pattern,
    seen: &mut BTreeSet<PathBuf>,
    out: &mut Vec<PathBuf>,
) {
    let resolved = fs::canonicalize(&directory).unwrap_or_else(|_| directory.clone());
    if seen.contains(&resolved) {
        return;
    }
    if contains_test_files(&directory, pattern) {
        seen.insert(resolved);
        out.push(directory);
    }
}

/// Existence check only; file contents are validated later during load.
/// Probe failures (permissions, transient I/O) are treated as absent.
fn contains_test_files(directory: &Path, pattern: &Pattern) -> bool {
    let Ok(entries) = fs::read_dir(directory) else {
        return false;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if pattern.matches(name) {
                return true;
            }
        }
    }
    false
}

fn empty_buckets() -> DiscoveredTests {
    Category::ALL
        .iter()
        .map(|category| (*category, Vec::new()))
        .collect()
}
