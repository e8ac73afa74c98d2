//! Structured parsing of load-failure descriptions
//!
//! The execution framework reports a module or fixture that failed to load
//! as a placeholder entity carrying only a free-text description, e.g.
//! `setUpClass (test_installer.TestInstaller)`. Parsing is best-effort
//! pattern matching: two strategies are tried in order, and a description
//! neither matches degrades gracefully to the raw text.

use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Fixture-level failures: `<lifecycle-hook> (<module>.<class>)`.
static HOOK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(setUpClass|setUp|tearDown|tearDownClass)\s*\(([^.()\s]+)\.([^)]+)\)")
        .expect("hook pattern is valid")
});

/// Generic trailing `<module>.<class>` reference.
static CLASS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^.\s]+)\.([^.\s]+)$").expect("class pattern is valid"));

/// A module or class that failed before any test in it could run.
///
/// Not a runnable test: records in this bucket are reported separately so
/// operators can tell "test failed" apart from "test could not even load".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportErrorRecord {
    /// Raw description emitted by the execution framework.
    pub description: String,
    /// Lifecycle hook that failed, when the description named one.
    pub method_name: Option<String>,
    pub module_name: Option<String>,
    pub class_name: Option<String>,
    /// File name inferred from the module name.
    pub file_name: Option<String>,
    /// Human-readable message synthesized from the parsed fields.
    pub message: String,
    /// Directory the failure was discovered in.
    pub directory: PathBuf,
}

impl ImportErrorRecord {
    /// Parse a load-failure description reported in `directory`.
    pub fn parse(description: &str, directory: &Path) -> Self {
        if let Some(caps) = HOOK_PATTERN.captures(description) {
            let method = caps[1].to_string();
            let module = caps[2].to_string();
            let class = caps[3].to_string();
            let file = format!("{module}.py");
            return Self {
                description: description.to_string(),
                message: format!("{method} failed in {class} (check {file} for import issues)"),
                method_name: Some(method),
                module_name: Some(module),
                class_name: Some(class),
                file_name: Some(file),
                directory: directory.to_path_buf(),
            };
        }

        if let Some(caps) = CLASS_PATTERN.captures(description) {
            let module = caps[1].to_string();
            let class = caps[2].to_string();
            let file = format!("{module}.py");
            return Self {
                description: description.to_string(),
                message: format!("Import failed for {class} (check {file} for missing dependencies)"),
                method_name: None,
                module_name: Some(module),
                class_name: Some(class),
                file_name: Some(file),
                directory: directory.to_path_buf(),
            };
        }

        Self {
            description: description.to_string(),
            message: format!("Import error: {description}"),
            method_name: None,
            module_name: None,
            class_name: None,
            file_name: None,
            directory: directory.to_path_buf(),
        }
    }
}
