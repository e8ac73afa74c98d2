//! Discovery-summary documents
//!
//! Renders a categorized discovery result for file sinks, in text or JSON.
//! The JSON document is self-describing under a single `discovery_summary`
//! key and round-trips losslessly, non-ASCII test names included.

use crate::category::Category;
use crate::discovery::{DiscoveredTests, TestInfo};
use crate::writer::{FileFormat, OutputError};
use chrono::Local;
use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Render the text form. Verbosity 3 and above lists every test under its
/// category.
pub fn render_text(discovered: &DiscoveredTests, verbosity: u8) -> String {
    let total: usize = discovered.values().map(Vec::len).sum();
    let mut out = format!("Total tests discovered: {total}\n");

    for category in Category::ALL {
        let tests = discovered.get(&category).map(Vec::as_slice).unwrap_or(&[]);
        out.push_str(&format!("{}: {}\n", category.display_name(), tests.len()));

        if verbosity >= 3 {
            for test in tests {
                out.push_str(&format!("  {} ({})\n", test.full_name(), test.module_name));
            }
        }
    }

    out
}

fn test_entry(test: &TestInfo) -> Value {
    json!({
        "name": test.method_name,
        "class": test.class_name,
        "module": test.module_name,
        "file": test.file_path.as_ref().map(|p| p.display().to_string()),
    })
}

/// Render the JSON form. Verbosity 2 adds the uncategorized test list,
/// verbosity 3 the full per-category listing.
pub fn render_json(discovered: &DiscoveredTests, verbosity: u8) -> Value {
    let total: usize = discovered.values().map(Vec::len).sum();

    let mut categories = serde_json::Map::new();
    for category in Category::ALL {
        let count = discovered.get(&category).map(Vec::len).unwrap_or(0);
        categories.insert(category.as_str().to_string(), json!(count));
    }

    let mut summary = serde_json::Map::new();
    summary.insert("timestamp".to_string(), json!(Local::now().to_rfc3339()));
    summary.insert("total_tests".to_string(), json!(total));
    summary.insert("categories".to_string(), Value::Object(categories));

    if verbosity >= 2 {
        let uncategorized: Vec<Value> = discovered
            .get(&Category::Uncategorized)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(test_entry)
            .collect();
        summary.insert("uncategorized_tests".to_string(), Value::Array(uncategorized));
    }

    if verbosity >= 3 {
        let mut by_category = serde_json::Map::new();
        for category in Category::ALL {
            let tests: Vec<Value> = discovered
                .get(&category)
                .map(Vec::as_slice)
                .unwrap_or(&[])
                .iter()
                .map(test_entry)
                .collect();
            by_category.insert(category.as_str().to_string(), Value::Array(tests));
        }
        summary.insert("tests_by_category".to_string(), Value::Object(by_category));
    }

    json!({ "discovery_summary": Value::Object(summary) })
}

/// Write the discovery summary to `path`, creating parent directories.
pub fn write_discovery_report(
    path: &Path,
    format: FileFormat,
    verbosity: u8,
    append: bool,
    discovered: &DiscoveredTests,
) -> Result<(), OutputError> {
    let text = match format {
        FileFormat::Txt => render_text(discovered, verbosity),
        FileFormat::Json => {
            let mut doc =
                serde_json::to_string_pretty(&render_json(discovered, verbosity))
                    .unwrap_or_default();
            doc.push('\n');
            doc
        }
    };

    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(io_err)?;
    file.write_all(text.as_bytes()).map_err(io_err)
}
