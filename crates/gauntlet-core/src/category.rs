//! Organizational test categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organizational bucket a discovered test belongs to.
///
/// Every successfully discovered test has exactly one category. Load
/// failures live in a separate import-error bucket and are never a peer of
/// these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Regression,
    Integration,
    Development,
    Uncategorized,
}

impl Category {
    /// All categories, in reporting order.
    pub const ALL: [Category; 4] = [
        Category::Regression,
        Category::Integration,
        Category::Development,
        Category::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Regression => "regression",
            Category::Integration => "integration",
            Category::Development => "development",
            Category::Uncategorized => "uncategorized",
        }
    }

    /// Capitalized form used in text reports ("Regression:").
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Regression => "Regression",
            Category::Integration => "Integration",
            Category::Development => "Development",
            Category::Uncategorized => "Uncategorized",
        }
    }

    /// Parse an explicitly declared category name, e.g. from decorator
    /// metadata or a CLI flag. Unknown names are rejected rather than
    /// defaulted so callers can decide the fallback.
    pub fn from_keyword(keyword: &str) -> Option<Category> {
        match keyword.to_lowercase().as_str() {
            "regression" => Some(Category::Regression),
            "integration" => Some(Category::Integration),
            "development" => Some(Category::Development),
            "uncategorized" => Some(Category::Uncategorized),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_keyword(s).ok_or_else(|| format!("unknown test category: {s}"))
    }
}
