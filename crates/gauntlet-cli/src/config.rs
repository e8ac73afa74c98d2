//! CLI configuration via environment variables
//!
//! Gauntlet uses environment variables for optional defaults; command-line
//! flags always win over them.

use std::env;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (GAUNTLET_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Default to JSON console output (GAUNTLET_JSON=1)
    pub default_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var("GAUNTLET_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
            default_json: env::var("GAUNTLET_JSON")
                .map(|v| {
                    let lower = v.to_lowercase();
                    !(lower == "0" || lower == "false" || lower == "off")
                })
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
