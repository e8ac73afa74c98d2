//! Command replay from recorded result files
//!
//! Re-runs the command that produced a result file, so a logged run can be
//! reproduced for debugging. JSON files carry the command inside `run_info`;
//! text files carry it on a `Command:` (or `Running:`) line.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::process::{Command, ExitCode};

/// Extract the recorded command from a result file. The file format is
/// chosen by extension: `.json` is parsed as a run document, anything else
/// is scanned as text.
pub fn extract_command(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read result file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let command = if is_json {
        command_from_json(&text, path)?
    } else {
        command_from_text(&text)
    };

    command.ok_or_else(|| anyhow!("no command found in {}", path.display()))
}

fn command_from_json(text: &str, path: &Path) -> Result<Option<String>> {
    let doc: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    // Current documents nest the command under execution; older ones kept
    // it directly on run_info.
    let command = doc["run_info"]["execution"]["command"]
        .as_str()
        .or_else(|| doc["run_info"]["command"].as_str())
        .map(str::to_string);
    Ok(command)
}

fn command_from_text(text: &str) -> Option<String> {
    text.lines().map(str::trim).find_map(|line| {
        line.strip_prefix("Running: ")
            .or_else(|| line.strip_prefix("Command: "))
            .map(str::to_string)
    })
}

/// Flags whose effects depend on the environment the command originally ran
/// in. The replay still executes; the caller is warned first.
pub fn compatibility_warnings(command: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    if command.contains("--log-append") {
        warnings.push("command appends to a log file and may grow it".to_string());
    } else if command.contains("--log-file") {
        warnings.push("command writes a log file and may overwrite it".to_string());
    }
    if command.contains("--path") {
        warnings.push("command names a repository path that must exist here".to_string());
    }
    warnings
}

/// Replay the command recorded in `file`. With `dry_run` the command is
/// printed but not executed.
pub fn run(file: &Path, dry_run: bool) -> Result<ExitCode> {
    let command = extract_command(file)?;

    for warning in compatibility_warnings(&command) {
        eprintln!("{} {warning}", "Warning:".yellow());
    }

    if dry_run {
        println!("Would execute: {command}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("recorded command is empty"))?;

    println!("Replaying: {command}");
    let status = Command::new(program)
        .args(parts)
        .status()
        .with_context(|| format!("failed to execute '{program}'"))?;

    match status.code() {
        Some(code) => Ok(ExitCode::from(u8::try_from(code).unwrap_or(1))),
        None => bail!("replayed command was terminated by a signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_extracts_command_from_json_execution_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{
  "run_info": {
    "summary": {"total_tests": 1},
    "execution": {"command": "gauntlet --category regression", "exit_code": 0}
  },
  "test_results": []
}"#,
        )
        .unwrap();

        let command = extract_command(&path).unwrap();
        assert_eq!(command, "gauntlet --category regression");
    }

    #[test]
    fn test_extracts_command_from_flat_run_info() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{"run_info": {"command": "gauntlet -v"}, "test_results": []}"#,
        )
        .unwrap();

        assert_eq!(extract_command(&path).unwrap(), "gauntlet -v");
    }

    #[test]
    fn test_extracts_command_from_text_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        fs::write(
            &path,
            "=== Gauntlet Test Run ===\nCommand: gauntlet --exclude-slow\nStarted: now\n",
        )
        .unwrap();

        assert_eq!(extract_command(&path).unwrap(), "gauntlet --exclude-slow");
    }

    #[test]
    fn test_extracts_command_from_running_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        fs::write(&path, "Running: gauntlet --format json\nStarted: now\n").unwrap();

        assert_eq!(extract_command(&path).unwrap(), "gauntlet --format json");
    }

    #[test]
    fn test_missing_command_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"run_info": null, "test_results": []}"#).unwrap();

        let err = extract_command(&path).unwrap_err();
        assert!(err.to_string().contains("no command found"));
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(extract_command(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_compatibility_warnings_flag_environment_sensitive_options() {
        assert!(compatibility_warnings("gauntlet").is_empty());
        assert_eq!(
            compatibility_warnings("gauntlet --log-file out.txt --path /repo").len(),
            2
        );
        assert_eq!(
            compatibility_warnings("gauntlet --log-file out.txt --log-append").len(),
            1
        );
    }
}
