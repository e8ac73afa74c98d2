use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use colored::Colorize;
use gauntlet_core::discovery::{DiscoveredTests, DiscoveryEngine, FilterSpec};
use gauntlet_core::discovery_report::{render_json, render_text, write_discovery_report};
use gauntlet_core::observer::FileOutputConfig;
use gauntlet_core::reporter::{ConsoleFormat, ReporterConfig, RunReporter};
use gauntlet_core::runner::TestRunner;
use gauntlet_core::writer::FileFormat;
use gauntlet_core::Category;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod config;
mod executor;
mod loader;
mod repo;
mod replay;

/// Test orchestration for repository test suites.
///
/// Gauntlet discovers tests across repository layouts, classifies them into
/// regression, integration, and development categories, runs them through
/// the project's test framework, and reports results to the console and to
/// log files.
///
/// EXAMPLES:
///     gauntlet                          Run all tests
///     gauntlet --category regression    Run only regression tests
///     gauntlet --exclude-slow           Skip slow tests
///     gauntlet --format json            JSON console output
///     gauntlet --discover-only          Discover without running
///     gauntlet --replay run.json        Re-run a logged command
///
/// ENVIRONMENT VARIABLES:
///     GAUNTLET_JSON      Set to '1' for JSON output by default
///     GAUNTLET_NO_COLOR  Set to disable colored output
///     NO_COLOR           Set to disable colored output
#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(version)]
struct Cli {
    /// Test category to run
    #[arg(short, long, value_enum, default_value = "all")]
    category: CategoryArg,

    /// Exclude slow-running tests
    #[arg(long)]
    exclude_slow: bool,

    /// Exclude tests marked to skip in CI
    #[arg(long)]
    exclude_ci: bool,

    /// File pattern for test discovery
    #[arg(short, long, default_value = "test*.py")]
    pattern: String,

    /// Console output format
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Disable colored output
    #[arg(long, env = "GAUNTLET_NO_COLOR")]
    no_color: bool,

    /// Only discover tests, do not run them
    #[arg(long)]
    discover_only: bool,

    /// List available test categories and exit
    #[arg(long)]
    list_categories: bool,

    /// Path to repository root (default: detected from current directory)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Write results to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log file format
    #[arg(long, value_enum, default_value = "txt")]
    log_file_format: LogFormatArg,

    /// Log file detail level (1-3)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    log_verbosity: u8,

    /// Append to the log file instead of overwriting it
    #[arg(long)]
    log_append: bool,

    /// Replay the command recorded in a result file instead of discovering
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// With --replay, print the command without executing it
    #[arg(long, requires = "replay")]
    dry_run: bool,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except the run summary
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CategoryArg {
    Regression,
    Integration,
    Development,
    All,
}

impl CategoryArg {
    fn to_filter(self) -> Option<Vec<Category>> {
        match self {
            CategoryArg::Regression => Some(vec![Category::Regression]),
            CategoryArg::Integration => Some(vec![Category::Integration]),
            CategoryArg::Development => Some(vec![Category::Development]),
            CategoryArg::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Standard,
    Verbose,
    Json,
    Minimal,
}

impl From<FormatArg> for ConsoleFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Standard => ConsoleFormat::Standard,
            FormatArg::Verbose => ConsoleFormat::Verbose,
            FormatArg::Json => ConsoleFormat::Json,
            FormatArg::Minimal => ConsoleFormat::Minimal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Txt,
    Json,
}

impl From<LogFormatArg> for FileFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Txt => FileFormat::Txt,
            LogFormatArg::Json => FileFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let env_config = config::Config::from_env();
    if cli.no_color || env_config.no_color {
        colored::control::set_override(false);
    }

    if let Some(result_file) = &cli.replay {
        return replay::run(result_file, cli.dry_run);
    }

    let format = cli.format.unwrap_or(if env_config.default_json {
        FormatArg::Json
    } else {
        FormatArg::Standard
    });

    let root = match &cli.path {
        Some(path) => path.clone(),
        None => repo::detect_root(Path::new(".")).unwrap_or_else(|| PathBuf::from(".")),
    };
    if !root.exists() {
        bail!("path '{}' does not exist", root.display());
    }

    let mut engine = DiscoveryEngine::new(&root, Box::new(loader::ScriptLoader::new()));

    if cli.verbose > 0 && !cli.quiet {
        println!("Discovering tests in: {}", root.display());
    }
    let discovered = engine.discover(&cli.pattern);

    for warning in engine.warnings() {
        eprintln!("{} {warning}", "Warning:".yellow());
    }
    for record in engine.import_errors() {
        eprintln!("{} {}", "Warning:".yellow(), record.message);
    }

    if cli.list_categories {
        print_categories(&discovered, format, cli.quiet);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.discover_only {
        print_discovery_summary(&discovered, format, cli.verbose, cli.quiet);
        if let Some(log_file) = &cli.log_file {
            write_discovery_report(
                log_file,
                cli.log_file_format.into(),
                cli.log_verbosity,
                cli.log_append,
                &discovered,
            )
            .with_context(|| format!("failed to write {}", log_file.display()))?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let filtered = engine.filter(&FilterSpec {
        categories: cli.category.to_filter(),
        exclude_slow: cli.exclude_slow,
        exclude_ci: cli.exclude_ci,
    });
    if filtered.is_empty() {
        eprintln!(
            "{} No tests found matching the specified criteria",
            "Warning:".yellow()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let mut file_outputs = Vec::new();
    if let Some(log_file) = &cli.log_file {
        file_outputs.push(FileOutputConfig {
            filename: log_file.clone(),
            format: cli.log_file_format.into(),
            verbosity: cli.log_verbosity,
            append: cli.log_append,
        });
    }

    let reporter = Arc::new(Mutex::new(
        RunReporter::new(&ReporterConfig {
            format: format.into(),
            verbosity: (cli.verbose + 1).min(3),
            use_color: !(cli.no_color || env_config.no_color),
            quiet: cli.quiet,
            file_outputs,
        })
        .context("failed to set up test output")?,
    ));

    // Ctrl-C flushes whatever has been recorded so far and exits with the
    // conventional interrupt code.
    let interrupt_reporter = Arc::clone(&reporter);
    ctrlc::set_handler(move || {
        eprintln!("\n{} Test run interrupted", "Error:".red());
        lock_reporter(&interrupt_reporter).close();
        std::process::exit(130);
    })
    .context("failed to install interrupt handler")?;

    let command = std::env::args().collect::<Vec<_>>().join(" ");
    let runner = TestRunner::new(Box::new(executor::UnittestExecutor::new()));
    let stats = runner.run(&filtered, &reporter, &command);
    lock_reporter(&reporter).close();

    if stats.failures > 0 || stats.errors > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn lock_reporter(reporter: &Mutex<RunReporter>) -> MutexGuard<'_, RunReporter> {
    reporter.lock().unwrap_or_else(PoisonError::into_inner)
}

fn print_categories(discovered: &DiscoveredTests, format: FormatArg, quiet: bool) {
    if quiet {
        return;
    }

    let populated: Vec<(&Category, usize)> = discovered
        .iter()
        .filter(|(_, tests)| !tests.is_empty())
        .map(|(category, tests)| (category, tests.len()))
        .collect();

    if format == FormatArg::Json {
        let names: Vec<&str> = populated.iter().map(|(c, _)| c.as_str()).collect();
        println!("{}", serde_json::to_string(&names).unwrap_or_default());
        return;
    }

    println!("Available test categories:");
    for (category, count) in populated {
        println!("  {category} ({count} tests)");
    }
}

fn print_discovery_summary(
    discovered: &DiscoveredTests,
    format: FormatArg,
    verbosity: u8,
    quiet: bool,
) {
    if quiet {
        return;
    }

    if format == FormatArg::Json {
        let doc = render_json(discovered, verbosity.max(1));
        println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        return;
    }

    println!("{}", "Test Discovery Summary".cyan());
    println!("{}", "=".repeat(40).cyan());
    print!("{}", render_text(discovered, verbosity.max(1)));
}
