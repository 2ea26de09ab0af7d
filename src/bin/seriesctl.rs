//! seriesctl - run selector statements against a series namespace
//!
//! Loads series names from a seed file into an in-memory namespace and
//! executes statements, printing one JSON document per statement.
//!
//! # Example Usage
//!
//! ```bash
//! # Statements as arguments
//! seriesctl --seed series.txt "list series /cpu.*/ - /cpu.idle/" "count series"
//!
//! # Statements from stdin, one per line
//! echo "list series name, type /.*/ limit 10" | seriesctl --seed series.txt
//!
//! # Validate a configuration file
//! seriesctl --config series.toml check-config
//! ```
//!
//! The seed file holds one series per line, optionally followed by a tab
//! and its type (`integer`, `float` or `string`; default `float`). Blank
//! lines and lines starting with `#` are skipped.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use series_select::config::ApplicationConfig;
use series_select::namespace::SeriesRegistry;
use series_select::query::QueryEngine;
use series_select::types::SeriesType;
use tracing::{debug, info, warn};

// =============================================================================
// CLI Definition
// =============================================================================

/// Run selector statements against a series namespace
#[derive(Parser)]
#[command(name = "seriesctl")]
#[command(version)]
#[command(about = "Evaluate chained series selectors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// File of series names to register before executing statements
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Statements to execute (read from stdin, one per line, when omitted)
    statements: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file and print a summary
    CheckConfig,
}

// =============================================================================
// Command Handlers
// =============================================================================

fn load_config(cli: &Cli) -> series_select::Result<ApplicationConfig> {
    match &cli.config {
        Some(path) => ApplicationConfig::load(path),
        None => ApplicationConfig::from_env(),
    }
}

/// Validate configuration and print summary
fn cmd_check_config(config: &ApplicationConfig) {
    println!("Configuration is valid!");
    println!();
    println!("Query Settings:");
    println!("  Default list_limit: {}", config.query.default_list_limit);
    println!("  Max list_limit: {}", config.query.max_list_limit);
    println!("  Max regex length: {}", config.query.max_regex_pattern_len);
    println!("  Parallel threshold: {}", config.query.parallel_threshold);
    println!();
    println!("Groups:");
    match &config.groups.path {
        Some(path) => println!("  File: {}", path.display()),
        None => println!("  File: (in-memory)"),
    }
    println!();
    println!("Log level: {}", config.logging.level);
}

/// Register every series listed in a seed file
fn seed_registry(registry: &SeriesRegistry, path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let mut registered = 0;

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, series_type) = match line.split_once('\t') {
            Some((name, ty)) => (name, parse_series_type(ty.trim()).ok_or_else(|| {
                format!("{}:{}: unknown series type '{}'", path.display(), line_no + 1, ty.trim())
            })?),
            None => (line, SeriesType::Float),
        };

        registry.get_or_register(name, series_type)?;
        registered += 1;
    }

    Ok(registered)
}

fn parse_series_type(s: &str) -> Option<SeriesType> {
    match s {
        "integer" => Some(SeriesType::Integer),
        "float" => Some(SeriesType::Float),
        "string" => Some(SeriesType::String),
        _ => None,
    }
}

/// Execute one statement and print its JSON output, returning success
fn run_statement(engine: &QueryEngine, statement: &str, pretty: bool) -> bool {
    let (rendered, ok) = match engine.execute(statement) {
        Ok(output) => (render(&output, pretty), true),
        Err(e) => (render(&json!({ "error": e.to_string() }), pretty), false),
    };

    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            warn!(error = %e, "failed to render output");
            return false;
        },
    }
    ok
}

fn render<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Some(Commands::CheckConfig) = &cli.command {
        cmd_check_config(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.logging.with_target)
        .with_writer(io::stderr)
        .init();

    let registry = Arc::new(SeriesRegistry::new());
    if let Some(seed) = &cli.seed {
        let registered = seed_registry(&registry, seed)?;
        info!(registered, path = %seed.display(), "seeded namespace");
    }

    let engine = QueryEngine::new(Arc::clone(&registry), &config)?;
    debug!(
        list_limit = engine.list_limit().get(),
        series = registry.len(),
        "engine ready"
    );

    let mut all_ok = true;
    if cli.statements.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            all_ok &= run_statement(&engine, &line, cli.pretty);
        }
    } else {
        for statement in &cli.statements {
            all_ok &= run_statement(&engine, statement, cli.pretty);
        }
    }

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
