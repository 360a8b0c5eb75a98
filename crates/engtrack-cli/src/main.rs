mod config;
mod console;
mod report;
mod session;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use engtrack_core::{
    ClientSelector, EngagementStore, MetricsEngine, MetricsOptions, SelectorOutcome,
};
use engtrack_store::JsonStore;

use crate::config::Settings;
use crate::console::Console;
use crate::session::Session;

#[derive(Parser)]
#[command(
    name = "engtrack",
    version,
    about = "Record and query security assessment engagements"
)]
struct Cli {
    /// Path to the engagements JSON file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable debug logging and extra report diagnostics
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (default)
    Menu,

    /// Complete metrics report, also written as CSV
    Metrics,

    /// Average users, live hosts and compromised users
    Averages,

    /// Client ratings sorted by client name
    Ratings,

    /// Show the records for one client (name or part of it)
    Show {
        /// Client name or case-insensitive fragment
        client: String,
    },

    /// Show current configuration
    Config,
}

/// WARN by default, DEBUG with `--debug`. A non-empty `RUST_LOG` replaces
/// either.
fn log_filter(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn init_tracing(debug: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(log_filter(debug, rust_log.as_deref()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    let settings = Settings::resolve(&cfg, cli.db, cli.debug);
    init_tracing(settings.debug);

    let store = JsonStore::new(&settings.db_path);
    let engine = MetricsEngine::new(MetricsOptions {
        debug: settings.debug,
    });

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let stdin = io::stdin();
            let console = Console::new(stdin.lock(), io::stdout());
            let mut session = Session::new(&store, engine, settings.csv_path.clone(), console);
            session.run()
        }
        Commands::Metrics => cmd_metrics(&store, &engine, &settings),
        Commands::Averages => cmd_averages(&store, &engine),
        Commands::Ratings => cmd_ratings(&store, &engine),
        Commands::Show { client } => cmd_show(&store, &client),
        Commands::Config => cmd_config(&settings),
    }
}

fn load(store: &JsonStore) -> Result<engtrack_core::Document> {
    let document = store
        .load()
        .with_context(|| format!("failed to load {}", store.path().display()))?;
    if let Some((stored, actual)) = document.count_mismatch() {
        eprintln!(
            "warning: metadata.totalRecords is {stored} but {actual} engagements are present"
        );
    }
    Ok(document)
}

fn cmd_metrics(store: &JsonStore, engine: &MetricsEngine, settings: &Settings) -> Result<()> {
    let document = load(store)?;
    let report = engine.complete_report(&document.engagements);
    let mut out = io::stdout().lock();
    report::print_report(&mut out, "Engagement Metrics", &report)?;
    report::write_csv(&settings.csv_path, &report)?;
    writeln!(out, "Report written to {}.", settings.csv_path.display())?;
    Ok(())
}

fn cmd_averages(store: &JsonStore, engine: &MetricsEngine) -> Result<()> {
    let document = load(store)?;
    let report = engine.averages_report(&document.engagements);
    report::print_report(&mut io::stdout().lock(), "Averages", &report)
}

fn cmd_ratings(store: &JsonStore, engine: &MetricsEngine) -> Result<()> {
    let document = load(store)?;
    let lines = engine.ratings_listing(&document.engagements);
    report::print_ratings(&mut io::stdout().lock(), &lines)
}

fn cmd_show(store: &JsonStore, client: &str) -> Result<()> {
    let document = load(store)?;
    let mut selector = ClientSelector::new(&document.engagements);
    let name = match selector.feed(client) {
        SelectorOutcome::Selected(name) => name,
        SelectorOutcome::Ambiguous(matches) => {
            bail!("'{client}' matches several clients: {}", matches.join(", "))
        }
        _ => bail!("no client matches '{client}'"),
    };

    let mut out = io::stdout().lock();
    for e in document.find_client(&name) {
        report::print_engagement(&mut out, e)?;
    }
    Ok(())
}

fn cmd_config(settings: &Settings) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!();
    println!("[store]");
    println!("  path = {}", settings.db_path.display());
    println!();
    println!("[report]");
    println!("  csv_path = {}", settings.csv_path.display());
    println!();
    println!("[debug]");
    println!("  enabled = {}", settings.debug);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults() {
        assert_eq!(log_filter(false, None).to_string(), "warn");
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(log_filter(false, Some("")).to_string(), "warn");
    }

    #[test]
    fn test_rust_log_overrides_default_level() {
        assert_eq!(log_filter(false, Some("debug")).to_string(), "debug");
        assert_eq!(log_filter(true, Some("error")).to_string(), "error");
        assert_eq!(
            log_filter(false, Some("engtrack_store=trace")).to_string(),
            "engtrack_store=trace"
        );
    }
}
