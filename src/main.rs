//! Feed-Harvest main entry point
//!
//! This is the command-line interface for the Feed-Harvest ingestion pipeline.

use anyhow::Context;
use clap::Parser;
use feed_harvest::config::{load_config_from_env, load_config_with_hash, Config};
use feed_harvest::crawler::{AutomationDriver, WebDriverClient};
use feed_harvest::extractor::{Extractor, OllamaClient};
use feed_harvest::output::{load_statistics, print_statistics, print_store_statistics};
use feed_harvest::run_pipeline;
use feed_harvest::storage::open_store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Feed-Harvest: rental-post ingestion pipeline
///
/// Scrolls a social feed group for a fixed number of cycles, extracts a
/// structured listing from every post it has not seen before, and stores
/// the result.
#[derive(Parser, Debug)]
#[command(name = "feed-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Harvest rental listings from a social feed", long_about = None)]
struct Cli {
    /// Number of scroll cycles to run
    #[arg(value_name = "CYCLES", required_unless_present = "stats")]
    cycles: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH", default_value = "feed-harvest.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Number of extraction workers (default: one per two cycles)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    workers: Option<u64>,

    /// Crawl and extract, but keep records in memory instead of the database
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the number of stored listings and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; values may come from the real environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(&cli.config)?;

    if cli.stats {
        return handle_stats(&config).await;
    }

    let cycles = cli.cycles.unwrap_or_default();
    let workers = cli
        .workers
        .map(|n| n as usize)
        .unwrap_or_else(|| config.workers.resolve(cycles));

    handle_harvest(&config, cycles, workers, cli.dry_run).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("feed_harvest=info,warn"),
            1 => EnvFilter::new("feed_harvest=debug,info"),
            2 => EnvFilter::new("feed_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file, or the environment alone when there is no file
fn load_configuration(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        tracing::info!("Loading configuration from: {}", path.display());
        let (config, hash) = load_config_with_hash(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
        Ok(config)
    } else {
        tracing::info!(
            "No configuration file at {}; using defaults and environment",
            path.display()
        );
        load_config_from_env().context("Failed to load configuration from environment")
    }
}

/// Handles the --stats mode: shows how many listings are stored
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path), false)?;
    let stats = load_statistics(store.as_ref()).await?;
    print_store_statistics(&stats);

    Ok(())
}

/// Handles the main harvest run
async fn handle_harvest(
    config: &Config,
    cycles: u32,
    workers: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} with {} cycle(s) and {} worker(s)",
        config.feed.group_url,
        cycles,
        workers
    );

    let store = open_store(Path::new(&config.output.database_path), dry_run)
        .context("Failed to open record store")?;

    let inference = OllamaClient::new(&config.extractor)?;
    tracing::info!("Using inference endpoint {}", inference.endpoint());
    let extractor = Arc::new(Extractor::from_config(
        Arc::new(inference),
        &config.extractor,
    ));

    let driver: Arc<dyn AutomationDriver> = Arc::new(
        WebDriverClient::connect(&config.webdriver)
            .await
            .with_context(|| {
                format!("Failed to start a browser session at {}", config.webdriver.url)
            })?,
    );

    let stats = run_pipeline(driver, extractor, store, config, cycles, workers).await?;
    print_statistics(&stats);

    Ok(())
}
