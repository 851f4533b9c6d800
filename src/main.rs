//! webtrawl entry point
//!
//! Command-line interface for the polite multi-worker web crawler.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webtrawl::config::load_config;
use webtrawl::controller::{open_store, Controller};
use webtrawl::storage::Store;

/// webtrawl: a polite, depth-bounded web crawler
#[derive(Parser, Debug)]
#[command(name = "webtrawl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A polite multi-worker web crawler", long_about = None)]
struct Cli {
    /// URL to seed the frontier with if it's empty
    #[arg(value_name = "SEED_URL", default_value = "https://example.com/")]
    seed_url: String,

    /// Number of concurrent worker tasks
    #[arg(value_name = "NUM_WORKERS", default_value_t = 6)]
    num_workers: usize,

    /// Maximum link depth to follow from the seed
    #[arg(value_name = "MAX_DEPTH", default_value_t = 2)]
    max_depth: u32,

    /// Path to TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("loading configuration from {}", path.display());
            load_config(path).with_context(|| format!("loading config from {}", path.display()))?
        }
        None => {
            tracing::info!("no --config given, using defaults");
            webtrawl::Config::default()
        }
    };

    let db_path = PathBuf::from(&config.output.database_path);
    let store = open_store(&db_path)
        .with_context(|| format!("opening store at {}", db_path.display()))?;

    let mut controller = Controller::new(config, true);
    let initial_stats = store.stats().context("reading initial frontier stats")?;
    if initial_stats.pending == 0 && initial_stats.in_progress == 0 {
        controller
            .add_seed(&store, &cli.seed_url)
            .with_context(|| format!("seeding frontier with {}", cli.seed_url))?;
        tracing::info!(seed = %cli.seed_url, "seeded frontier");
    }

    controller
        .start(cli.num_workers, cli.max_depth)
        .context("starting worker pool")?;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {
                let stats = store.stats().context("reading frontier stats")?;
                tracing::info!(
                    pending = stats.pending,
                    in_progress = stats.in_progress,
                    done = stats.done,
                    failed = stats.failed,
                    "progress"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("caught interrupt, shutting down");
                break;
            }
        }
    }

    controller.stop().await;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webtrawl=info,warn"),
            1 => EnvFilter::new("webtrawl=debug,info"),
            2 => EnvFilter::new("webtrawl=trace,debug"),
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
