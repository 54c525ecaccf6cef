//! scholar-harvest - incremental Google Scholar result harvester
//!
//! ## Usage
//!
//! ### Bounded parallel run
//! ```bash
//! scholar-harvest scrape "https://scholar.google.com/scholar?q=graph+neural+networks" --num-pages 10
//! ```
//!
//! ### Sequential run until results run out
//! ```bash
//! scholar-harvest follow --max-pages 50
//! ```
//!
//! ### Re-render the bibliography only
//! ```bash
//! scholar-harvest bib
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scholar_harvest::{
    bibtex,
    config::{RunConfig, DEFAULT_BIBLIOGRAPHY_PATH, DEFAULT_DATASET_PATH, DEFAULT_TARGET_URL},
    fetch::HttpFetcher,
    runner::{self, RunSummary},
    store::DatasetStore,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Scrape Google Scholar search results into a CSV dataset and a BibTeX file
#[derive(Parser)]
#[command(name = "scholar-harvest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Dataset CSV file (created if missing, resumed if present)
    #[arg(long, global = true, default_value = DEFAULT_DATASET_PATH)]
    data: PathBuf,

    /// BibTeX output file (overwritten at the end of every run)
    #[arg(long, global = true, default_value = DEFAULT_BIBLIOGRAPHY_PATH)]
    bib: PathBuf,

    /// Proxy URL (e.g., socks5://127.0.0.1:9050)
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// Minimum wait before each page fetch, in seconds
    #[arg(long, global = true, default_value = "2")]
    min_wait: f64,

    /// Maximum wait before each page fetch, in seconds
    #[arg(long, global = true, default_value = "5")]
    max_wait: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a fixed number of pages concurrently
    Scrape {
        /// The Google Scholar search URL to scrape
        #[arg(default_value = DEFAULT_TARGET_URL)]
        url: String,

        /// Number of pages to scrape
        #[arg(long, default_value = "10")]
        num_pages: u32,

        /// Maximum number of parallel workers
        #[arg(long, default_value = "5")]
        max_workers: usize,

        /// Skip fetching each result's own page
        #[arg(long)]
        no_details: bool,
    },

    /// Scrape one page at a time until the results run out
    Follow {
        /// The Google Scholar search URL to scrape
        #[arg(default_value = DEFAULT_TARGET_URL)]
        url: String,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Fetch each result's own page for abstract, keywords and DOI
        #[arg(long)]
        details: bool,

        /// Give up after this many failed pages in a row
        #[arg(long, default_value = "3")]
        max_failures: u32,
    },

    /// Regenerate the BibTeX file from the dataset
    Bib,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let base = RunConfig {
        dataset_path: cli.data,
        bibliography_path: cli.bib,
        proxy: cli.proxy,
        min_wait_seconds: cli.min_wait,
        max_wait_seconds: cli.max_wait,
        ..Default::default()
    };

    match cli.command {
        Commands::Scrape {
            url,
            num_pages,
            max_workers,
            no_details,
        } => {
            let config = RunConfig {
                target_url: url,
                page_count: num_pages,
                concurrency: max_workers,
                detail_enrichment_enabled: !no_details,
                ..base
            };
            run(config, Mode::Bounded).await
        }
        Commands::Follow {
            url,
            max_pages,
            details,
            max_failures,
        } => {
            let config = RunConfig {
                target_url: url,
                max_pages,
                detail_enrichment_enabled: details,
                max_consecutive_failures: max_failures,
                ..base
            };
            run(config, Mode::Sequential).await
        }
        Commands::Bib => {
            let store = DatasetStore::load(&base.dataset_path)
                .with_context(|| format!("Failed to load {}", base.dataset_path.display()))?;
            let written = bibtex::write_bibliography(&base.bibliography_path, store.records())
                .context("Failed to write bibliography")?;
            println!("Wrote {} entries to {}", written, base.bibliography_path.display());
            Ok(())
        }
    }
}

// ============================================================================
// Scrape Pipeline
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Mode {
    Bounded,
    Sequential,
}

async fn run(config: RunConfig, mode: Mode) -> Result<()> {
    config.validate().context("Invalid run configuration")?;

    let fetcher = HttpFetcher::new(config.proxy.as_deref()).context("Failed to set up fetcher")?;
    let mut store = DatasetStore::load(&config.dataset_path)
        .with_context(|| format!("Failed to load {}", config.dataset_path.display()))?;

    let summary = match mode {
        Mode::Bounded => runner::run_bounded(&fetcher, &mut store, &config).await,
        Mode::Sequential => runner::run_sequential(&fetcher, &mut store, &config).await,
    }
    .context("Scrape run failed")?;

    report(&summary);

    bibtex::write_bibliography(&config.bibliography_path, store.records())
        .context("Failed to write bibliography")?;

    info!(total = store.len(), "Job finished");
    println!("Job finished, Godspeed you! Cite us.");
    Ok(())
}

fn report(summary: &RunSummary) {
    info!(
        first_page = runner::page_index(summary.start_offset),
        pages = summary.pages_attempted,
        failed = summary.pages_failed,
        added = summary.records_added,
        stop = ?summary.stop,
        "Run complete"
    );
}
