//! Folio-Crawl main entry point
//!
//! This is the command-line interface for the Folio-Crawl catalogue crawler.

use anyhow::Context;
use clap::Parser;
use folio_crawl::config::{load_config_with_hash, validate, Config};
use folio_crawl::crawler::{crawl, user_agent_string};
use folio_crawl::url::listing_page_url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Folio-Crawl: a resumable catalogue crawler for serialized fiction
///
/// Folio-Crawl walks search listing pages, work pages and chapter chains,
/// storing work and chapter records in SQLite. An interrupted crawl picks
/// up where it left off on the next start.
#[derive(Parser, Debug)]
#[command(name = "folio-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A resumable catalogue crawler for serialized fiction", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget the persisted frontier before seeding (records are kept)
    #[arg(long)]
    fresh: bool,

    /// Number of listing pages to seed (overrides the config)
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Skip this many listing pages before seeding (overrides the config)
    #[arg(long, value_name = "N")]
    offset: Option<u32>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Held for the whole run; the crawl never leaves this thread
    let _logging = setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(pages) = cli.pages {
        config.crawler.pages = pages;
    }
    if let Some(offset) = cli.offset {
        config.crawler.page_offset = offset;
    }
    validate(&config).context("Invalid --pages/--offset override")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, cli.fresh, &config_hash).await
    }
}

/// Installs the logging subscriber as this thread's default
///
/// The returned guard uninstalls it when dropped.
fn setup_logging(verbose: u8, quiet: bool) -> tracing::dispatcher::DefaultGuard {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("folio_crawl=info,warn"),
            1 => EnvFilter::new("folio_crawl=debug,info"),
            2 => EnvFilter::new("folio_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .finish();

    tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Folio-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!(
        "  Listing pages: {} (starting at page {})",
        config.crawler.pages,
        config.crawler.page_offset.saturating_add(1)
    );
    println!(
        "  Delay between requests: {}-{}ms",
        config.crawler.min_delay_ms, config.crawler.max_delay_ms
    );
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_secs
    );

    println!("\nUser Agent:");
    println!("  {}", user_agent_string(&config.user_agent));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let seed_url = Url::parse(&config.crawler.seed_url)?;
    println!("\nListing Pages ({}):", config.crawler.pages);
    let pages = (1..=config.crawler.pages).map_while(|n| config.crawler.page_offset.checked_add(n));
    for page in pages {
        println!("  - {}", listing_page_url(&seed_url, page));
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} listing pages",
        config.crawler.pages
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use folio_crawl::output::{load_statistics, print_statistics};
    use folio_crawl::storage::open_storage;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool, config_hash: &str) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (persisted frontier will be cleared)");
    } else {
        tracing::info!("Starting crawl (will resume any persisted frontier)");
    }

    tracing::info!(
        "Seeding {} listing pages from {}",
        config.crawler.pages,
        config.crawler.seed_url
    );

    match crawl(config, fresh, config_hash).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl {} completed: {} tasks ({} failed), {} works and {} chapters stored",
                summary.run_id,
                summary.tasks_processed,
                summary.tasks_failed,
                summary.works,
                summary.chapters
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
