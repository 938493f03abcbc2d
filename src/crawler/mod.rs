//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Crawl tasks and the page types they address
//! - The deduplicating FIFO frontier
//! - HTTP fetching
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod task;

pub use coordinator::{next_delay, run_crawl, Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, fetch_page, user_agent_string, FetchResult};
pub use frontier::{Frontier, FrontierEvent};
pub use task::{CrawlTask, PageType};

use crate::config::Config;
use crate::FolioError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open storage and restore the persisted frontier
/// 2. Seed the configured listing pages
/// 3. Fetch and extract pages until the frontier is empty
/// 4. Record the run's outcome
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to clear the persisted frontier first
/// * `config_hash` - Hash of the config file, stored on the run record
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed successfully
/// * `Err(FolioError)` - Crawl failed
pub async fn crawl(
    config: Config,
    fresh: bool,
    config_hash: &str,
) -> Result<CrawlSummary, FolioError> {
    run_crawl(config, fresh, config_hash).await
}
