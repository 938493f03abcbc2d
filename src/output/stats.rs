//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! catalogue and frontier statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::FolioError;
use chrono::{DateTime, Utc};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of stored works
    pub works: u64,

    /// Works whose detail page has been crawled (author known)
    pub authored_works: u64,

    /// Number of stored chapters
    pub chapters: u64,

    /// Sum of all chapter word counts
    pub total_words: u64,

    /// Publication time of the newest stored chapter (unix seconds)
    pub latest_publication: Option<i64>,

    /// Tasks still waiting in the persisted frontier
    pub pending_tasks: u64,

    /// URLs already taken from the frontier
    pub visited_urls: u64,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    /// Mean words per chapter, or zero when there are no chapters
    pub fn average_chapter_words(&self) -> f64 {
        if self.chapters == 0 {
            0.0
        } else {
            self.total_words as f64 / self.chapters as f64
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(FolioError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, FolioError> {
    Ok(CrawlStatistics {
        works: storage.count_works()?,
        authored_works: storage.count_authored_works()?,
        chapters: storage.count_chapters()?,
        total_words: storage.total_words()?,
        latest_publication: storage.latest_publication()?,
        pending_tasks: storage.count_pending()?,
        visited_urls: storage.count_visited()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Formats a unix timestamp as a UTC date and time
pub fn format_timestamp(unix_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| format!("invalid timestamp {}", unix_seconds))
}

/// Seconds between a run's start and finish, when both parse
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Catalogue:");
    println!("  Works: {}", stats.works);
    println!("  Works with author: {}", stats.authored_works);
    println!("  Chapters: {}", stats.chapters);
    println!(
        "  Total words: {} ({:.0} per chapter)",
        stats.total_words,
        stats.average_chapter_words()
    );
    match stats.latest_publication {
        Some(published) => println!("  Newest chapter: {}", format_timestamp(published)),
        None => println!("  Newest chapter: none"),
    }
    println!();

    println!("Frontier:");
    println!("  Pending tasks: {}", stats.pending_tasks);
    println!("  Visited URLs: {}", stats.visited_urls);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = run_duration_seconds(run) {
                println!("  Duration: {}s", seconds);
            }
            println!(
                "  Tasks: {} processed, {} failed",
                run.tasks_processed, run.tasks_failed
            );
        }
        None => println!("No crawl runs recorded yet"),
    }
}
