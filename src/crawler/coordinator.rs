//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the pieces together:
//! - Opening storage and restoring the frontier and record tables
//! - Seeding listing pages
//! - Fetching, extracting and applying results one task at a time
//! - Checkpointing each dequeue and each task's results
//! - Pausing a random interval between requests

use crate::config::Config;
use crate::crawler::{build_http_client, fetch_page, CrawlTask, FetchResult, Frontier};
use crate::extract::extract;
use crate::records::RecordStore;
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::FolioError;
use rand::Rng;
use reqwest::Client;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;

/// Totals reported when a crawl finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub run_id: i64,

    /// Tasks taken from the frontier, failed ones included
    pub tasks_processed: u64,

    /// Tasks abandoned after a transport or extraction failure
    pub tasks_failed: u64,

    pub works: usize,
    pub chapters: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: SqliteStorage,
    frontier: Frontier,
    records: RecordStore,
    client: Client,
    run_id: i64,
    tasks_processed: u64,
    tasks_failed: u64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to forget the persisted frontier before seeding
    /// * `config_hash` - Hash of the config file, stored on the run record
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(FolioError)` - Failed to initialize
    pub fn new(config: Config, fresh: bool, config_hash: &str) -> Result<Self, FolioError> {
        let storage_path = Path::new(&config.output.database_path);
        let mut storage = SqliteStorage::new(storage_path)?;

        if let Some(previous) = storage.get_latest_run()? {
            if previous.status == RunStatus::Running {
                tracing::warn!("Previous run {} did not finish cleanly", previous.id);
                storage.finish_run(
                    previous.id,
                    RunStatus::Interrupted,
                    previous.tasks_processed,
                    previous.tasks_failed,
                )?;
            }
        }

        if fresh {
            tracing::info!("Clearing persisted frontier");
            storage.clear_frontier()?;
        }

        let pending = storage.load_pending()?;
        let visited = storage.load_visited()?;
        if !pending.is_empty() {
            tracing::info!(
                "Resuming with {} pending tasks and {} visited URLs",
                pending.len(),
                visited.len()
            );
        }
        let mut frontier = Frontier::restore(pending, visited);

        let records = RecordStore::load(&storage)?;

        let seed_url = Url::parse(&config.crawler.seed_url)?;
        let seeded = frontier.seed_listing_pages(
            &seed_url,
            config.crawler.page_offset,
            config.crawler.pages,
        );
        tracing::info!(
            "Seeded {} of {} listing pages starting at page {}",
            seeded,
            config.crawler.pages,
            config.crawler.page_offset.saturating_add(1)
        );

        let client = build_http_client(&config.user_agent, config.crawler.request_timeout_secs)?;
        let run_id = storage.create_run(config_hash)?;

        let mut coordinator = Self {
            config,
            storage,
            frontier,
            records,
            client,
            run_id,
            tasks_processed: 0,
            tasks_failed: 0,
        };

        // Make the seeds durable before the first fetch
        coordinator.checkpoint()?;

        Ok(coordinator)
    }

    /// Returns the ID of the run this coordinator records into
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Returns the frontier in its current state
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Returns the in-memory record tables
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Runs the crawl loop until the frontier is empty
    ///
    /// Task failures are logged and counted. A storage failure stops the
    /// run, marks it failed and is returned.
    pub async fn run(&mut self) -> Result<CrawlSummary, FolioError> {
        let span = tracing::info_span!("crawl_run", run_id = self.run_id);

        let outcome = self.crawl_loop().instrument(span).await;

        let status = if outcome.is_ok() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        let finished = self.storage.finish_run(
            self.run_id,
            status,
            self.tasks_processed,
            self.tasks_failed,
        );

        // The loop error takes precedence over a failure to record it
        outcome?;
        finished?;

        Ok(self.summary())
    }

    async fn crawl_loop(&mut self) -> Result<(), FolioError> {
        tracing::info!("Starting crawl with {} pending tasks", self.frontier.len());
        let start_time = Instant::now();

        while let Some(task) = self.frontier.dequeue() {
            tracing::debug!("Processing {} page: {}", task.page_type(), task.url());

            // Mark the URL visited on disk before fetching, so a page that
            // kills the process is not retried on the next start
            self.checkpoint()?;

            if let Err(e) = self.process_task(&task).await {
                tracing::warn!("Abandoning {}: {}", task.url(), e);
                self.tasks_failed += 1;
            }
            self.tasks_processed += 1;

            self.checkpoint()?;

            if self.tasks_processed % 10 == 0 {
                tracing::info!(
                    "Progress: {} tasks processed ({} failed), {} pending, {:.2} tasks/sec",
                    self.tasks_processed,
                    self.tasks_failed,
                    self.frontier.len(),
                    self.tasks_processed as f64 / start_time.elapsed().as_secs_f64()
                );
            }

            if !self.frontier.is_empty() {
                let delay = next_delay(
                    self.config.crawler.min_delay_ms,
                    self.config.crawler.max_delay_ms,
                );
                tracing::trace!("Sleeping {:?} before next request", delay);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!(
            "Frontier is empty, crawl complete: {} tasks ({} failed) in {:?}",
            self.tasks_processed,
            self.tasks_failed,
            start_time.elapsed()
        );

        Ok(())
    }

    /// Fetches one task's page, extracts it and applies the results
    ///
    /// Nothing is applied unless extraction succeeds for the whole page.
    async fn process_task(&mut self, task: &CrawlTask) -> Result<(), FolioError> {
        let body = match fetch_page(&self.client, task.url()).await {
            FetchResult::Success { body, .. } => body,
            FetchResult::HttpError { status } => {
                return Err(FolioError::Transport {
                    url: task.url().to_string(),
                    reason: format!("HTTP {}", status),
                });
            }
            FetchResult::NetworkError { error } => {
                return Err(FolioError::Transport {
                    url: task.url().to_string(),
                    reason: error,
                });
            }
        };

        let extraction = extract(task, &body).map_err(|source| FolioError::Extraction {
            url: task.url().to_string(),
            source,
        })?;

        let discovered = extraction.tasks.len();
        let added = extraction
            .tasks
            .into_iter()
            .filter_map(|next| self.frontier.enqueue(next).then_some(()))
            .count();

        for upsert in extraction.upserts {
            let description = upsert.describe();
            if self.records.apply(upsert) {
                tracing::debug!("Updated {}", description);
            }
        }

        tracing::debug!(
            "Finished {}: {} links ({} new)",
            task.url(),
            discovered,
            added
        );

        Ok(())
    }

    /// Persists changed records and frontier events in one transaction
    fn checkpoint(&mut self) -> Result<(), FolioError> {
        let records = self.records.take_dirty();
        let events = self.frontier.take_journal();

        if records.is_empty() && events.is_empty() {
            return Ok(());
        }

        self.storage.save_checkpoint(&records, &events)?;
        tracing::trace!(
            "Checkpointed {} works, {} chapters, {} frontier events",
            records.works.len(),
            records.chapters.len(),
            events.len()
        );
        Ok(())
    }

    fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            run_id: self.run_id,
            tasks_processed: self.tasks_processed,
            tasks_failed: self.tasks_failed,
            works: self.records.work_count(),
            chapters: self.records.chapter_count(),
        }
    }
}

/// Draws the pause before the next request, uniform in `[min_ms, max_ms)`
///
/// When the range is empty the pause is `min_ms`.
pub fn next_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..max_ms))
}

/// Runs the main crawl operation
///
/// This function:
///
/// 1. Opens storage and closes out an interrupted previous run
/// 2. Restores (or, with `fresh`, clears) the persisted frontier
/// 3. Loads the record tables
/// 4. Seeds the configured listing pages
/// 5. Drains the frontier, checkpointing after each task
/// 6. Marks the run completed with its counters
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to forget the persisted frontier first
/// * `config_hash` - Hash of the config file
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed
/// * `Err(FolioError)` - Crawl could not start or storage failed
///
/// # Example
///
/// ```no_run
/// use folio_crawl::config::load_config_with_hash;
/// use folio_crawl::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let summary = run_crawl(config, false, &hash).await?;
/// println!("{} works", summary.works);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    fresh: bool,
    config_hash: &str,
) -> Result<CrawlSummary, FolioError> {
    let mut coordinator = Coordinator::new(config, fresh, config_hash)?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, OutputConfig, UserAgentConfig};
    use tempfile::TempDir;

    fn create_test_config(dir: &TempDir, pages: u32) -> Config {
        Config {
            crawler: CrawlerConfig {
                seed_url: "http://127.0.0.1:9/fictions/search".to_string(),
                pages,
                page_offset: 0,
                min_delay_ms: 0,
                max_delay_ms: 0,
                request_timeout_secs: 1,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestCrawler".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: dir
                    .path()
                    .join("crawl.db")
                    .to_string_lossy()
                    .into_owned(),
            },
        }
    }

    #[test]
    fn test_next_delay_within_range() {
        for _ in 0..100 {
            let delay = next_delay(1000, 5000);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(5000));
        }
    }

    #[test]
    fn test_next_delay_empty_range() {
        assert_eq!(next_delay(0, 0), Duration::ZERO);
        assert_eq!(next_delay(300, 300), Duration::from_millis(300));
        assert_eq!(next_delay(300, 100), Duration::from_millis(300));
    }

    #[test]
    fn test_coordinator_seeds_listing_pages() {
        let dir = TempDir::new().unwrap();
        let coordinator = Coordinator::new(create_test_config(&dir, 3), false, "hash").unwrap();

        assert_eq!(coordinator.frontier().len(), 3);
        assert_eq!(coordinator.records().work_count(), 0);

        // Seeds were checkpointed during construction
        let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
        let pending = storage.load_pending().unwrap();
        let urls: Vec<&str> = pending.iter().map(|task| task.url()).collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:9/fictions/search?page=1",
                "http://127.0.0.1:9/fictions/search?page=2",
                "http://127.0.0.1:9/fictions/search?page=3",
            ]
        );

        let run = storage.get_run(coordinator.run_id()).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "hash");
    }

    #[test]
    fn test_restart_marks_previous_run_interrupted() {
        let dir = TempDir::new().unwrap();
        let first = Coordinator::new(create_test_config(&dir, 1), false, "hash").unwrap();
        let first_id = first.run_id();
        drop(first);

        let second = Coordinator::new(create_test_config(&dir, 1), false, "hash").unwrap();
        assert_ne!(second.run_id(), first_id);

        // The pending seed survives and is not duplicated
        assert_eq!(second.frontier().len(), 1);

        let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
        assert_eq!(
            storage.get_run(first_id).unwrap().status,
            RunStatus::Interrupted
        );
    }

    #[tokio::test]
    async fn test_failed_tasks_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        // Nothing listens on port 9 of the loopback interface
        let mut coordinator =
            Coordinator::new(create_test_config(&dir, 2), false, "hash").unwrap();

        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.tasks_processed, 2);
        assert_eq!(summary.tasks_failed, 2);
        assert_eq!(summary.works, 0);

        let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
        let run = storage.get_run(summary.run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.tasks_processed, 2);
        assert_eq!(run.tasks_failed, 2);
        assert_eq!(storage.count_pending().unwrap(), 0);
        assert_eq!(storage.count_visited().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dequeued_url_is_durable_before_fetch() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fictions/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir, 1);
        config.crawler.seed_url = format!("{}/fictions/search", server.uri());
        config.crawler.request_timeout_secs = 30;

        // Stop the run while the listing fetch is still in flight
        let mut coordinator = Coordinator::new(config.clone(), false, "hash").unwrap();
        let stopped = tokio::time::timeout(Duration::from_millis(500), coordinator.run()).await;
        assert!(stopped.is_err());
        drop(coordinator);

        let listing_url = format!("{}/fictions/search?page=1", server.uri());
        let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
        assert!(storage.load_pending().unwrap().is_empty());
        assert_eq!(storage.load_visited().unwrap(), vec![listing_url]);

        let restarted = Coordinator::new(config, false, "hash").unwrap();
        assert!(restarted.frontier().is_empty());
    }

    #[test]
    fn test_fresh_clears_visited_urls() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir, 1);

        let mut storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
        let mut frontier = Frontier::new();
        frontier.enqueue(CrawlTask::listing(
            "http://127.0.0.1:9/fictions/search?page=1",
        ));
        frontier.dequeue();
        storage
            .save_checkpoint(&Default::default(), &frontier.take_journal())
            .unwrap();
        drop(storage);

        let resumed = Coordinator::new(config.clone(), false, "hash").unwrap();
        assert!(resumed.frontier().is_empty());
        drop(resumed);

        let fresh = Coordinator::new(config, true, "hash").unwrap();
        assert_eq!(fresh.frontier().len(), 1);
    }
}
