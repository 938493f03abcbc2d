//! Crawl frontier: pending tasks plus the set of URLs already taken
//!
//! This module handles:
//! - FIFO ordering of discovered tasks
//! - At-most-once enqueueing per URL
//! - Marking URLs visited at the moment they are dequeued
//! - Journaling changes so the crawl loop can checkpoint them

use crate::crawler::task::CrawlTask;
use crate::url::listing_page_url;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A change to the frontier since the last checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontierEvent {
    /// A task was appended to the pending queue
    Enqueued(CrawlTask),

    /// The task with this URL was popped and marked visited
    Dequeued(String),
}

/// Ordered queue of pending tasks plus the visited set
///
/// `pending` and `queued` always describe the same URLs; `visited` only
/// grows, and only through [`Frontier::dequeue`].
#[derive(Debug, Default)]
pub struct Frontier {
    /// Tasks waiting to be crawled, oldest discovered first
    pending: VecDeque<CrawlTask>,

    /// URLs currently sitting in `pending`
    queued: HashSet<String>,

    /// URLs that have been dequeued for processing
    visited: HashSet<String>,

    /// Events not yet persisted
    journal: Vec<FrontierEvent>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a frontier from persisted state
    ///
    /// Pending tasks whose URL is already visited, or that repeat an
    /// earlier pending URL, are dropped. The journal starts empty since the
    /// restored state is already durable.
    pub fn restore(pending: Vec<CrawlTask>, visited: impl IntoIterator<Item = String>) -> Self {
        let mut frontier = Self {
            visited: visited.into_iter().collect(),
            ..Self::default()
        };

        for task in pending {
            if frontier.visited.contains(task.url()) || frontier.queued.contains(task.url()) {
                continue;
            }
            frontier.queued.insert(task.url().to_string());
            frontier.pending.push_back(task);
        }

        frontier
    }

    /// Appends a task unless its URL is already pending or visited
    ///
    /// Returns true if the task was added.
    pub fn enqueue(&mut self, task: CrawlTask) -> bool {
        if self.visited.contains(task.url()) || self.queued.contains(task.url()) {
            tracing::trace!("Skipping known URL: {}", task.url());
            return false;
        }

        self.queued.insert(task.url().to_string());
        self.journal.push(FrontierEvent::Enqueued(task.clone()));
        self.pending.push_back(task);
        true
    }

    /// Pops the oldest pending task and marks its URL visited
    pub fn dequeue(&mut self) -> Option<CrawlTask> {
        let task = self.pending.pop_front()?;

        self.queued.remove(task.url());
        self.visited.insert(task.url().to_string());
        self.journal
            .push(FrontierEvent::Dequeued(task.url().to_string()));

        Some(task)
    }

    /// Enqueues one listing task per page in `offset + 1 ..= offset + pages`
    ///
    /// Page numbers past `u32::MAX` are not seeded. Returns how many tasks
    /// were new to the frontier.
    pub fn seed_listing_pages(&mut self, base: &Url, offset: u32, pages: u32) -> usize {
        (1..=pages)
            .map_while(|n| offset.checked_add(n))
            .map(|page| listing_page_url(base, page))
            .filter(|url| self.enqueue(CrawlTask::listing(url.as_str())))
            .count()
    }

    /// Drains the events recorded since the last call
    pub fn take_journal(&mut self) -> Vec<FrontierEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Returns the number of pending tasks
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether no tasks are pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of visited URLs
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Returns whether the URL has already been dequeued
    #[cfg(test)]
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(n: u32) -> String {
        format!("https://example.com/fiction/{}/slug", n)
    }

    #[test]
    fn test_new_frontier_is_empty() {
        let mut frontier = Frontier::new();
        assert!(frontier.is_empty());
        assert_eq!(frontier.visited_count(), 0);
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.enqueue(CrawlTask::work(url(1)));
        frontier.enqueue(CrawlTask::work(url(2)));
        frontier.enqueue(CrawlTask::work(url(3)));

        assert_eq!(frontier.dequeue().unwrap().url(), url(1));
        assert_eq!(frontier.dequeue().unwrap().url(), url(2));
        assert_eq!(frontier.dequeue().unwrap().url(), url(3));
        assert!(frontier.dequeue().is_none());
    }

    #[test]
    fn test_duplicate_pending_is_ignored() {
        let mut frontier = Frontier::new();
        assert!(frontier.enqueue(CrawlTask::work(url(1))));
        assert!(!frontier.enqueue(CrawlTask::chapter(url(1))));

        assert_eq!(frontier.len(), 1);
        // The first declaration wins
        let task = frontier.dequeue().unwrap();
        assert_eq!(task.page_type(), crate::crawler::PageType::Work);
    }

    #[test]
    fn test_visited_is_not_requeued() {
        let mut frontier = Frontier::new();
        frontier.enqueue(CrawlTask::work(url(1)));
        frontier.dequeue().unwrap();

        assert!(frontier.is_visited(&url(1)));
        assert!(!frontier.enqueue(CrawlTask::work(url(1))));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_visited_marked_on_dequeue_not_enqueue() {
        let mut frontier = Frontier::new();
        frontier.enqueue(CrawlTask::work(url(1)));
        assert!(!frontier.is_visited(&url(1)));

        frontier.dequeue();
        assert!(frontier.is_visited(&url(1)));
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_seed_listing_pages_with_offset() {
        let base = Url::parse("https://example.com/fictions/search").unwrap();
        let mut frontier = Frontier::new();

        assert_eq!(frontier.seed_listing_pages(&base, 4, 3), 3);

        let urls: Vec<String> = std::iter::from_fn(|| frontier.dequeue())
            .map(|task| task.url().to_string())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/fictions/search?page=5",
                "https://example.com/fictions/search?page=6",
                "https://example.com/fictions/search?page=7",
            ]
        );
    }

    #[test]
    fn test_seed_stops_at_last_page_number() {
        let base = Url::parse("https://example.com/fictions/search").unwrap();
        let mut frontier = Frontier::new();

        assert_eq!(frontier.seed_listing_pages(&base, u32::MAX, 1), 0);
        assert_eq!(frontier.seed_listing_pages(&base, u32::MAX - 1, 3), 1);
        assert_eq!(
            frontier.dequeue().unwrap().url(),
            format!("https://example.com/fictions/search?page={}", u32::MAX)
        );
    }

    #[test]
    fn test_seed_skips_visited_pages() {
        let base = Url::parse("https://example.com/fictions/search").unwrap();
        let mut frontier = Frontier::restore(
            vec![],
            vec!["https://example.com/fictions/search?page=1".to_string()],
        );

        assert_eq!(frontier.seed_listing_pages(&base, 0, 2), 1);
        assert_eq!(
            frontier.dequeue().unwrap().url(),
            "https://example.com/fictions/search?page=2"
        );
    }

    #[test]
    fn test_journal_records_changes() {
        let mut frontier = Frontier::new();
        frontier.enqueue(CrawlTask::work(url(1)));
        frontier.enqueue(CrawlTask::work(url(1)));
        frontier.dequeue();

        let journal = frontier.take_journal();
        assert_eq!(
            journal,
            vec![
                FrontierEvent::Enqueued(CrawlTask::work(url(1))),
                FrontierEvent::Dequeued(url(1)),
            ]
        );
        assert!(frontier.take_journal().is_empty());
    }

    #[test]
    fn test_restore_drops_visited_and_duplicates() {
        let frontier = Frontier::restore(
            vec![
                CrawlTask::work(url(1)),
                CrawlTask::work(url(2)),
                CrawlTask::chapter(url(2)),
            ],
            vec![url(1)],
        );

        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_independent_frontiers_do_not_share_state() {
        let mut first = Frontier::new();
        first.enqueue(CrawlTask::work(url(1)));

        let second = Frontier::new();
        assert!(second.is_empty());
    }
}
