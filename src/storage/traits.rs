//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::{CrawlTask, FrontierEvent};
use crate::records::{ChapterRecord, DirtyRecords, WorkRecord};
use crate::storage::{RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl loop owns its backend exclusively, so implementations need no
/// internal synchronization.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Closes a run with its final status and task counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        tasks_processed: u64,
        tasks_failed: u64,
    ) -> StorageResult<()>;

    // ===== Records =====

    /// Loads every work record; empty on a fresh database
    fn load_works(&self) -> StorageResult<HashMap<u64, WorkRecord>>;

    /// Loads every chapter record; empty on a fresh database
    fn load_chapters(&self) -> StorageResult<HashMap<u64, ChapterRecord>>;

    // ===== Frontier =====

    /// Loads pending tasks in the order they were enqueued
    ///
    /// Rows with an unrecognized page type are skipped with a warning.
    fn load_pending(&self) -> StorageResult<Vec<CrawlTask>>;

    /// Loads every visited URL
    fn load_visited(&self) -> StorageResult<Vec<String>>;

    /// Forgets all pending and visited URLs (records are untouched)
    fn clear_frontier(&mut self) -> StorageResult<()>;

    // ===== Checkpoint =====

    /// Writes changed records and frontier events in a single transaction
    ///
    /// Either everything in the checkpoint becomes durable or nothing does.
    fn save_checkpoint(
        &mut self,
        records: &DirtyRecords,
        frontier: &[FrontierEvent],
    ) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts stored works
    fn count_works(&self) -> StorageResult<u64>;

    /// Counts stored works whose author is known
    fn count_authored_works(&self) -> StorageResult<u64>;

    /// Counts stored chapters
    fn count_chapters(&self) -> StorageResult<u64>;

    /// Sums the word counts of all stored chapters
    fn total_words(&self) -> StorageResult<u64>;

    /// Gets the newest chapter publication time (unix seconds)
    fn latest_publication(&self) -> StorageResult<Option<i64>>;

    /// Counts pending frontier tasks
    fn count_pending(&self) -> StorageResult<u64>;

    /// Counts visited URLs
    fn count_visited(&self) -> StorageResult<u64>;
}
