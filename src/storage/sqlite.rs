//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{CrawlTask, FrontierEvent, PageType};
use crate::records::{ChapterRecord, DirtyRecords, WorkRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::FolioError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// Tags are stored newline-joined; a tag never contains a newline since
/// listing pages separate tags with them.
const TAG_SEPARATOR: &str = "\n";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(FolioError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, FolioError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, FolioError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn encode_tags(tags: Option<&[String]>) -> Option<String> {
    tags.map(|tags| tags.join(TAG_SEPARATOR))
}

fn decode_tags(stored: Option<String>) -> Option<Vec<String>> {
    stored.map(|joined| {
        joined
            .split(TAG_SEPARATOR)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: run_status(row.get(0)?, &row.get::<_, String>(4)?),
        tasks_processed: row.get(5)?,
        tasks_failed: row.get(6)?,
    })
}

/// Unknown statuses are treated as failed so they are never resumed
fn run_status(run_id: i64, stored: &str) -> RunStatus {
    RunStatus::from_db_string(stored).unwrap_or_else(|| {
        tracing::warn!(
            "Run {} has unknown status '{}', treating it as failed",
            run_id,
            stored
        );
        RunStatus::Failed
    })
}

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, tasks_processed, tasks_failed";

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        tasks_processed: u64,
        tasks_failed: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, tasks_processed = ?3, tasks_failed = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                tasks_processed,
                tasks_failed,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Records =====

    fn load_works(&self) -> StorageResult<HashMap<u64, WorkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, follower_count, view_count, chapter_count, page_count,
             rating, tags, author FROM works",
        )?;

        let works = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    WorkRecord {
                        title: row.get(1)?,
                        follower_count: row.get(2)?,
                        view_count: row.get(3)?,
                        chapter_count: row.get(4)?,
                        page_count: row.get(5)?,
                        rating: row.get(6)?,
                        tags: decode_tags(row.get(7)?),
                        author: row.get(8)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(works)
    }

    fn load_chapters(&self) -> StorageResult<HashMap<u64, ChapterRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, work_id, title, published_at, word_count, comment_count FROM chapters",
        )?;

        let chapters = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    ChapterRecord {
                        work_id: row.get(1)?,
                        title: row.get(2)?,
                        published_at: row.get(3)?,
                        word_count: row.get(4)?,
                        comment_count: row.get(5)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(chapters)
    }

    // ===== Frontier =====

    fn load_pending(&self) -> StorageResult<Vec<CrawlTask>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, page_type FROM frontier_pending ORDER BY seq ASC")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let tasks = rows
            .into_iter()
            .filter_map(|(url, page_type)| match PageType::from_db_string(&page_type) {
                Some(page_type) => Some(CrawlTask::new(url, page_type)),
                None => {
                    tracing::warn!("Skipping pending {} with unknown page type '{}'", url, page_type);
                    None
                }
            })
            .collect();

        Ok(tasks)
    }

    fn load_visited(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM frontier_visited")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn clear_frontier(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM frontier_pending;
            DELETE FROM frontier_visited;
        ",
        )?;
        Ok(())
    }

    // ===== Checkpoint =====

    fn save_checkpoint(
        &mut self,
        records: &DirtyRecords,
        frontier: &[FrontierEvent],
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        {
            let mut work_stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO works
                 (id, title, follower_count, view_count, chapter_count, page_count, rating, tags, author)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (id, work) in &records.works {
                work_stmt.execute(params![
                    id,
                    work.title,
                    work.follower_count,
                    work.view_count,
                    work.chapter_count,
                    work.page_count,
                    work.rating,
                    encode_tags(work.tags.as_deref()),
                    work.author,
                ])?;
            }

            let mut chapter_stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO chapters
                 (id, work_id, title, published_at, word_count, comment_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (id, chapter) in &records.chapters {
                chapter_stmt.execute(params![
                    id,
                    chapter.work_id,
                    chapter.title,
                    chapter.published_at,
                    chapter.word_count,
                    chapter.comment_count,
                ])?;
            }

            let mut enqueue_stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO frontier_pending (url, page_type) VALUES (?1, ?2)",
            )?;
            let mut dequeue_stmt =
                tx.prepare_cached("DELETE FROM frontier_pending WHERE url = ?1")?;
            let mut visit_stmt =
                tx.prepare_cached("INSERT OR IGNORE INTO frontier_visited (url) VALUES (?1)")?;

            for event in frontier {
                match event {
                    FrontierEvent::Enqueued(task) => {
                        enqueue_stmt
                            .execute(params![task.url(), task.page_type().to_db_string()])?;
                    }
                    FrontierEvent::Dequeued(url) => {
                        dequeue_stmt.execute(params![url])?;
                        visit_stmt.execute(params![url])?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_works(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM works")
    }

    fn count_authored_works(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM works WHERE author IS NOT NULL")
    }

    fn count_chapters(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM chapters")
    }

    fn total_words(&self) -> StorageResult<u64> {
        self.count("SELECT COALESCE(SUM(word_count), 0) FROM chapters")
    }

    fn latest_publication(&self) -> StorageResult<Option<i64>> {
        let latest = self
            .conn
            .query_row("SELECT MAX(published_at) FROM chapters", [], |row| row.get(0))?;
        Ok(latest)
    }

    fn count_pending(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM frontier_pending")
    }

    fn count_visited(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM frontier_visited")
    }
}
