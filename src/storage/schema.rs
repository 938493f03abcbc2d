//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Folio-Crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    tasks_processed INTEGER NOT NULL DEFAULT 0,
    tasks_failed INTEGER NOT NULL DEFAULT 0
);

-- One row per work; listing and detail pages fill different columns
CREATE TABLE IF NOT EXISTS works (
    id INTEGER PRIMARY KEY,
    title TEXT,
    follower_count INTEGER,
    view_count INTEGER,
    chapter_count INTEGER,
    page_count INTEGER,
    rating REAL,
    tags TEXT,
    author TEXT
);

-- One row per chapter
CREATE TABLE IF NOT EXISTS chapters (
    id INTEGER PRIMARY KEY,
    work_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    published_at INTEGER NOT NULL,
    word_count INTEGER NOT NULL,
    comment_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chapters_work ON chapters(work_id);

-- Crawl frontier queue, in discovery order
CREATE TABLE IF NOT EXISTS frontier_pending (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    page_type TEXT NOT NULL
);

-- URLs already taken off the frontier
CREATE TABLE IF NOT EXISTS frontier_visited (
    url TEXT PRIMARY KEY
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
