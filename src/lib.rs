//! Folio-Crawl: a resumable catalogue crawler for serialized fiction
//!
//! This crate walks a paginated fiction site (search listings, work detail
//! pages and chapter pages), extracts structured Work and Chapter records,
//! and persists them together with the crawl frontier so long runs can be
//! resumed.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod records;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Folio-Crawl operations
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Extraction failure for {url}: {source}")]
    Extraction {
        url: String,
        #[source]
        source: extract::ExtractError,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Folio-Crawl operations
pub type Result<T> = std::result::Result<T, FolioError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlTask, Frontier, PageType};
pub use records::{ChapterRecord, RecordStore, RecordUpsert, WorkRecord};
