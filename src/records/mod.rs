//! Catalogue records gathered by the crawl
//!
//! # Components
//!
//! - `WorkRecord`: one serialized fiction, keyed by its site ID
//! - `ChapterRecord`: one chapter, keyed by its site ID and linked to a work
//! - `RecordUpsert`: the insert-or-update operations extractors emit
//! - `RecordStore`: the in-memory tables those upserts are applied to

mod store;

pub use store::{DirtyRecords, RecordStore};

/// Metadata for a single work
///
/// Every field is optional: a work first seen through its detail page only
/// knows its author, and a work first seen on a listing has no author yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkRecord {
    pub title: Option<String>,
    pub follower_count: Option<u64>,
    pub view_count: Option<u64>,
    pub chapter_count: Option<u64>,
    pub page_count: Option<u64>,
    pub rating: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
}

impl WorkRecord {
    /// Creates a record that only knows its author
    pub fn with_author(author: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            ..Self::default()
        }
    }
}

/// The fields a listing page shows for a work
#[derive(Debug, Clone, PartialEq)]
pub struct WorkListing {
    pub title: String,
    pub follower_count: u64,
    pub view_count: u64,
    pub chapter_count: u64,
    pub page_count: u64,
    pub rating: f64,
    pub tags: Vec<String>,
}

/// Metadata for a single chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRecord {
    pub work_id: u64,
    pub title: String,
    /// Unix timestamp (seconds)
    pub published_at: i64,
    pub word_count: u64,
    pub comment_count: u64,
}

/// An insert-or-update against the record store
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpsert {
    /// Listing fields for a work; any known author is kept
    WorkListing { id: u64, listing: WorkListing },

    /// Author from a work's detail page; every other field is kept
    WorkAuthor { id: u64, author: String },

    /// A full chapter record; replaces any earlier copy
    Chapter { id: u64, record: ChapterRecord },
}

impl RecordUpsert {
    /// Short label used in log lines
    pub fn describe(&self) -> String {
        match self {
            Self::WorkListing { id, listing } => format!("work {} ({})", id, listing.title),
            Self::WorkAuthor { id, author } => format!("work {} by {}", id, author),
            Self::Chapter { id, record } => {
                format!("chapter {} of work {} ({})", id, record.work_id, record.title)
            }
        }
    }
}
