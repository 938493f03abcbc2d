//! Crawl task definitions
//!
//! A task is a URL paired with the kind of page expected behind it. The page
//! type picks the extractor; it plays no part in task identity.

use std::fmt;
use std::hash::{Hash, Hasher};

/// The kind of page a task points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// A page of search results listing many works
    Listing,

    /// A work's detail page (author, table of contents)
    Work,

    /// A single chapter page
    Chapter,
}

impl PageType {
    /// Converts the page type to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Work => "work",
            Self::Chapter => "chapter",
        }
    }

    /// Parses a page type from its database string representation
    ///
    /// Returns None if the string doesn't match any known page type.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "listing" => Some(Self::Listing),
            "work" => Some(Self::Work),
            "chapter" => Some(Self::Chapter),
            _ => None,
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A URL waiting to be crawled, tagged with its expected page type
///
/// Equality and hashing only look at the URL, so the same address declared
/// under two page types is still one task.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    url: String,
    page_type: PageType,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, page_type: PageType) -> Self {
        Self {
            url: url.into(),
            page_type,
        }
    }

    pub fn listing(url: impl Into<String>) -> Self {
        Self::new(url, PageType::Listing)
    }

    pub fn work(url: impl Into<String>) -> Self {
        Self::new(url, PageType::Work)
    }

    pub fn chapter(url: impl Into<String>) -> Self {
        Self::new(url, PageType::Chapter)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }
}

impl PartialEq for CrawlTask {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for CrawlTask {}

impl Hash for CrawlTask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}
