//! Page extractors
//!
//! Each page type has one extractor. Extractors are pure: they read a parsed
//! document and the URL it came from, and return the tasks it links to plus
//! the record upserts it implies. Nothing is applied here, so a page that
//! fails halfway leaves no partial records behind.

mod chapter;
mod listing;
mod work;

pub use chapter::extract_chapter;
pub use listing::extract_listing;
pub use work::extract_work;

use crate::crawler::{CrawlTask, PageType};
use crate::records::RecordUpsert;
use crate::url::path_segment;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Position of the work ID in `/fiction/{work_id}/...` paths
pub(crate) const WORK_ID_SEGMENT: usize = 1;

/// Errors raised when a page doesn't have the expected shape
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("missing attribute '{attribute}' on {element}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("invalid number '{value}' for {field}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("missing path segment {index} in {url}")]
    MissingPathSegment { url: String, index: usize },

    #[error("invalid selector: {0}")]
    InvalidSelector(&'static str),
}

/// What a single page yielded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Newly discovered tasks, in document order
    pub tasks: Vec<CrawlTask>,

    /// Record changes implied by the page
    pub upserts: Vec<RecordUpsert>,
}

/// Parses `body` and runs the extractor matching the task's page type
///
/// # Arguments
///
/// * `task` - The task whose page was fetched
/// * `body` - The HTML body of that page
///
/// # Returns
///
/// * `Ok(Extraction)` - Discovered tasks and record upserts
/// * `Err(ExtractError)` - The page didn't have the expected shape
pub fn extract(task: &CrawlTask, body: &str) -> Result<Extraction, ExtractError> {
    let page_url = Url::parse(task.url())
        .map_err(|e| ExtractError::InvalidUrl(format!("{}: {}", task.url(), e)))?;
    let document = Html::parse_document(body);

    match task.page_type() {
        PageType::Listing => extract_listing(&document, &page_url),
        PageType::Work => extract_work(&document, &page_url),
        PageType::Chapter => extract_chapter(&document, &page_url),
    }
}

pub(crate) fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidSelector(css))
}

/// Concatenated, trimmed text of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses the numeric path segment at `index` of `url`
pub(crate) fn id_segment(url: &Url, index: usize) -> Result<u64, ExtractError> {
    let segment = path_segment(url, index).ok_or_else(|| ExtractError::MissingPathSegment {
        url: url.to_string(),
        index,
    })?;

    segment.parse().map_err(|_| ExtractError::InvalidNumber {
        field: "path id",
        value: segment.to_string(),
    })
}

/// Parses the leading run of digits in `text`, ignoring thousands separators
///
/// `"1,234 Followers"` yields 1234.
pub(crate) fn parse_count(text: &str, field: &'static str) -> Result<u64, ExtractError> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| *c != ',')
        .collect();

    digits.parse().map_err(|_| ExtractError::InvalidNumber {
        field,
        value: text.trim().to_string(),
    })
}
