//! Chapter pages
//!
//! Chapter URLs look like
//! `/fiction/{work_id}/{work_slug}/chapter/{chapter_id}/{chapter_slug}`.
//! Chapters form a chain through their "next" links; the last chapter of a
//! work simply has none.

use crate::crawler::CrawlTask;
use crate::extract::{
    element_text, id_segment, parse_count, selector, ExtractError, Extraction, WORK_ID_SEGMENT,
};
use crate::records::{ChapterRecord, RecordUpsert};
use crate::url::{path_segment, resolve_link};
use scraper::{ElementRef, Html};
use url::Url;

const WORK_SLUG_SEGMENT: usize = 2;
const CHAPTER_ID_SEGMENT: usize = 4;
const CHAPTER_SLUG_SEGMENT: usize = 5;

/// Extracts the chapter record and the link to the following chapter
pub fn extract_chapter(document: &Html, page_url: &Url) -> Result<Extraction, ExtractError> {
    let chapter_id = id_segment(page_url, CHAPTER_ID_SEGMENT)?;
    let work_id = id_segment(page_url, WORK_ID_SEGMENT)?;
    let work_slug = path_segment(page_url, WORK_SLUG_SEGMENT).ok_or_else(|| {
        ExtractError::MissingPathSegment {
            url: page_url.to_string(),
            index: WORK_SLUG_SEGMENT,
        }
    })?;

    let record = ChapterRecord {
        work_id,
        title: read_title(document, page_url)?,
        published_at: read_published_at(document)?,
        word_count: read_word_count(document)?,
        comment_count: read_comment_count(document)?,
    };

    let mut extraction = Extraction::default();
    extraction.upserts.push(RecordUpsert::Chapter {
        id: chapter_id,
        record,
    });

    match next_chapter(document, page_url)? {
        Some(next) => extraction.tasks.push(CrawlTask::chapter(next.as_str())),
        None => tracing::info!("finished crawling `{}`", work_slug),
    }

    Ok(extraction)
}

/// First `h1` on the page, falling back to the chapter slug
fn read_title(document: &Html, page_url: &Url) -> Result<String, ExtractError> {
    let heading = document
        .select(&selector("h1")?)
        .map(element_text)
        .find(|title| !title.is_empty());

    Ok(heading
        .or_else(|| path_segment(page_url, CHAPTER_SLUG_SEGMENT).map(str::to_string))
        .unwrap_or_default())
}

/// `unixtime` attribute of the element right after the calendar icon
fn read_published_at(document: &Html) -> Result<i64, ExtractError> {
    let marker = document
        .select(&selector("i.fa-calendar")?)
        .next()
        .ok_or(ExtractError::MissingElement("calendar marker"))?;

    let time = marker
        .next_siblings()
        .find_map(ElementRef::wrap)
        .ok_or(ExtractError::MissingElement("publication time"))?;

    let raw = time
        .value()
        .attr("unixtime")
        .ok_or(ExtractError::MissingAttribute {
            element: "publication time",
            attribute: "unixtime",
        })?;

    raw.trim().parse().map_err(|_| ExtractError::InvalidNumber {
        field: "published_at",
        value: raw.to_string(),
    })
}

/// Whitespace-separated tokens in the chapter body
fn read_word_count(document: &Html) -> Result<u64, ExtractError> {
    let body = document
        .select(&selector(".chapter-content")?)
        .next()
        .ok_or(ExtractError::MissingElement("chapter body"))?;

    Ok(body.text().collect::<String>().split_whitespace().count() as u64)
}

/// Number in parentheses of the comments caption, e.g. `Comments(12)`
fn read_comment_count(document: &Html) -> Result<u64, ExtractError> {
    let caption = document
        .select(&selector(".caption-subject")?)
        .map(element_text)
        .find(|text| text.contains("Comments"))
        .ok_or(ExtractError::MissingElement("comments caption"))?;

    let inner = caption
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| ExtractError::InvalidNumber {
            field: "comment_count",
            value: caption.clone(),
        })?;

    parse_count(inner, "comment_count")
}

/// Link labelled "next" inside the navigation buttons, if any
fn next_chapter(document: &Html, page_url: &Url) -> Result<Option<Url>, ExtractError> {
    let link_selector = selector("a[href]")?;

    let next = document
        .select(&selector(".nav-buttons")?)
        .next()
        .and_then(|nav| {
            nav.select(&link_selector)
                .find(|link| element_text(*link).to_lowercase().contains("next"))
        })
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve_link(href, page_url));

    Ok(next)
}
