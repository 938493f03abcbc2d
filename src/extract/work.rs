//! Work detail pages

use crate::crawler::CrawlTask;
use crate::extract::{element_text, id_segment, selector, ExtractError, Extraction, WORK_ID_SEGMENT};
use crate::records::RecordUpsert;
use crate::url::resolve_link;
use scraper::Html;
use url::Url;

/// Extracts the author and the link to the first chapter
///
/// The work ID comes from the page URL. A work with no chapter rows yields
/// no task.
pub fn extract_work(document: &Html, page_url: &Url) -> Result<Extraction, ExtractError> {
    let id = id_segment(page_url, WORK_ID_SEGMENT)?;

    let header = document
        .select(&selector(".fic-header")?)
        .next()
        .ok_or(ExtractError::MissingElement("work header"))?;
    let author_link = header
        .select(&selector("a")?)
        .next()
        .ok_or(ExtractError::MissingElement("author link"))?;
    let author = element_text(author_link);

    let mut extraction = Extraction::default();
    extraction
        .upserts
        .push(RecordUpsert::WorkAuthor { id, author });

    let first_row = document.select(&selector("tr.chapter-row")?).next();
    match first_row {
        Some(row) => {
            let chapter_url = row
                .select(&selector("a[href]")?)
                .next()
                .and_then(|link| link.value().attr("href"))
                .and_then(|href| resolve_link(href, page_url));

            match chapter_url {
                Some(url) => extraction.tasks.push(CrawlTask::chapter(url.as_str())),
                None => tracing::warn!("First chapter row on {} has no usable link", page_url),
            }
        }
        None => tracing::info!("Work {} has no chapters yet", id),
    }

    Ok(extraction)
}
