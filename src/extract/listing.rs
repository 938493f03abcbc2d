//! Search listing pages
//!
//! Every `.fiction-title` element is one work entry. Its next two sibling
//! elements are the tag block and the statistics block.

use crate::crawler::CrawlTask;
use crate::extract::{
    element_text, id_segment, parse_count, selector, ExtractError, Extraction, WORK_ID_SEGMENT,
};
use crate::records::{RecordUpsert, WorkListing};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Index of the stats child node (text nodes included) holding the rating
const RATING_CHILD: usize = 3;

/// Extracts one work upsert and one work task per listing entry
///
/// Entries without a usable link are skipped. Any other malformed entry
/// fails the whole page.
pub fn extract_listing(document: &Html, page_url: &Url) -> Result<Extraction, ExtractError> {
    let entry_selector = selector(".fiction-title")?;
    let link_selector = selector("a")?;
    let rating_selector = selector("span[title]")?;

    let mut extraction = Extraction::default();

    for entry in document.select(&entry_selector) {
        let Some(link) = entry.select(&link_selector).next() else {
            tracing::warn!("Skipping listing entry without a link on {}", page_url);
            continue;
        };

        let Some(work_url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, page_url))
        else {
            tracing::warn!(
                "Skipping listing entry '{}' without a resolvable href on {}",
                element_text(link),
                page_url
            );
            continue;
        };

        let id = id_segment(&work_url, WORK_ID_SEGMENT)?;

        let mut blocks = entry.next_siblings().filter_map(ElementRef::wrap);
        let tag_block = blocks.next().ok_or(ExtractError::MissingElement("tag block"))?;
        let stats_block = blocks
            .next()
            .ok_or(ExtractError::MissingElement("stats block"))?;

        let [follower_count, view_count, chapter_count, page_count] = read_counts(stats_block)?;
        let rating = read_rating(stats_block, &rating_selector)?;

        let listing = WorkListing {
            title: element_text(link),
            follower_count,
            view_count,
            chapter_count,
            page_count,
            rating,
            tags: read_tags(tag_block),
        };

        tracing::debug!("Found work {} ({}) at {}", id, listing.title, work_url);

        extraction
            .upserts
            .push(RecordUpsert::WorkListing { id, listing });
        extraction.tasks.push(CrawlTask::work(work_url.as_str()));
    }

    Ok(extraction)
}

/// Reads followers, views, chapters and pages, in that order
///
/// These are the leading numbers of the first four non-blank children.
fn read_counts(stats: ElementRef<'_>) -> Result<[u64; 4], ExtractError> {
    const FIELDS: [&str; 4] = ["followers", "views", "chapters", "pages"];

    let texts: Vec<String> = stats
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(text.to_string()),
            Node::Element(_) => ElementRef::wrap(child).map(|el| el.text().collect()),
            _ => None,
        })
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .take(FIELDS.len())
        .collect();

    if texts.len() < FIELDS.len() {
        return Err(ExtractError::MissingElement("listing statistics"));
    }

    let mut counts = [0; 4];
    for ((count, text), field) in counts.iter_mut().zip(&texts).zip(FIELDS) {
        *count = parse_count(text, field)?;
    }
    Ok(counts)
}

/// Reads the star rating from the `title` attribute on the rating child
fn read_rating(stats: ElementRef<'_>, rating_selector: &Selector) -> Result<f64, ExtractError> {
    let holder = stats
        .children()
        .nth(RATING_CHILD)
        .and_then(ElementRef::wrap)
        .ok_or(ExtractError::MissingElement("rating"))?;

    let title = holder
        .value()
        .attr("title")
        .or_else(|| {
            holder
                .select(rating_selector)
                .next()
                .and_then(|span| span.value().attr("title"))
        })
        .ok_or(ExtractError::MissingAttribute {
            element: "rating",
            attribute: "title",
        })?;

    title
        .trim()
        .parse()
        .map_err(|_| ExtractError::InvalidNumber {
            field: "rating",
            value: title.to_string(),
        })
}

/// Splits the tag block on newlines, keeping non-blank entries in order
fn read_tags(tag_block: ElementRef<'_>) -> Vec<String> {
    tag_block
        .text()
        .collect::<String>()
        .split('\n')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
