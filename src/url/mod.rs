//! URL handling module for Folio-Crawl
//!
//! Listing page addressing, relative link resolution, and positional path
//! segment lookup used by the page extractors.

use url::Url;

/// Builds the URL of a numbered listing page
///
/// The page number is appended as a `page` query parameter, so a base that
/// already carries a query string (e.g. `?genre=fantasy`) keeps it.
///
/// # Examples
///
/// ```
/// use folio_crawl::url::listing_page_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.royalroad.com/fictions/search").unwrap();
/// assert_eq!(
///     listing_page_url(&base, 3).as_str(),
///     "https://www.royalroad.com/fictions/search?page=3"
/// );
/// ```
pub fn listing_page_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("page", &page.to_string());
    url
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - hrefs that cannot be joined to the base
/// - non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// Returns the path segment at `index` (zero-based, leading slash ignored)
///
/// For `https://host/fiction/42/some-slug`, index 0 is `fiction` and index 1
/// is `42`. Empty segments produced by a trailing slash are not returned.
pub fn path_segment(url: &Url, index: usize) -> Option<&str> {
    url.path_segments()?
        .nth(index)
        .filter(|segment| !segment.is_empty())
}
