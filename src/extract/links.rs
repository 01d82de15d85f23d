//! Same-site content link filtering

use scraper::Html;

use super::ExtractionRules;

/// Collects every content link in the document, in order of appearance
///
/// Duplicates are kept so the output mirrors the document structure.
pub(crate) fn content_links(document: &Html, rules: &ExtractionRules) -> Vec<String> {
    document
        .select(&rules.anchor)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| to_content_link(href, &rules.link_prefix, &rules.origin))
        .collect()
}

/// Rewrites `href` to an absolute URL if it points at a content page
///
/// A link is kept only when it starts with the content path prefix and has no
/// namespace separator: a `:` marks talk, file, category and special pages.
///
/// # Example
///
/// ```
/// use seedcrawl::extract::to_content_link;
///
/// let origin = "https://en.wikipedia.org";
/// assert_eq!(
///     to_content_link("/wiki/Dog", "/wiki/", origin),
///     Some("https://en.wikipedia.org/wiki/Dog".to_string())
/// );
/// assert_eq!(to_content_link("/wiki/Talk:Dog", "/wiki/", origin), None);
/// ```
pub fn to_content_link(href: &str, prefix: &str, origin: &str) -> Option<String> {
    if href.starts_with(prefix) && !href.contains(':') {
        Some(format!("{}{}", origin, href))
    } else {
        None
    }
}
