//! Extraction engine: markup tree to typed page fields
//!
//! Extraction is a pure function of the parsed document and the compiled
//! [`ExtractionRules`]. It performs no I/O, never mutates the tree and never
//! fails: each field is located independently and falls back to a sentinel or
//! an empty value when its element is missing.
//!
//! Malformed markup is the parser's problem, not ours. `Html::parse_document`
//! recovers from unclosed tags and stray bytes the way browsers do, and the
//! engine works on whatever tree comes out.
//!
//! # Example
//!
//! ```
//! use seedcrawl::extract::{extract_html, ExtractionRules};
//!
//! let html = r#"<h1 id="firstHeading">Dog</h1>
//!     <div id="mw-content-text"><p>Dogs are mammals.<sup>[1]</sup></p></div>"#;
//! let page = extract_html(html, &ExtractionRules::default());
//! assert_eq!(page.title, "Dog");
//! assert_eq!(page.content, "Dogs are mammals.");
//! ```

mod links;
mod rules;
mod text;

pub use links::to_content_link;
pub use rules::ExtractionRules;

use scraper::Html;

/// Title used when the page has no primary heading
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Fields extracted from a single page, before provenance is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Primary heading text, or [`UNKNOWN_TITLE`]
    pub title: String,

    /// Body text with noise removed, one block per line
    pub content: String,

    /// Category labels in document order
    pub categories: Vec<String>,

    /// Absolute same-site content links in document order
    pub links: Vec<String>,
}

/// Extracts all page fields from a parsed document
///
/// When a selector that should be unique matches several elements, the first
/// one in document order is used.
pub fn extract(document: &Html, rules: &ExtractionRules) -> ExtractedPage {
    ExtractedPage {
        title: extract_title(document, rules),
        content: extract_content(document, rules),
        categories: extract_categories(document, rules),
        links: links::content_links(document, rules),
    }
}

/// Parses raw markup and extracts it
pub fn extract_html(html: &str, rules: &ExtractionRules) -> ExtractedPage {
    let document = Html::parse_document(html);
    extract(&document, rules)
}

fn extract_title(document: &Html, rules: &ExtractionRules) -> String {
    document
        .select(&rules.title)
        .next()
        .map(|heading| heading.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

fn extract_content(document: &Html, rules: &ExtractionRules) -> String {
    document
        .select(&rules.content)
        .next()
        .map(|container| text::flatten_text(container, &rules.noise))
        .unwrap_or_default()
}

fn extract_categories(document: &Html, rules: &ExtractionRules) -> Vec<String> {
    let Some(container) = document.select(&rules.categories).next() else {
        return Vec::new();
    };

    container
        .select(&rules.category_item)
        .map(|item| item.text().collect::<String>().trim().to_string())
        .collect()
}
