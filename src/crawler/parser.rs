//! HTML handling for fetched pages
//!
//! This module handles:
//! - Removing `<script>` blocks before a page is written to the page store
//! - Extracting followable links from `<a href>` elements

use crate::url::normalize_link;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use url::Url;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>").expect("SCRIPT_BLOCK: hardcoded regex is valid")
});

/// Capability to find outgoing links in a page
pub trait LinkExtractor {
    /// Returns the normalized absolute links found in `html`
    ///
    /// # Arguments
    ///
    /// * `html` - The page markup
    /// * `page_url` - The URL the page was fetched from, for resolving relative links
    fn extract_links(&self, html: &str, page_url: &str) -> BTreeSet<String>;
}

/// Link extractor built on `scraper`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, `rel="nofollow"` included
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only anchors
/// - Anything that does not resolve to HTTP(S)
///
/// Links are normalized with [`normalize_link`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, html: &str, page_url: &str) -> BTreeSet<String> {
        let Ok(page_url) = Url::parse(page_url) else {
            tracing::debug!(url = %page_url, "Cannot resolve links against unparsable page URL");
            return BTreeSet::new();
        };
        let Ok(selector) = Selector::parse("a[href]") else {
            return BTreeSet::new();
        };

        let document = Html::parse_document(html);
        document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| normalize_link(href, &page_url))
            .collect()
    }
}

/// Removes every `<script>...</script>` block from the markup
///
/// # Example
///
/// ```
/// use forage::crawler::strip_scripts;
///
/// let html = "<p>a</p><script>track()</script><p>b</p>";
/// assert_eq!(strip_scripts(html), "<p>a</p><p>b</p>");
/// ```
pub fn strip_scripts(html: &str) -> String {
    SCRIPT_BLOCK.replace_all(html, "").into_owned()
}
