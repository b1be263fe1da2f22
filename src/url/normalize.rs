use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a link found on a page into Forage's canonical URL form
///
/// # Normalization Steps
///
/// 1. Skip empty hrefs, fragment-only anchors and `javascript:`, `mailto:`,
///    `tel:`, `data:` links
/// 2. Resolve the href against the page URL
/// 3. Reject anything that is not HTTP(S) after resolution
/// 4. Upgrade `http://` to `https://` when the page itself was served over HTTPS
/// 5. Remove the fragment
/// 6. Remove trailing slashes (the site root loses its `/` too)
///
/// # Arguments
///
/// * `href` - The raw `href` attribute value
/// * `page_url` - The URL of the page the link was found on
///
/// # Returns
///
/// * `Some(String)` - The absolute, normalized link
/// * `None` - The link should not be followed
///
/// # Examples
///
/// ```
/// use forage::url::normalize_link;
/// use url::Url;
///
/// let page = Url::parse("https://example.org/list/2").unwrap();
/// assert_eq!(normalize_link("/product/7/", &page), Some("https://example.org/product/7".to_string()));
/// assert_eq!(normalize_link("http://example.org/", &page), Some("https://example.org".to_string()));
/// assert_eq!(normalize_link("mailto:me@example.org", &page), None);
/// ```
pub fn normalize_link(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut url = page_url.join(href).ok()?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if page_url.scheme() == "https" {
                url.set_scheme("https").ok()?;
            }
        }
        _ => return None,
    }

    url.set_fragment(None);

    Some(strip_trailing_slashes(url.as_str()).to_string())
}

/// Removes every trailing `/` from a URL string
pub fn strip_trailing_slashes(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Parses a user-supplied absolute URL into canonical form
///
/// Used for URLs typed on the command line, which must be absolute HTTP(S)
/// URLs with a host. The fragment and trailing slashes are removed.
pub fn parse_seed_url(input: &str) -> UrlResult<String> {
    let mut url = Url::parse(input.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", input, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(strip_trailing_slashes(url.as_str()).to_string())
}
