//! URL handling module for Forage
//!
//! This module provides link normalization, same-origin and extension
//! admissibility checks, and page classification used to prioritize the
//! frontier.

mod normalize;

// Re-export main functions
pub use normalize::{normalize_link, parse_seed_url, strip_trailing_slashes};

/// File extensions that are never worth fetching as pages
pub const FORBIDDEN_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp",
    // Videos
    "mp4", "avi", "mov", "wmv", "flv", "webm",
    // Audio
    "mp3", "wav", "ogg", "flac",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // Archives
    "zip", "rar", "7z", "tar", "gz",
    // Executables
    "exe", "msi", "bin",
    // Web assets and data formats
    "css", "js", "json", "xml",
    // Icons and fonts
    "ico", "ttf", "woff", "woff2",
];

/// Priority class of a pending URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageClass {
    /// A single product page - highest priority
    ProductDetail,
    /// The site root or a numbered listing page (`<base>/<n>`)
    ProductList,
    /// Everything else - lowest priority
    Other,
}

impl PageClass {
    /// Returns a short lowercase label for logs and statistics
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductDetail => "product-detail",
            Self::ProductList => "product-list",
            Self::Other => "other",
        }
    }
}

/// Returns the part of `url` that follows `base`, if `url` is on the same origin
///
/// The remainder must be empty or start with `/`, `?` or `#`, so
/// `https://example.org.evil.com` is not considered to be under
/// `https://example.org`.
///
/// # Examples
///
/// ```
/// use forage::url::relative_path;
///
/// assert_eq!(relative_path("https://example.org/a/b", "https://example.org"), Some("/a/b"));
/// assert_eq!(relative_path("https://example.org", "https://example.org"), Some(""));
/// assert_eq!(relative_path("https://example.org.evil.com/", "https://example.org"), None);
/// ```
pub fn relative_path<'a>(url: &'a str, base: &str) -> Option<&'a str> {
    let rest = url.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
        Some(rest)
    } else {
        None
    }
}

/// Checks whether the URL ends in one of the forbidden extensions
pub fn has_forbidden_extension(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    FORBIDDEN_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .map(|head| head.ends_with('.'))
            .unwrap_or(false)
    })
}

/// Classifies a URL into its frontier priority class
///
/// # Arguments
///
/// * `url` - Absolute URL to classify
/// * `base` - Configured site origin
/// * `detail_prefix` - Path prefix of product-detail pages (e.g. `/product/`)
pub fn classify_page(url: &str, base: &str, detail_prefix: &str) -> PageClass {
    let Some(path) = relative_path(url, base) else {
        return PageClass::Other;
    };

    if path.starts_with(detail_prefix) {
        return PageClass::ProductDetail;
    }

    let is_listing = path.is_empty()
        || path
            .strip_prefix('/')
            .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);

    if is_listing {
        PageClass::ProductList
    } else {
        PageClass::Other
    }
}

/// Parses the trailing numeric path segment of a URL (`.../42` -> 42)
///
/// Returns `None` when the last segment is not a number or does not fit in a `u64`.
pub fn trailing_number(url: &str) -> Option<u64> {
    let (_, last) = url.rsplit_once('/')?;
    if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    last.parse().ok()
}
