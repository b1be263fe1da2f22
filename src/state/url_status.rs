/// Terminal URL status definitions
///
/// Every URL the crawler has finished with lands in exactly one of these sets.
use std::fmt;

/// Represents why a URL is no longer pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// Page was fetched with HTTP 200 and stored
    Visited,

    /// Transient failures exhausted the retry budget
    Failed,

    /// Permanently excluded (404, 403, 443 or a redirect status)
    NeverCrawl,
}

impl UrlStatus {
    /// Converts the status to its checkpoint database representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Visited => "visited",
            Self::Failed => "failed",
            Self::NeverCrawl => "never_crawl",
        }
    }

    /// Parses a status from its checkpoint database representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "visited" => Some(Self::Visited),
            "failed" => Some(Self::Failed),
            "never_crawl" => Some(Self::NeverCrawl),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all() -> [Self; 3] {
        [Self::Visited, Self::Failed, Self::NeverCrawl]
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for status in UrlStatus::all() {
            assert_eq!(UrlStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(UrlStatus::from_db_string("pending"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(UrlStatus::NeverCrawl.to_string(), "never_crawl");
    }
}
