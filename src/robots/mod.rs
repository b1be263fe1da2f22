//! Robots.txt handling module
//!
//! The crawler targets a single site, so robots.txt is fetched exactly once at
//! startup. A failed fetch aborts the crawl rather than crawling without rules.

mod parser;

pub use parser::RobotsRules;

use crate::ForageError;
use reqwest::Client;

/// Fetches and parses `<base_url>/robots.txt`
///
/// # Arguments
///
/// * `client` - The HTTP client (carries the crawler's user agent and follows redirects)
/// * `base_url` - The site origin, without a trailing slash
///
/// # Returns
///
/// * `Ok(RobotsRules)` - Disallow patterns of the wildcard group
/// * `Err(ForageError::Startup)` - The file could not be fetched
pub async fn fetch_robots(client: &Client, base_url: &str) -> Result<RobotsRules, ForageError> {
    let robots_url = format!("{}/robots.txt", base_url);
    tracing::info!(url = %robots_url, "Fetching robots.txt");

    let response = client
        .get(&robots_url)
        .send()
        .await
        .map_err(|e| ForageError::Startup(format!("Failed to fetch {}: {}", robots_url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ForageError::Startup(format!(
            "Failed to fetch {}: HTTP {}",
            robots_url,
            status.as_u16()
        )));
    }

    let content = response
        .text()
        .await
        .map_err(|e| ForageError::Startup(format!("Failed to read {}: {}", robots_url, e)))?;

    let rules = RobotsRules::from_content(&content);
    tracing::info!("Loaded {} robots.txt disallow rules", rules.len());
    tracing::debug!(patterns = ?rules.patterns().collect::<Vec<_>>(), "Robots disallow patterns");
    Ok(rules)
}
