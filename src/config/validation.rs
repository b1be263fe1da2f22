use crate::config::types::{
    Config, CrawlerConfig, SearchConfig, StorageConfig, UserAgentConfig,
};
use crate::crawler::{MAX_CRAWL_DELAY, MIN_CRAWL_DELAY};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_search_config(&config.search)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_base_url(&config.base_url)?;

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.save_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "save_interval must be >= 1, got {}",
            config.save_interval
        )));
    }

    validate_delay("initial_crawl_delay", config.initial_crawl_delay)?;
    validate_delay("resume_min_delay", config.resume_min_delay)?;

    if config.reorder_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "reorder_interval must be >= 1, got {}",
            config.reorder_interval
        )));
    }

    if config.page_load_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "page_load_timeout must be >= 1s, got {}s",
            config.page_load_timeout
        )));
    }

    if !config.detail_path_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "detail_path_prefix must start with '/', got '{}'",
            config.detail_path_prefix
        )));
    }

    Ok(())
}

/// The base URL doubles as the seed and as the same-origin prefix, so it must
/// be an absolute http(s) URL without a trailing slash.
fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", base_url, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            base_url
        )));
    }

    if base_url.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must not end with '/'",
            base_url
        )));
    }

    Ok(())
}

/// Delays must lie within the bounds the politeness controller keeps
fn validate_delay(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(MIN_CRAWL_DELAY..=MAX_CRAWL_DELAY).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between {}s and {}s, got {}",
            name, MIN_CRAWL_DELAY, MAX_CRAWL_DELAY, value
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("data_dir", &config.data_dir),
        ("ledger_path", &config.ledger_path),
        ("checkpoint_path", &config.checkpoint_path),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.top_k < 1 {
        return Err(ConfigError::Validation(format!(
            "top_k must be >= 1, got {}",
            config.top_k
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
