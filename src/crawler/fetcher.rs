//! Page fetching
//!
//! The crawl loop talks to the network only through the [`Fetcher`] trait so
//! tests can drive it with scripted responses. [`HttpFetcher`] is the
//! production implementation on top of `reqwest`.
//!
//! Redirects are never followed: a 301/302 is reported back as a status code
//! and the crawl loop excludes the URL.

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A page returned by a fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code of the response
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Fetch failures, as seen by the crawl loop
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The page did not load within the configured timeout
    #[error("page load timed out")]
    Timeout,

    /// The fetch mechanism itself is broken and must be reinitialized
    #[error("fetcher fault: {0}")]
    DriverFault(String),

    /// The server answered with a non-success status
    #[error("HTTP {0}")]
    Http(u16),

    #[error("{0}")]
    Other(String),
}

/// Capability to load one page at a time
///
/// Implementations are used strictly sequentially by the crawl loop.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Loads `url`; non-200 statuses may be reported either as an `Ok` page
    /// carrying the status or as `FetchError::Http`
    async fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError>;

    /// Rebuilds the fetch mechanism after a [`FetchError::DriverFault`]
    async fn reinitialize(&mut self) -> Result<(), FetchError>;
}

/// Builds the HTTP client used for page fetches
///
/// Redirects are not followed, so 301 and 302 reach the crawl loop.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout (the page-load timeout)
///
/// # Example
///
/// ```no_run
/// use forage::config::UserAgentConfig;
/// use forage::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "forage".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_email: "crawler@example.org".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    client_builder(config, timeout)
        .redirect(Policy::none())
        .build()
}

/// Builds the client for the one-off robots.txt fetch, which follows redirects
pub fn build_robots_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    client_builder(config, timeout)
        .redirect(Policy::limited(ROBOTS_MAX_REDIRECTS))
        .build()
}

const ROBOTS_MAX_REDIRECTS: usize = 10;

fn client_builder(config: &UserAgentConfig, timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
}

/// `reqwest`-backed fetcher
pub struct HttpFetcher {
    client: Client,
    user_agent: UserAgentConfig,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&user_agent, timeout)?;
        Ok(Self {
            client,
            user_agent,
            timeout,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response.text().await.map_err(classify_error)?;
        Ok(FetchedPage {
            status: status.as_u16(),
            body,
        })
    }

    async fn reinitialize(&mut self) -> Result<(), FetchError> {
        tracing::info!("Rebuilding HTTP client");
        self.client = build_http_client(&self.user_agent, self.timeout)
            .map_err(|e| FetchError::DriverFault(e.to_string()))?;
        Ok(())
    }
}

fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() || error.is_builder() {
        FetchError::DriverFault(error.to_string())
    } else {
        FetchError::Other(error.to_string())
    }
}
