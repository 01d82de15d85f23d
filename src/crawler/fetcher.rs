//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent
//! - GET requests for seed pages
//! - Error classification into [`PageError`]
//!
//! Redirects are followed with reqwest's default policy. Retries and rate
//! limiting live in the controller, not here.

use crate::config::UserAgentConfig;
use crate::PageError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

/// A successfully fetched page body
#[derive(Debug)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// Decoded response body
    pub body: String,

    /// When the 2xx response arrived
    pub fetched_at: DateTime<Utc>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total per-request timeout
///
/// # Example
///
/// ```no_run
/// use seedcrawl::config::UserAgentConfig;
/// use seedcrawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests and classifies the outcome
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a single page
    ///
    /// Any non-2xx status is an error; the body of an error response is
    /// never read.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, PageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(PageError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let fetched_at = Utc::now();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(PageError::from_body)?;

        Ok(FetchedPage {
            final_url,
            body,
            fetched_at,
        })
    }
}
