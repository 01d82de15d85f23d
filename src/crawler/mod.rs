//! Crawler module for fetching and processing seed pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and error classification
//! - A run-wide request throttle
//! - Retry with exponential backoff for transient failures
//! - Cooperative stop handling
//! - Overall run control over a topic map

mod controller;
mod fetcher;
mod retry;
mod stop;
mod throttle;

pub use controller::{Controller, CrawlBatch};
pub use fetcher::{build_http_client, FetchedPage, PageFetcher};
pub use retry::RetryPolicy;
pub use stop::StopSignal;
pub use throttle::Throttle;

use crate::config::Config;
use crate::output::EventSink;
use crate::topics::TopicMap;
use std::sync::Arc;

/// Runs a complete crawl over `topics`
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Compile the extraction rules and build the HTTP client
/// 2. Fetch every topic page under the rate limit
/// 3. Extract a record or a failure for each page
///
/// # Returns
///
/// * `Ok(CrawlBatch)` - The run finished, possibly with per-page failures
/// * `Err(SeedcrawlError)` - The controller could not be built
pub async fn crawl(
    config: &Config,
    topics: &TopicMap,
    events: Arc<dyn EventSink>,
    stop: StopSignal,
) -> crate::Result<CrawlBatch> {
    let controller = Controller::new(config, events, stop)?;
    Ok(controller.run(topics).await)
}
