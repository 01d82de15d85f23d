use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Seedcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub site: SiteConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub events: EventsConfig,
    /// Inline seed topics, in file order
    #[serde(rename = "topic", default)]
    pub topics: Vec<TopicEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Minimum time between two requests, in seconds
    pub rate_limit_delay: f64,

    /// Per-request timeout, in seconds
    pub request_timeout: u64,

    /// Number of pages processed at once
    pub max_concurrent_pages: u32,

    /// Retries for transient failures (network errors, 429/502/503/504)
    pub max_retries: u32,

    /// Base backoff before the first retry, in milliseconds; doubles per attempt
    pub retry_backoff: u64,
}

impl CrawlerConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay: 1.0,
            request_timeout: 30,
            max_concurrent_pages: 1,
            max_retries: 2,
            retry_backoff: 500,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    /// Product token sent in the User-Agent header
    pub product: String,

    /// Product version
    pub version: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Product/Version`
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.product, self.version)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            product: "WikipediaScraper".to_string(),
            version: "1.0".to_string(),
        }
    }
}

/// Site layout: where the interesting parts of a page live
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SiteConfig {
    /// Scheme and host prepended to relative content links
    pub origin: String,

    /// Path prefix shared by all content pages
    pub content_path_prefix: String,

    pub title_selector: String,
    pub content_selector: String,
    pub category_selector: String,
    pub category_item_selector: String,

    /// Subtrees skipped when flattening the content container
    pub noise_selectors: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://en.wikipedia.org".to_string(),
            content_path_prefix: "/wiki/".to_string(),
            title_selector: "h1#firstHeading".to_string(),
            content_selector: "div#mw-content-text".to_string(),
            category_selector: "div#mw-normal-catlinks".to_string(),
            category_item_selector: "a".to_string(),
            noise_selectors: vec![
                "sup".to_string(),
                "span.mw-editsection".to_string(),
                "table.infobox".to_string(),
            ],
        }
    }
}

/// Record sink output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Storage format for extracted records
    #[serde(default)]
    pub format: OutputFormat,

    /// Destination file (JSON lines file or SQLite database)
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Sqlite,
}

/// Where structured crawl events go
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsConfig {
    #[serde(default)]
    pub sink: EventSinkKind,

    /// Event log file, required for the `jsonl` sink
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    #[default]
    Tracing,
    Jsonl,
}

/// A seed topic as written in a config or topics file
#[derive(Debug, Clone, Deserialize)]
pub struct TopicEntry {
    /// Topic label attached to the extracted record
    pub name: String,

    /// Page to fetch for this topic
    pub url: String,
}
