//! Seedcrawl: a polite single-site content crawler
//!
//! This crate fetches a fixed set of seed pages keyed by topic, extracts the title,
//! body text, categories and same-site links from each one, and hands the resulting
//! records to a persistence sink. Discovered links are recorded, never followed.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod storage;
pub mod topics;

use thiserror::Error;

/// Main error type for Seedcrawl operations
///
/// Only configuration, client construction and sink failures reach this type.
/// Everything that goes wrong while crawling a single page is contained in a
/// [`state::FetchFailure`] instead.
#[derive(Debug, Error)]
pub enum SeedcrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Errors raised while processing a single page
///
/// These never escape the crawl controller: each one is turned into a
/// [`state::FetchFailure`] carrying the URL and the rendered message.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Failed to decode response body: {message}")]
    Parse { message: String },

    #[error("Extraction fault: {message}")]
    Extraction { message: String },
}

impl PageError {
    /// Classifies a reqwest error raised while sending a request
    pub fn from_transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        Self::Network { message }
    }

    /// Classifies a reqwest error raised while reading a response body
    pub fn from_body(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse {
                message: err.to_string(),
            }
        } else {
            Self::from_transport(err)
        }
    }

    /// Returns the failure kind recorded for this error
    pub fn kind(&self) -> state::FailureKind {
        match self {
            Self::Network { .. } => state::FailureKind::Network,
            Self::HttpStatus { .. } => state::FailureKind::HttpStatus,
            Self::Parse { .. } => state::FailureKind::Parse,
            Self::Extraction { .. } => state::FailureKind::Extraction,
        }
    }

    /// Returns true if a later attempt could plausibly succeed
    ///
    /// Network errors and HTTP 429/502/503/504 are transient. Everything else
    /// fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::HttpStatus { status } => matches!(status, 429 | 502 | 503 | 504),
            Self::Parse { .. } | Self::Extraction { .. } => false,
        }
    }
}

/// Result type alias for Seedcrawl operations
pub type Result<T> = std::result::Result<T, SeedcrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Controller, CrawlBatch, StopSignal};
pub use extract::{extract, extract_html, ExtractedPage, ExtractionRules};
pub use state::{FailureKind, FetchFailure, PageRecord, PageState};
pub use topics::{Topic, TopicMap};
