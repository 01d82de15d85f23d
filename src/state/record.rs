//! Output value types: extracted records and page failures

use crate::extract::ExtractedPage;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully extracted page with its provenance
///
/// Records are only built by [`PageRecord::assemble`] and expose read-only
/// accessors, so `content_length` always matches `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    title: String,
    content: String,
    categories: Vec<String>,
    links: Vec<String>,
    source_url: String,
    topic: String,
    fetched_at: DateTime<Utc>,
    content_length: usize,
    success: bool,
}

impl PageRecord {
    /// Attaches provenance to the fields produced by the extraction engine
    pub fn assemble(
        page: ExtractedPage,
        source_url: impl Into<String>,
        topic: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let content_length = page.content.chars().count();

        Self {
            title: page.title,
            content: page.content,
            categories: page.categories,
            links: page.links,
            source_url: source_url.into(),
            topic: topic.into(),
            fetched_at,
            content_length,
            success: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Capture time as RFC 3339 with millisecond precision and a `Z` suffix
    pub fn fetched_at_rfc3339(&self) -> String {
        self.fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Number of characters (not bytes) in the content
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// Why a page produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, timeout, DNS failure
    Network,
    /// Non-2xx response
    HttpStatus,
    /// Response body could not be decoded
    Parse,
    /// Fault inside parsing or extraction
    Extraction,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::Parse => "parse",
            Self::Extraction => "extraction",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "network" => Some(Self::Network),
            "http_status" => Some(Self::HttpStatus),
            "parse" => Some(Self::Parse),
            "extraction" => Some(Self::Extraction),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed page attempt, kept apart from the record stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Topic the page was requested for
    pub topic: String,

    /// The URL that failed
    pub url: String,

    pub kind: FailureKind,

    /// Rendered error message
    pub error_detail: String,

    /// Number of requests issued, including retries
    pub attempts: u32,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} after {} attempt(s)",
            self.url, self.kind, self.error_detail, self.attempts
        )
    }
}
