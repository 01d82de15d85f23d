//! Structured crawl events
//!
//! The controller reports one `PageCompleted` per topic and a final
//! `RunCompleted`. Event sinks decide where those end up.

use crate::output::stats::RunSummary;
use crate::state::{FetchFailure, PageRecord};
use serde::Serialize;
use std::time::Duration;

/// A single observable step of a crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    PageCompleted {
        topic: String,
        url: String,
        success: bool,
        duration_ms: u64,
        /// Characters of body text, zero on failure
        content_length: usize,
        attempts: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RunCompleted {
        fetched: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
        stopped: bool,
    },
}

impl CrawlEvent {
    pub fn page_succeeded(record: &PageRecord, duration: Duration, attempts: u32) -> Self {
        Self::PageCompleted {
            topic: record.topic().to_string(),
            url: record.source_url().to_string(),
            success: true,
            duration_ms: millis(duration),
            content_length: record.content_length(),
            attempts,
            error: None,
        }
    }

    pub fn page_failed(failure: &FetchFailure, duration: Duration) -> Self {
        Self::PageCompleted {
            topic: failure.topic.clone(),
            url: failure.url.clone(),
            success: false,
            duration_ms: millis(duration),
            content_length: 0,
            attempts: failure.attempts,
            error: Some(format!("{}: {}", failure.kind, failure.error_detail)),
        }
    }

    pub fn run_completed(summary: &RunSummary) -> Self {
        Self::RunCompleted {
            fetched: summary.fetched,
            failed: summary.failed,
            skipped: summary.skipped,
            duration_ms: millis(summary.duration),
            stopped: summary.stopped,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Destination for crawl events
///
/// Implementations must tolerate concurrent calls from page workers and must
/// not fail the crawl: write errors are logged and swallowed.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CrawlEvent);
}
