//! Output module for crawl events and reports
//!
//! This module handles:
//! - Structured per-page and per-run events
//! - Event sinks (tracing, JSON lines, in-memory)
//! - Run summaries and statistics from stored records

mod events;
mod sinks;
pub mod stats;

pub use events::{CrawlEvent, EventSink};
pub use sinks::{JsonLinesEventSink, MemorySink, TracingSink};
pub use stats::{load_statistics, print_statistics, print_summary, RunSummary, StoredStatistics};

use crate::config::{EventSinkKind, EventsConfig};
use std::path::Path;
use std::sync::Arc;

/// Builds the event sink selected by the events config
///
/// # Arguments
///
/// * `config` - Events section of the crawler config
/// * `component` - Name attached to tracing output
pub fn build_event_sink(
    config: &EventsConfig,
    component: &str,
) -> std::io::Result<Arc<dyn EventSink>> {
    match (config.sink, config.path.as_deref()) {
        (EventSinkKind::Jsonl, Some(path)) => {
            Ok(Arc::new(JsonLinesEventSink::create(Path::new(path))?))
        }
        (EventSinkKind::Jsonl, None) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "the jsonl event sink needs a path",
        )),
        (EventSinkKind::Tracing, _) => Ok(Arc::new(TracingSink::new(component))),
    }
}
