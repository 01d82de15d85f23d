//! Event sink implementations

use crate::output::events::{CrawlEvent, EventSink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Forwards events to `tracing`, tagged with a component name
pub struct TracingSink {
    component: String,
}

impl TracingSink {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::PageCompleted {
                topic,
                url,
                success: true,
                duration_ms,
                content_length,
                attempts,
                ..
            } => {
                info!(
                    component = %self.component,
                    topic = %topic,
                    url = %url,
                    duration_ms,
                    content_length,
                    attempts,
                    "Page extracted"
                );
            }
            CrawlEvent::PageCompleted {
                topic,
                url,
                duration_ms,
                attempts,
                error,
                ..
            } => {
                warn!(
                    component = %self.component,
                    topic = %topic,
                    url = %url,
                    duration_ms,
                    attempts,
                    error = error.as_deref().unwrap_or("unknown"),
                    "Page failed"
                );
            }
            CrawlEvent::RunCompleted {
                fetched,
                failed,
                skipped,
                duration_ms,
                stopped,
            } => {
                info!(
                    component = %self.component,
                    fetched,
                    failed,
                    skipped,
                    duration_ms,
                    stopped,
                    "Crawl run completed"
                );
            }
        }
    }
}

/// Appends events as JSON lines to a file
pub struct JsonLinesEventSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesEventSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for JsonLinesEventSink {
    fn emit(&self, event: &CrawlEvent) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let result = serde_json::to_writer(&mut *writer, event)
            .map_err(std::io::Error::from)
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());

        if let Err(e) = result {
            warn!(error = %e, "Failed to write crawl event");
        }
    }
}

/// Keeps events in memory, mostly for tests and embedding
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<CrawlEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every event emitted so far
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &CrawlEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_event() -> CrawlEvent {
        CrawlEvent::RunCompleted {
            fetched: 1,
            failed: 0,
            skipped: 0,
            duration_ms: 10,
            stopped: false,
        }
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(&run_event());
        sink.emit(&CrawlEvent::RunCompleted {
            fetched: 2,
            failed: 0,
            skipped: 0,
            duration_ms: 10,
            stopped: true,
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], run_event());
    }

    #[test]
    fn test_jsonl_event_sink_writes_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");

        let sink = JsonLinesEventSink::create(&path).unwrap();
        sink.emit(&run_event());
        sink.emit(&run_event());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "run_completed");
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let sink = TracingSink::new("test");
        sink.emit(&run_event());
    }
}
