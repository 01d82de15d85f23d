//! Storage module for persisting crawl output
//!
//! This module handles everything that happens to a batch after the crawl:
//! - JSON lines and SQLite record sinks
//! - Failure persistence where the sink supports it
//! - Run tracking for the SQLite sink

mod jsonl;
mod schema;
mod sqlite;
mod traits;

pub use jsonl::{read_records, JsonLinesSink};
pub use sqlite::{SqliteReader, SqliteReaderRef, SqliteSink};
pub use traits::{RecordSink, SinkError, SinkResult};

use crate::config::{OutputConfig, OutputFormat};
use crate::crawler::CrawlBatch;
use std::path::{Path, PathBuf};

/// Opens the record sink selected by the output config
///
/// # Arguments
///
/// * `config` - Output section of the crawler config
/// * `config_hash` - Hash recorded on the run row by sinks that track runs
pub fn open_sink(config: &OutputConfig, config_hash: &str) -> SinkResult<Box<dyn RecordSink>> {
    let path = Path::new(&config.path);
    match config.format {
        OutputFormat::Jsonl => Ok(Box::new(JsonLinesSink::create(path)?)),
        OutputFormat::Sqlite => Ok(Box::new(SqliteSink::open(path, config_hash)?)),
    }
}

/// Writes a finished batch: records, then failures, then the run status
///
/// Returns the number of records stored. On error the batch is untouched and
/// still owned by the caller.
pub fn persist_batch(sink: &mut dyn RecordSink, batch: &CrawlBatch) -> SinkResult<usize> {
    let stored = sink.store(&batch.records)?;
    sink.store_failures(&batch.failures)?;
    sink.finish(batch.summary.stopped)?;
    Ok(stored)
}

/// Path used to rescue records when the configured sink fails
pub fn fallback_path(config: &OutputConfig) -> PathBuf {
    let mut name = Path::new(&config.path)
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "records".into());
    name.push(".unsaved.jsonl");
    Path::new(&config.path).with_file_name(name)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}
