//! Sink traits and error types
//!
//! This module defines the trait interface for record sinks and the
//! associated error type.

use crate::state::{FetchFailure, PageRecord};
use thiserror::Error;

/// Errors that can occur while persisting a batch
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for persistence sinks
///
/// Sinks borrow the batch, so when a write fails the caller still owns every
/// record and decides whether to retry or fall back elsewhere.
pub trait RecordSink {
    /// Durably stores a batch of records
    ///
    /// # Returns
    ///
    /// The number of records written
    fn store(&mut self, records: &[PageRecord]) -> SinkResult<usize>;

    /// Stores failed page attempts alongside the records
    ///
    /// Sinks without a place for failures accept and drop them; failures are
    /// always reported through the event sink as well.
    fn store_failures(&mut self, failures: &[FetchFailure]) -> SinkResult<()> {
        let _ = failures;
        Ok(())
    }

    /// Marks the end of the run
    fn finish(&mut self, interrupted: bool) -> SinkResult<()> {
        let _ = interrupted;
        Ok(())
    }

    /// Short name used in log messages
    fn describe(&self) -> String;
}
