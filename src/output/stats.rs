//! Run summaries and stored statistics
//!
//! This module provides functionality for summarizing a finished crawl run
//! and for displaying statistics from a SQLite record database.

use crate::state::{FailureKind, FetchFailure};
use crate::storage::{RunRecord, SinkResult, SqliteReaderRef};
use std::collections::HashMap;
use std::time::Duration;

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Topics in the input map
    pub attempted: usize,

    /// Pages that produced a record
    pub fetched: usize,

    /// Pages that produced a failure
    pub failed: usize,

    /// Pages never started because a stop was requested
    pub skipped: usize,

    pub duration: Duration,

    /// True if a stop was requested during the run
    pub stopped: bool,
}

impl RunSummary {
    /// Percentage of attempted topics that produced a record
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            (self.fetched as f64 / self.attempted as f64) * 100.0
        }
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary, failures: &[FetchFailure]) {
    println!("=== Crawl Summary ===\n");

    println!("  Topics: {}", summary.attempted);
    println!("  Extracted: {}", summary.fetched);
    println!("  Failed: {}", summary.failed);
    if summary.skipped > 0 {
        println!("  Skipped: {}", summary.skipped);
    }
    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
    if summary.stopped {
        println!("  Stopped early on request");
    }
    println!();

    if !failures.is_empty() {
        println!("Failures:");
        for failure in failures {
            println!("  - [{}] {}", failure.topic, failure);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} topics extracted)",
        summary.success_rate(),
        summary.fetched,
        summary.attempted
    );
}

/// Statistics read back from a SQLite record database
#[derive(Debug, Clone)]
pub struct StoredStatistics {
    pub latest_run: Option<RunRecord>,
    pub total_runs: u64,
    pub total_records: u64,
    pub distinct_topics: u64,
    pub total_links: u64,
    pub total_content_length: u64,
    pub total_failures: u64,
    pub failures_by_kind: HashMap<FailureKind, u64>,
}

/// Loads statistics from a record database
pub fn load_statistics(reader: &SqliteReaderRef<'_>) -> SinkResult<StoredStatistics> {
    Ok(StoredStatistics {
        latest_run: reader.latest_run()?,
        total_runs: reader.count_runs()?,
        total_records: reader.count_records()?,
        distinct_topics: reader.count_topics()?,
        total_links: reader.count_links()?,
        total_content_length: reader.total_content_length()?,
        total_failures: reader.count_failures()?,
        failures_by_kind: reader.failures_by_kind()?,
    })
}

/// Prints stored statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoredStatistics) {
    println!("=== Record Database Statistics ===\n");

    println!("Overview:");
    println!("  Runs: {}", stats.total_runs);
    println!("  Records: {}", stats.total_records);
    println!("  Distinct topics: {}", stats.distinct_topics);
    println!("  Links recorded: {}", stats.total_links);
    println!("  Body text: {} characters", stats.total_content_length);
    if stats.total_records > 0 {
        println!(
            "  Average body: {} characters",
            stats.total_content_length / stats.total_records
        );
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Id: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!("  Config hash: {}", run.config_hash);
        println!();
    }

    if !stats.failures_by_kind.is_empty() {
        println!("Failures ({}):", stats.total_failures);
        let mut counts: Vec<_> = stats.failures_by_kind.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        for (kind, count) in counts {
            println!("  {}: {}", kind, count);
        }
    }
}
