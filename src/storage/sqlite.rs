//! SQLite record sink
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.
//! Each sink instance owns one row in `runs`; every batch it stores is tied to
//! that run.

use crate::extract::ExtractedPage;
use crate::state::{FailureKind, FetchFailure, PageRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, SinkError, SinkResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// SQLite record sink
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
    location: PathBuf,
}

impl SqliteSink {
    /// Opens or creates the database and starts a new run
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config_hash` - Hash of the config the run was started with
    pub fn open(path: &Path, config_hash: &str) -> SinkResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Self::with_connection(conn, config_hash, path.to_path_buf())
    }

    /// Creates an in-memory database
    pub fn open_in_memory(config_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Self::with_connection(conn, config_hash, PathBuf::from(":memory:"))
    }

    /// Opens an existing database without starting a run, for reporting
    ///
    /// Fails if the file does not exist; nothing is created or written.
    pub fn open_read_only(path: &Path) -> SinkResult<SqliteReader> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(SqliteReader { conn })
    }

    fn with_connection(conn: Connection, config_hash: &str, location: PathBuf) -> SinkResult<Self> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = conn.last_insert_rowid();

        Ok(Self {
            conn,
            run_id,
            location,
        })
    }

    /// Returns the id of the run this sink writes to
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Returns a read handle over the same connection
    pub fn reader(&self) -> SqliteReaderRef<'_> {
        SqliteReaderRef { conn: &self.conn }
    }

    fn set_status(&mut self, status: RunStatus) -> SinkResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, self.run_id],
        )?;
        Ok(())
    }
}

impl RecordSink for SqliteSink {
    fn store(&mut self, records: &[PageRecord]) -> SinkResult<usize> {
        // One transaction per batch: either every record lands or none do
        let tx = self.conn.transaction()?;

        for record in records {
            tx.execute(
                "INSERT INTO pages (run_id, topic, title, content, source_url, fetched_at, content_length, success)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    self.run_id,
                    record.topic(),
                    record.title(),
                    record.content(),
                    record.source_url(),
                    record
                        .fetched_at()
                        .to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    record.content_length() as i64,
                    record.success(),
                ],
            )?;
            let page_id = tx.last_insert_rowid();

            for (position, name) in record.categories().iter().enumerate() {
                tx.execute(
                    "INSERT INTO page_categories (page_id, position, name) VALUES (?1, ?2, ?3)",
                    params![page_id, position as i64, name],
                )?;
            }

            for (position, url) in record.links().iter().enumerate() {
                tx.execute(
                    "INSERT INTO page_links (page_id, position, url) VALUES (?1, ?2, ?3)",
                    params![page_id, position as i64, url],
                )?;
            }
        }

        tx.commit()?;
        Ok(records.len())
    }

    fn store_failures(&mut self, failures: &[FetchFailure]) -> SinkResult<()> {
        let tx = self.conn.transaction()?;

        for failure in failures {
            tx.execute(
                "INSERT INTO fetch_failures (run_id, topic, url, kind, error_detail, attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    self.run_id,
                    failure.topic,
                    failure.url,
                    failure.kind.as_str(),
                    failure.error_detail,
                    failure.attempts as i64,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self, interrupted: bool) -> SinkResult<()> {
        let status = if interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.set_status(status)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.location.display())
    }
}

/// Read-only view of a record database
pub struct SqliteReader {
    conn: Connection,
}

impl SqliteReader {
    pub fn queries(&self) -> SqliteReaderRef<'_> {
        SqliteReaderRef { conn: &self.conn }
    }
}

/// Borrowed query handle shared by [`SqliteSink`] and [`SqliteReader`]
pub struct SqliteReaderRef<'a> {
    conn: &'a Connection,
}

impl SqliteReaderRef<'_> {
    pub fn latest_run(&self) -> SinkResult<Option<RunRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, started_at, finished_at, config_hash, status)) = row else {
            return Ok(None);
        };
        let status = RunStatus::from_db_string(&status)
            .ok_or_else(|| SinkError::Corrupt(format!("unknown run status '{}'", status)))?;

        Ok(Some(RunRecord {
            id,
            started_at,
            finished_at,
            config_hash,
            status,
        }))
    }

    pub fn count_runs(&self) -> SinkResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }

    pub fn count_records(&self) -> SinkResult<u64> {
        self.count("SELECT COUNT(*) FROM pages")
    }

    pub fn count_failures(&self) -> SinkResult<u64> {
        self.count("SELECT COUNT(*) FROM fetch_failures")
    }

    pub fn count_topics(&self) -> SinkResult<u64> {
        self.count("SELECT COUNT(DISTINCT topic) FROM pages")
    }

    pub fn count_links(&self) -> SinkResult<u64> {
        self.count("SELECT COUNT(*) FROM page_links")
    }

    pub fn total_content_length(&self) -> SinkResult<u64> {
        self.count("SELECT COALESCE(SUM(content_length), 0) FROM pages")
    }

    /// Returns failure counts keyed by failure kind
    pub fn failures_by_kind(&self) -> SinkResult<HashMap<FailureKind, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM fetch_failures GROUP BY kind")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = HashMap::new();
        for row in rows {
            let (kind, count) = row?;
            let kind = FailureKind::from_db_string(&kind)
                .ok_or_else(|| SinkError::Corrupt(format!("unknown failure kind '{}'", kind)))?;
            summary.insert(kind, count as u64);
        }

        Ok(summary)
    }

    /// Loads every stored record of a run in insertion order
    pub fn load_records(&self, run_id: i64) -> SinkResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, topic, title, content, source_url, fetched_at
             FROM pages WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (page_id, topic, title, content, source_url, fetched_at) in rows {
            let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
                .map_err(|e| SinkError::Corrupt(format!("fetched_at '{}': {}", fetched_at, e)))?
                .with_timezone(&Utc);

            let page = ExtractedPage {
                title,
                content,
                categories: self.ordered_column(
                    "SELECT name FROM page_categories WHERE page_id = ?1 ORDER BY position",
                    page_id,
                )?,
                links: self.ordered_column(
                    "SELECT url FROM page_links WHERE page_id = ?1 ORDER BY position",
                    page_id,
                )?,
            };

            records.push(PageRecord::assemble(page, source_url, topic, fetched_at));
        }

        Ok(records)
    }

    /// Loads every stored failure of a run in insertion order
    pub fn load_failures(&self, run_id: i64) -> SinkResult<Vec<FetchFailure>> {
        let mut stmt = self.conn.prepare(
            "SELECT topic, url, kind, error_detail, attempts
             FROM fetch_failures WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(topic, url, kind, error_detail, attempts)| {
                let kind = FailureKind::from_db_string(&kind)
                    .ok_or_else(|| SinkError::Corrupt(format!("unknown failure kind '{}'", kind)))?;
                Ok(FetchFailure {
                    topic,
                    url,
                    kind,
                    error_detail,
                    attempts: attempts as u32,
                })
            })
            .collect()
    }

    fn ordered_column(&self, sql: &str, page_id: i64) -> SinkResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map(params![page_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn count(&self, sql: &str) -> SinkResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(topic: &str) -> PageRecord {
        let page = ExtractedPage {
            title: topic.to_string(),
            content: format!("{} content", topic),
            categories: vec!["Zeta".to_string(), "Alpha".to_string()],
            links: vec![
                "https://en.wikipedia.org/wiki/B".to_string(),
                "https://en.wikipedia.org/wiki/A".to_string(),
            ],
        };
        PageRecord::assemble(
            page,
            format!("https://en.wikipedia.org/wiki/{}", topic),
            topic,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_open_in_memory_starts_run() {
        let sink = SqliteSink::open_in_memory("hash").unwrap();
        assert!(sink.run_id() > 0);

        let run = sink.reader().latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "hash");
    }

    #[test]
    fn test_store_preserves_order_and_fields() {
        let mut sink = SqliteSink::open_in_memory("hash").unwrap();
        let records = vec![record("Dog"), record("Cat")];

        assert_eq!(sink.store(&records).unwrap(), 2);

        let loaded = sink.reader().load_records(sink.run_id()).unwrap();
        assert_eq!(loaded, records);
        assert_eq!(loaded[0].categories(), &["Zeta".to_string(), "Alpha".to_string()]);
    }

    #[test]
    fn test_store_failures() {
        let mut sink = SqliteSink::open_in_memory("hash").unwrap();
        let failure = FetchFailure {
            topic: "Ghost".to_string(),
            url: "https://en.wikipedia.org/wiki/Ghost".to_string(),
            kind: FailureKind::HttpStatus,
            error_detail: "HTTP status 404".to_string(),
            attempts: 1,
        };

        sink.store_failures(std::slice::from_ref(&failure)).unwrap();

        let reader = sink.reader();
        assert_eq!(reader.load_failures(sink.run_id()).unwrap(), vec![failure]);
        assert_eq!(
            reader.failures_by_kind().unwrap().get(&FailureKind::HttpStatus),
            Some(&1)
        );
    }

    #[test]
    fn test_finish_sets_status() {
        let mut sink = SqliteSink::open_in_memory("hash").unwrap();
        sink.finish(true).unwrap();

        let run = sink.reader().latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_runs_accumulate_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("records.db");

        let mut first = SqliteSink::open(&path, "a").unwrap();
        first.store(&[record("Dog")]).unwrap();
        first.finish(false).unwrap();
        drop(first);

        let mut second = SqliteSink::open(&path, "b").unwrap();
        second.store(&[record("Cat")]).unwrap();
        second.finish(false).unwrap();
        drop(second);

        let reader = SqliteSink::open_read_only(&path).unwrap();
        let stats = reader.queries();
        assert_eq!(stats.count_runs().unwrap(), 2);
        assert_eq!(stats.count_records().unwrap(), 2);
        assert_eq!(stats.count_topics().unwrap(), 2);
        assert_eq!(stats.count_links().unwrap(), 4);
    }

    #[test]
    fn test_read_only_open_does_not_create_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.db");

        assert!(matches!(
            SqliteSink::open_read_only(&path),
            Err(SinkError::Sqlite(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_statistics_on_empty_database() {
        let sink = SqliteSink::open_in_memory("hash").unwrap();
        let reader = sink.reader();
        assert_eq!(reader.count_records().unwrap(), 0);
        assert_eq!(reader.total_content_length().unwrap(), 0);
        assert!(reader.failures_by_kind().unwrap().is_empty());
    }
}
