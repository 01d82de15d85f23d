//! JSON lines record sink
//!
//! One record per line, appended to the target file. A batch is serialized
//! in full before the file is opened, so a serialization error never leaves
//! a half-written batch behind.

use crate::state::PageRecord;
use crate::storage::traits::{RecordSink, SinkResult};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Appends records to a `.jsonl` file
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    /// Creates a sink for `path`, creating parent directories as needed
    pub fn create(path: impl Into<PathBuf>) -> SinkResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonLinesSink {
    fn store(&mut self, records: &[PageRecord]) -> SinkResult<usize> {
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buffer)?;
        file.sync_all()?;

        Ok(records.len())
    }

    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }
}

/// Reads every record from a JSON lines file, skipping blank lines
pub fn read_records(path: &Path) -> SinkResult<Vec<PageRecord>> {
    let file = std::fs::File::open(path)?;
    let mut records = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }

    Ok(records)
}
