use crate::config::TopicEntry;
use crate::topics::TopicMap;
use crate::ConfigResult;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Supplies the ordered seed topics for a run
pub trait TopicSource {
    fn load_topics(&self) -> ConfigResult<TopicMap>;
}

/// Topics written inline in the main config as `[[topic]]` tables
pub struct InlineTopics<'a> {
    entries: &'a [TopicEntry],
}

impl<'a> InlineTopics<'a> {
    pub fn new(entries: &'a [TopicEntry]) -> Self {
        Self { entries }
    }
}

impl TopicSource for InlineTopics<'_> {
    fn load_topics(&self) -> ConfigResult<TopicMap> {
        TopicMap::from_entries(self.entries)
    }
}

/// A standalone TOML file holding `[[topic]]` tables
pub struct TopicFile {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TopicFileContents {
    #[serde(rename = "topic", default)]
    topics: Vec<TopicEntry>,
}

impl TopicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TopicSource for TopicFile {
    fn load_topics(&self) -> ConfigResult<TopicMap> {
        let content = std::fs::read_to_string(&self.path)?;
        let parsed: TopicFileContents = toml::from_str(&content)?;
        TopicMap::from_entries(&parsed.topics)
    }
}
