use crate::config::TopicEntry;
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use url::Url;

/// A topic label and the page fetched for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub url: String,
}

/// Ordered, validated mapping from topic label to seed URL
///
/// Iteration order is insertion order. Labels are unique and every URL is an
/// absolute http(s) URL, so the controller never has to re-check either.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMap {
    topics: Vec<Topic>,
}

impl TopicMap {
    /// Builds a map from config entries, rejecting an empty list
    pub fn from_entries(entries: &[TopicEntry]) -> ConfigResult<Self> {
        Self::from_pairs(entries.iter().map(|e| (e.name.as_str(), e.url.as_str())))
    }

    /// Builds a map from `(label, url)` pairs, rejecting an empty list
    ///
    /// # Example
    ///
    /// ```
    /// use seedcrawl::TopicMap;
    ///
    /// let topics = TopicMap::from_pairs([("Dog", "https://en.wikipedia.org/wiki/Dog")]).unwrap();
    /// assert_eq!(topics.len(), 1);
    /// assert!(TopicMap::from_pairs(Vec::<(&str, &str)>::new()).is_err());
    /// ```
    pub fn from_pairs<I, N, U>(pairs: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let mut map = Self::default();
        for (name, url) in pairs {
            map.insert(name, url)?;
        }

        if map.is_empty() {
            return Err(ConfigError::Validation(
                "at least one topic is required".to_string(),
            ));
        }

        Ok(map)
    }

    /// Appends a topic, keeping insertion order
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> ConfigResult<()> {
        let name = name.into();
        let url = url.into();

        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "topic name cannot be empty".to_string(),
            ));
        }

        if self.get(&name).is_some() {
            return Err(ConfigError::Validation(format!(
                "duplicate topic '{}'",
                name
            )));
        }

        let parsed = Url::parse(&url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid URL '{}' for topic '{}': {}", url, name, e))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "URL '{}' for topic '{}' must use http or https",
                url, name
            )));
        }

        self.topics.push(Topic { name, url });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Topic> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Returns the set of distinct hosts the map points at
    pub fn hosts(&self) -> HashSet<String> {
        self.topics
            .iter()
            .filter_map(|t| Url::parse(&t.url).ok())
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect()
    }
}

impl<'a> IntoIterator for &'a TopicMap {
    type Item = &'a Topic;
    type IntoIter = std::slice::Iter<'a, Topic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
