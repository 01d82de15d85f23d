//! Seed topics: the ordered input of a crawl run
//!
//! Topics come either from `[[topic]]` tables in the main config or from a
//! separate topics file passed on the command line.

mod map;
mod source;

pub use map::{Topic, TopicMap};
pub use source::{InlineTopics, TopicFile, TopicSource};
