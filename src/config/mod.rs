//! Configuration module for Seedcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use seedcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("seedcrawl.toml")).unwrap();
//! println!("Writing records to: {}", config.output.path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, EventSinkKind, EventsConfig, OutputConfig, OutputFormat, SiteConfig,
    TopicEntry, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
