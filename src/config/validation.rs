use crate::config::types::{
    Config, CrawlerConfig, EventSinkKind, EventsConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use crate::extract::ExtractionRules;
use crate::ConfigError;

/// Longest allowed gap between two requests, in seconds
const MAX_RATE_LIMIT_DELAY: f64 = 3600.0;

/// Validates the entire configuration
///
/// Topics are checked separately when the [`crate::TopicMap`] is built, since
/// they may come from a file other than the config.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    validate_events_config(&config.events)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !config.rate_limit_delay.is_finite() || config.rate_limit_delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_delay must be a non-negative number of seconds, got {}",
            config.rate_limit_delay
        )));
    }

    if config.rate_limit_delay > MAX_RATE_LIMIT_DELAY {
        return Err(ConfigError::Validation(format!(
            "rate_limit_delay must be at most {} seconds, got {}",
            MAX_RATE_LIMIT_DELAY, config.rate_limit_delay
        )));
    }

    if config.request_timeout < 1 || config.request_timeout > 600 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be between 1 and 600 seconds, got {}",
            config.request_timeout
        )));
    }

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 32, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.product.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent product cannot be empty".to_string(),
        ));
    }

    for (field, value) in [("product", &config.product), ("version", &config.version)] {
        if value.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ConfigError::Validation(format!(
                "user-agent {} must not contain whitespace or '/', got '{}'",
                field, value
            )));
        }
    }

    Ok(())
}

/// Validates the site layout by compiling it into extraction rules
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if !config.content_path_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "content_path_prefix must start with '/', got '{}'",
            config.content_path_prefix
        )));
    }

    ExtractionRules::from_config(config)?;
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates event sink configuration
fn validate_events_config(config: &EventsConfig) -> Result<(), ConfigError> {
    if config.sink == EventSinkKind::Jsonl
        && config.path.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::Validation(
            "events path is required for the jsonl event sink".to_string(),
        ));
    }

    Ok(())
}
