//! Compiled extraction rules
//!
//! Selectors are parsed once, when the configuration is loaded, so that
//! extraction itself has no fallible steps.

use crate::config::SiteConfig;
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Structural rules telling the engine where each field lives in a page
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub(crate) title: Selector,
    pub(crate) content: Selector,
    pub(crate) categories: Selector,
    pub(crate) category_item: Selector,
    pub(crate) noise: Vec<Selector>,
    pub(crate) anchor: Selector,
    pub(crate) link_prefix: String,
    pub(crate) origin: String,
}

impl ExtractionRules {
    /// Compiles the site layout from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionRules)` - All selectors parsed and the origin is usable
    /// * `Err(ConfigError)` - A selector failed to parse or the origin is not
    ///   a bare `http(s)://host[:port]`
    pub fn from_config(site: &SiteConfig) -> ConfigResult<Self> {
        let noise = site
            .noise_selectors
            .iter()
            .map(|s| compile_selector("noise-selectors", s))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            title: compile_selector("title-selector", &site.title_selector)?,
            content: compile_selector("content-selector", &site.content_selector)?,
            categories: compile_selector("category-selector", &site.category_selector)?,
            category_item: compile_selector(
                "category-item-selector",
                &site.category_item_selector,
            )?,
            noise,
            anchor: compile_selector("anchor", "a[href]")?,
            link_prefix: site.content_path_prefix.clone(),
            origin: validate_origin(&site.origin)?,
        })
    }

    /// The origin prepended to retained links, without a trailing slash
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The path prefix shared by content pages
    pub fn link_prefix(&self) -> &str {
        &self.link_prefix
    }
}

impl Default for ExtractionRules {
    /// MediaWiki layout on `https://en.wikipedia.org`
    fn default() -> Self {
        Self::from_config(&SiteConfig::default()).expect("default site layout is valid")
    }
}

fn compile_selector(field: &str, value: &str) -> ConfigResult<Selector> {
    Selector::parse(value)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {}", field, value, e)))
}

fn validate_origin(origin: &str) -> ConfigResult<String> {
    let url = Url::parse(origin)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site origin '{}': {}", origin, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Site origin '{}' must use http or https",
            origin
        )));
    }

    if url.host_str().is_none() || url.path() != "/" || url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "Site origin '{}' must be a bare scheme and host",
            origin
        )));
    }

    Ok(origin.trim_end_matches('/').to_string())
}
