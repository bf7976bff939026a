//! Link resolution: find the current edition's PDF URL on the index page.
//!
//! Three interchangeable strategies produce the same result:
//!
//! | Strategy | Needs | How |
//! |----------|-------|-----|
//! | `dom`     | HTTP only | parse the HTML, read an attribute of the first element matching a CSS selector |
//! | `regex`   | HTTP only | first capture of a regular expression over the raw HTML |
//! | `browser` | Chromium  | render the page, let scripts run, read the attribute (see [`super::browser`]) |
//!
//! The static strategies are expressed as [`LinkExtractor`] implementations
//! over an HTML string, which keeps them testable without a network.
//!
//! Whatever the strategy, a missing or empty link is a
//! [`GazetteError::LinkNotFound`]. There is no fallback URL.

use crate::config::{LinkStrategy, WatchConfig};
use crate::error::GazetteError;
use crate::pipeline::fetch::{get_bytes, http_client};
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info};

/// Pulls a (possibly relative) PDF link out of an HTML document.
pub trait LinkExtractor {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// The raw link value, or `None` when the page has none.
    fn extract(&self, html: &str) -> Option<String>;
}

/// CSS-selector based extraction.
#[derive(Debug, Clone)]
pub struct DomExtractor {
    selector: Selector,
    attribute: String,
}

impl DomExtractor {
    pub fn new(selector: &str, attribute: impl Into<String>) -> Result<Self, GazetteError> {
        let selector = Selector::parse(selector).map_err(|e| {
            GazetteError::InvalidConfig(format!("CSS selector '{}': {}", selector, e))
        })?;
        Ok(Self {
            selector,
            attribute: attribute.into(),
        })
    }
}

impl LinkExtractor for DomExtractor {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .filter_map(|el| el.value().attr(&self.attribute))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Regular-expression based extraction.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    pattern: Regex,
}

impl RegexExtractor {
    pub fn new(pattern: &str) -> Result<Self, GazetteError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| GazetteError::InvalidConfig(format!("link pattern: {}", e)))?;
        Ok(Self { pattern })
    }
}

impl LinkExtractor for RegexExtractor {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, html: &str) -> Option<String> {
        self.pattern
            .captures_iter(html)
            .filter_map(|caps| {
                // First participating group; the whole match when there are none.
                let m = if caps.len() > 1 {
                    caps.iter().skip(1).flatten().next()?
                } else {
                    caps.get(0)?
                };
                let value = m.as_str().trim();
                (!value.is_empty()).then(|| value.replace("&amp;", "&"))
            })
            .next()
    }
}

/// Resolve `href` against the page it was found on.
///
/// Absolute URLs pass through, `/path` resolves against the origin, and
/// other relative forms resolve against the page's directory.
pub fn absolutize(page_url: &str, href: &str) -> Result<String, GazetteError> {
    let base = Url::parse(page_url)
        .map_err(|e| GazetteError::InvalidConfig(format!("page URL '{}': {}", page_url, e)))?;
    let url = base.join(href).map_err(|e| GazetteError::LinkNotFound {
        page_url: page_url.to_string(),
        strategy: format!("unusable link '{}': {}", href, e),
    })?;
    Ok(url.to_string())
}

/// Run `extractor` over `html` and return the absolute PDF URL.
pub fn resolve_from_html(
    html: &str,
    page_url: &str,
    extractor: &dyn LinkExtractor,
) -> Result<String, GazetteError> {
    let href = extractor
        .extract(html)
        .ok_or_else(|| GazetteError::LinkNotFound {
            page_url: page_url.to_string(),
            strategy: extractor.name().to_string(),
        })?;
    debug!("Raw link from {} strategy: {}", extractor.name(), href);
    absolutize(page_url, &href)
}

/// Fetch the index page as text.
pub async fn fetch_page(url: &str, timeout_secs: u64) -> Result<String, GazetteError> {
    let client = http_client(timeout_secs)?;
    let bytes = get_bytes(&client, url, timeout_secs).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Resolve the PDF URL with the strategy chosen in `config`.
pub async fn resolve_pdf_url(config: &WatchConfig) -> Result<String, GazetteError> {
    info!(
        "Looking for the PDF link on {} ({} strategy)",
        config.page_url, config.strategy
    );

    let url = match config.strategy {
        LinkStrategy::Dom => {
            let html = fetch_page(&config.page_url, config.page_timeout_secs).await?;
            let extractor = DomExtractor::new(&config.link_selector, &config.link_attribute)?;
            resolve_from_html(&html, &config.page_url, &extractor)?
        }
        LinkStrategy::Regex => {
            let html = fetch_page(&config.page_url, config.page_timeout_secs).await?;
            let extractor = RegexExtractor::new(&config.link_pattern)?;
            resolve_from_html(&html, &config.page_url, &extractor)?
        }
        LinkStrategy::Browser => resolve_with_browser(config).await?,
    };

    info!("PDF link found: {}", url);
    Ok(url)
}

#[cfg(feature = "browser")]
async fn resolve_with_browser(config: &WatchConfig) -> Result<String, GazetteError> {
    let href = super::browser::read_link_attribute(
        &config.page_url,
        &config.link_selector,
        &config.link_attribute,
        std::time::Duration::from_secs(config.browser_settle_secs),
    )
    .await?
    .ok_or_else(|| GazetteError::LinkNotFound {
        page_url: config.page_url.clone(),
        strategy: LinkStrategy::Browser.to_string(),
    })?;
    absolutize(&config.page_url, &href)
}

#[cfg(not(feature = "browser"))]
async fn resolve_with_browser(_config: &WatchConfig) -> Result<String, GazetteError> {
    Err(GazetteError::InvalidConfig(
        "the browser strategy needs a build with the `browser` feature".into(),
    ))
}
