//! Headless-browser link resolution (feature `browser`).
//!
//! Some gazette front-ends build the PDF anchor with JavaScript after the
//! page loads, so the raw HTML never contains it. This stage starts a
//! headless Chromium through the DevTools protocol, opens the page, waits a
//! fixed settle delay for the scripts, and reads the attribute directly from
//! the live DOM.
//!
//! The browser is always closed before returning, whether the lookup
//! succeeded, found nothing, or failed.

use crate::error::GazetteError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Open `url`, wait `settle`, and return `attribute` of the first element
/// matching `selector` that has a non-empty value.
///
/// `Ok(None)` means the page rendered but no such element exists.
pub async fn read_link_attribute(
    url: &str,
    selector: &str,
    attribute: &str,
    settle: Duration,
) -> Result<Option<String>, GazetteError> {
    let config = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-dev-shm-usage")
        .build()
        .map_err(|e| GazetteError::BrowserFailed(format!("browser config: {}", e)))?;

    info!("Launching headless browser for {}", url);
    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| GazetteError::BrowserFailed(format!("launch: {}", e)))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("Browser handler stopped: {:?}", e);
                break;
            }
        }
    });

    let result = lookup(&browser, url, selector, attribute, settle).await;

    if let Err(e) = browser.close().await {
        warn!("Closing browser failed: {}", e);
    }
    let _ = browser.wait().await;
    let _ = handle.await;

    result
}

async fn lookup(
    browser: &Browser,
    url: &str,
    selector: &str,
    attribute: &str,
    settle: Duration,
) -> Result<Option<String>, GazetteError> {
    let page: Page = browser
        .new_page(url)
        .await
        .map_err(|e| GazetteError::BrowserFailed(format!("navigate to '{}': {}", url, e)))?;

    debug!("Page loaded, waiting {:?} for scripts", settle);
    tokio::time::sleep(settle).await;

    let elements = page
        .find_elements(selector)
        .await
        .map_err(|e| GazetteError::BrowserFailed(format!("query '{}': {}", selector, e)))?;
    debug!("{} element(s) match '{}'", elements.len(), selector);

    for element in elements {
        let value = element
            .attribute(attribute)
            .await
            .map_err(|e| GazetteError::BrowserFailed(format!("read '{}': {}", attribute, e)))?;
        if let Some(v) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            return Ok(Some(v));
        }
    }

    Ok(None)
}
