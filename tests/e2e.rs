//! End-to-end tests against the live gazette site.
//!
//! These hit the real index page and download the real edition, so they are
//! gated behind the `E2E_ENABLED` environment variable and never send mail
//! (dry run only).
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!   E2E_ENABLED=1 cargo test --test e2e --features browser -- --nocapture

use gazette_watch::pipeline::resolve::resolve_pdf_url;
use gazette_watch::{run_with_transport, LinkStrategy, WatchConfig};
use lettre::transport::stub::AsyncStubTransport;

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

fn live_config(strategy: LinkStrategy) -> WatchConfig {
    WatchConfig::builder()
        .strategy(strategy)
        .sender("e2e@example.org")
        .dry_run(true)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_live_dom_resolution() {
    e2e_skip_unless_enabled!();

    let url = resolve_pdf_url(&live_config(LinkStrategy::Dom))
        .await
        .expect("today's edition should be linked");
    println!("dom: {url}");
    assert!(url.starts_with("http"));
}

#[tokio::test]
async fn test_live_regex_resolution_agrees_with_dom() {
    e2e_skip_unless_enabled!();

    let dom = resolve_pdf_url(&live_config(LinkStrategy::Dom)).await.unwrap();
    let regex = resolve_pdf_url(&live_config(LinkStrategy::Regex))
        .await
        .unwrap();
    assert_eq!(dom, regex);
}

#[cfg(feature = "browser")]
#[tokio::test]
async fn test_live_browser_resolution_agrees_with_dom() {
    e2e_skip_unless_enabled!();

    let dom = resolve_pdf_url(&live_config(LinkStrategy::Dom)).await.unwrap();
    let browser = resolve_pdf_url(&live_config(LinkStrategy::Browser))
        .await
        .expect("headless Chromium should find the rendered link");
    println!("browser: {browser}");
    assert_eq!(dom, browser);
}

#[tokio::test]
async fn test_live_dry_run() {
    e2e_skip_unless_enabled!();

    let transport = AsyncStubTransport::new_ok();
    let report = run_with_transport(&live_config(LinkStrategy::Dom), &transport)
        .await
        .expect("dry run should complete");

    println!(
        "{} bytes, {} pages, {} occurrence(s) in {}ms",
        report.document_bytes,
        report.scan.pages_scanned,
        report.scan.len(),
        report.timings.total_ms
    );
    assert!(report.document_bytes > 0);
    assert!(report.scan.pages_scanned > 0);
    assert!(transport.messages().await.is_empty());
}
