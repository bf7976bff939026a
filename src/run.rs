//! Run entry points: one pipeline pass from index page to sent e-mail.
//!
//! Stages run strictly one after the other. The first failure aborts the
//! rest of the run and is returned as-is; the downloaded PDF is owned by a
//! [`crate::pipeline::fetch::DownloadedPdf`] guard, so it is removed on the
//! error path as well as after a successful send.

use crate::config::WatchConfig;
use crate::error::GazetteError;
use crate::output::{RunReport, StageTimings};
use crate::pipeline::scan::{ScanResult, Scanner, SearchTerm};
use crate::pipeline::{extract, fetch, notify, resolve};
use crate::progress::{RunProgressCallback, Stage};
use lettre::AsyncTransport;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the whole pipeline once, sending through the configured SMTP relay.
///
/// # Errors
/// The first stage failure: [`GazetteError::LinkNotFound`] when the page has
/// no PDF link, a download error, [`GazetteError::DocumentOpen`] for a bad
/// PDF, or [`GazetteError::SendFailed`] when the mail server refuses.
pub async fn run(config: &WatchConfig) -> Result<RunReport, GazetteError> {
    let transport = notify::smtp_transport(&config.mail)?;
    run_with_transport(config, &transport).await
}

/// Run the pipeline once, sending through `transport`.
pub async fn run_with_transport<T>(
    config: &WatchConfig,
    transport: &T,
) -> Result<RunReport, GazetteError>
where
    T: AsyncTransport + Sync,
    T::Error: std::fmt::Display,
{
    let total_start = Instant::now();
    let mut timings = StageTimings::default();

    let term = config.search_term()?;
    let scanner = Scanner::new(term, config.snippet_radius);
    info!("Starting run: searching for '{}'", scanner.term());

    // ── Step 1: Resolve the PDF link ─────────────────────────────────────
    emit(config, |cb| cb.on_stage_start(Stage::Resolve));
    let start = Instant::now();
    let pdf_url = resolve::resolve_pdf_url(config)
        .await
        .map_err(|e| failed(config, Stage::Resolve, e))?;
    timings.resolve_ms = elapsed_ms(start);
    emit(config, |cb| cb.on_stage_complete(Stage::Resolve, &pdf_url));

    // ── Step 2: Download ─────────────────────────────────────────────────
    emit(config, |cb| cb.on_stage_start(Stage::Download));
    let start = Instant::now();
    let pdf = fetch::download_pdf(
        &pdf_url,
        config.download_path.as_deref(),
        config.download_timeout_secs,
    )
    .await
    .map_err(|e| failed(config, Stage::Download, e))?;
    timings.download_ms = elapsed_ms(start);
    emit(config, |cb| {
        cb.on_stage_complete(Stage::Download, &format!("{} bytes", pdf.len()))
    });

    // ── Step 3: Extract page text ────────────────────────────────────────
    emit(config, |cb| cb.on_stage_start(Stage::Extract));
    let start = Instant::now();
    let pages = extract::extract_pages(pdf.bytes().to_vec())
        .await
        .map_err(|e| failed(config, Stage::Extract, e))?;
    timings.extract_ms = elapsed_ms(start);
    emit(config, |cb| {
        cb.on_stage_complete(Stage::Extract, &format!("{} pages", pages.len()))
    });

    // ── Step 4: Scan ─────────────────────────────────────────────────────
    emit(config, |cb| cb.on_stage_start(Stage::Scan));
    let start = Instant::now();
    let scan = scanner.scan(&pages);
    timings.scan_ms = elapsed_ms(start);
    info!(
        "Search complete: {} occurrence(s) in {} pages",
        scan.len(),
        scan.pages_scanned
    );
    emit(config, |cb| {
        cb.on_stage_complete(Stage::Scan, &format!("{} occurrence(s)", scan.len()))
    });

    // ── Step 5: Notify ───────────────────────────────────────────────────
    let notification =
        notify::build_notification(&config.mail, scanner.term(), &scan, Some(pdf.bytes()));
    let recipients = if config.dry_run {
        info!("Dry run: not sending the e-mail");
        Vec::new()
    } else {
        emit(config, |cb| cb.on_stage_start(Stage::Notify));
        let start = Instant::now();
        notify::send(transport, &notification)
            .await
            .map_err(|e| failed(config, Stage::Notify, e))?;
        timings.notify_ms = elapsed_ms(start);
        emit(config, |cb| {
            cb.on_stage_complete(
                Stage::Notify,
                &format!("{} recipient(s)", notification.recipients.len()),
            )
        });
        notification.recipients.clone()
    };

    // ── Step 6: Cleanup ──────────────────────────────────────────────────
    emit(config, |cb| cb.on_stage_start(Stage::Cleanup));
    match pdf.cleanup() {
        Ok(()) => {
            debug!("Removed {}", pdf.path().display());
            emit(config, |cb| cb.on_stage_complete(Stage::Cleanup, "temporary PDF removed"));
        }
        Err(e) => {
            // The notification already went out; a leftover file is not worth failing the run.
            warn!("Could not remove '{}': {}", pdf.path().display(), e);
            emit(config, |cb| cb.on_stage_error(Stage::Cleanup, &e.to_string()));
        }
    }

    timings.total_ms = elapsed_ms(total_start);
    info!("Run complete in {}ms", timings.total_ms);

    Ok(RunReport {
        term: scanner.term().to_string(),
        source: pdf_url,
        document_bytes: pdf.len(),
        scan,
        recipients,
        dry_run: config.dry_run,
        body: notification.body,
        timings,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &WatchConfig) -> Result<RunReport, GazetteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GazetteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// Search a local PDF without touching the network or sending mail.
///
/// The file is read, never removed.
pub async fn scan_file(
    path: impl AsRef<Path>,
    term: &str,
    snippet_radius: usize,
) -> Result<ScanResult, GazetteError> {
    let scanner = Scanner::new(SearchTerm::new(term)?, snippet_radius);
    let bytes = fetch::load_local(path.as_ref()).await?;
    let pages = extract::extract_pages(bytes).await?;
    Ok(scanner.scan(&pages))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn emit(config: &WatchConfig, f: impl FnOnce(&dyn RunProgressCallback)) {
    if let Some(ref cb) = config.progress_callback {
        f(cb.as_ref());
    }
}

/// Report a stage failure to the callback and pass the error through.
fn failed(config: &WatchConfig, stage: Stage, error: GazetteError) -> GazetteError {
    warn!("Stage {} failed: {}", stage, error);
    emit(config, |cb| cb.on_stage_error(stage, &error.to_string()));
    error
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
