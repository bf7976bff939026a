//! # gazette-watch
//!
//! Watch an official gazette for a phrase and e-mail the edition when it
//! appears.
//!
//! Each run finds today's PDF on the gazette's index page, downloads it,
//! searches every page for the configured phrase (ignoring case and line
//! wrapping), and sends one e-mail with a per-page summary and the PDF
//! attached. The downloaded file never outlives the run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! index page
//!  │
//!  ├─ 1. Resolve   find the PDF link (DOM selector, regex, or headless browser)
//!  ├─ 2. Download  write to a transient file, removed on drop
//!  ├─ 3. Extract   per-page laid-out text via pdf-extract (spawn_blocking)
//!  ├─ 4. Scan      phrase search with whitespace/case normalisation
//!  ├─ 5. Notify    summary + attachment over authenticated SMTP
//!  └─ 6. Cleanup   delete the PDF, return a RunReport
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gazette_watch::{run, WatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WatchConfig::builder()
//!         .term("conservação de pavimento")
//!         .sender("alerts@example.org")
//!         .password("app-password")
//!         .build()?;
//!     let report = run(&config).await?;
//!     println!("{} occurrence(s)", report.scan.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `gazette-watch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `browser` | off     | Headless Chromium link resolution via chromiumoxide |
//!
//! Scheduling is left to the host (cron, systemd timers): one invocation is
//! one run.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LinkStrategy, MailConfig, WatchConfig, WatchConfigBuilder};
pub use error::{ErrorKind, GazetteError};
pub use output::{RunReport, StageTimings};
pub use pipeline::extract::PageText;
pub use pipeline::scan::{Occurrence, ScanResult, Scanner, SearchTerm};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback, Stage};
pub use run::{run, run_sync, run_with_transport, scan_file};
