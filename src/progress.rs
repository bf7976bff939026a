//! Progress-callback trait for per-stage run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::WatchConfigBuilder::progress_callback`] to be told when
//! each pipeline stage starts, finishes, or fails. The CLI uses it to drive
//! a terminal spinner; a job runner could forward the events to its own log.
//!
//! # Example
//!
//! ```rust
//! use gazette_watch::{RunProgressCallback, Stage, WatchConfig};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl RunProgressCallback for PrintStages {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         eprintln!("{stage}: {detail}");
//!     }
//! }
//!
//! let config = WatchConfig::builder()
//!     .sender("alerts@example.org")
//!     .dry_run(true)
//!     .progress_callback(Arc::new(PrintStages) as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Download,
    Extract,
    Scan,
    Notify,
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Resolve,
        Stage::Download,
        Stage::Extract,
        Stage::Scan,
        Stage::Notify,
        Stage::Cleanup,
    ];

    /// Human-readable label used in logs and the CLI.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Resolve => "Resolving PDF link",
            Stage::Download => "Downloading PDF",
            Stage::Extract => "Extracting text",
            Stage::Scan => "Searching",
            Stage::Notify => "Sending e-mail",
            Stage::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "resolve",
            Stage::Download => "download",
            Stage::Extract => "extract",
            Stage::Scan => "scan",
            Stage::Notify => "notify",
            Stage::Cleanup => "cleanup",
        })
    }
}

/// Called by the pipeline around each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RunProgressCallback: Send + Sync {
    /// Called just before a stage starts.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes.
    ///
    /// # Arguments
    /// * `stage`: the stage that finished
    /// * `detail`: short summary, e.g. the resolved URL or "3 hits"
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called when a stage fails. No further stage except cleanup follows.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::WatchConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
