//! Result types describing what a run did.

use crate::pipeline::scan::ScanResult;
use serde::{Deserialize, Serialize};

/// Summary of one run, serialisable for `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Search phrase as configured.
    pub term: String,
    /// Resolved edition URL.
    pub source: String,
    /// Size of the scanned document in bytes.
    pub document_bytes: usize,
    pub scan: ScanResult,
    /// Addresses the notification went to. Empty when nothing was sent.
    pub recipients: Vec<String>,
    /// The message was composed but not sent.
    pub dry_run: bool,
    /// Composed e-mail body.
    pub body: String,
    pub timings: StageTimings,
}

impl RunReport {
    /// Whether the phrase was found at least once.
    pub fn found(&self) -> bool {
        !self.scan.is_empty()
    }
}

/// Wall-clock time spent per stage, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub resolve_ms: u64,
    pub download_ms: u64,
    pub extract_ms: u64,
    pub scan_ms: u64,
    pub notify_ms: u64,
    pub total_ms: u64,
}
