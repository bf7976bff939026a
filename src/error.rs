//! Error types for the gazette-watch library.
//!
//! Every failure is fatal for the run: there is no partial-success mode. A
//! run either sends one complete notification or returns exactly one
//! [`GazetteError`] describing the first stage that failed. The transient PDF
//! is still removed on the error path (see [`crate::pipeline::fetch`]).
//!
//! [`GazetteError::kind`] groups the variants into the coarse taxonomy callers
//! usually branch on (link missing, download, document, send, validation).

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the gazette-watch library.
#[derive(Debug, Error)]
pub enum GazetteError {
    // ── Link resolution ───────────────────────────────────────────────────
    /// The index page was fetched but carries no usable PDF link.
    #[error("No PDF link found on '{page_url}' using the {strategy} strategy\nCheck the selector/pattern against the current page markup.")]
    LinkNotFound { page_url: String, strategy: String },

    /// Headless browser could not be launched or driven.
    #[error("Browser automation failed: {0}")]
    BrowserFailed(String),

    // ── Download ──────────────────────────────────────────────────────────
    /// HTTP request failed or returned a non-success status.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Request exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document ──────────────────────────────────────────────────────────
    /// Downloaded bytes are not a readable PDF.
    #[error("Downloaded file is not a readable PDF: {detail}")]
    DocumentOpen { detail: String },

    // ── Mail ──────────────────────────────────────────────────────────────
    /// SMTP authentication failed or the server rejected the message.
    #[error("Failed to send notification: {reason}")]
    SendFailed { reason: String },

    // ── Validation / configuration ────────────────────────────────────────
    /// The search phrase is empty or whitespace only.
    #[error("Invalid search term: {0}")]
    InvalidTerm(String),

    /// A required setting has no value.
    #[error("Missing required setting {name}\nSet the {name} environment variable.")]
    MissingSetting { name: String },

    /// A setting has a value that cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not read or write a local file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`GazetteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LinkNotFound,
    Download,
    DocumentOpen,
    Send,
    Validation,
    Internal,
}

impl GazetteError {
    /// Which taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GazetteError::LinkNotFound { .. } | GazetteError::BrowserFailed(_) => {
                ErrorKind::LinkNotFound
            }
            GazetteError::DownloadFailed { .. } | GazetteError::DownloadTimeout { .. } => {
                ErrorKind::Download
            }
            GazetteError::DocumentOpen { .. } => ErrorKind::DocumentOpen,
            GazetteError::SendFailed { .. } => ErrorKind::Send,
            GazetteError::InvalidTerm(_)
            | GazetteError::MissingSetting { .. }
            | GazetteError::InvalidConfig(_) => ErrorKind::Validation,
            GazetteError::Io { .. } | GazetteError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_not_found_display() {
        let e = GazetteError::LinkNotFound {
            page_url: "https://example.org/latest".into(),
            strategy: "dom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("https://example.org/latest"), "got: {msg}");
        assert!(msg.contains("dom"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::LinkNotFound);
    }

    #[test]
    fn download_timeout_display() {
        let e = GazetteError::DownloadTimeout {
            url: "https://example.org/a.pdf".into(),
            secs: 120,
        };
        assert!(e.to_string().contains("120s"));
        assert_eq!(e.kind(), ErrorKind::Download);
    }

    #[test]
    fn missing_setting_names_the_variable() {
        let e = GazetteError::MissingSetting {
            name: "EMAIL_SENHA".into(),
        };
        assert!(e.to_string().contains("EMAIL_SENHA"));
        assert_eq!(e.kind(), ErrorKind::Validation);
    }

    #[test]
    fn send_failed_kind() {
        let e = GazetteError::SendFailed {
            reason: "535 authentication failed".into(),
        };
        assert!(e.to_string().contains("535"));
        assert_eq!(e.kind(), ErrorKind::Send);
    }

    #[test]
    fn invalid_term_is_validation() {
        assert_eq!(
            GazetteError::InvalidTerm("empty".into()).kind(),
            ErrorKind::Validation
        );
    }
}
