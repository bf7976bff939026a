//! PDF download to a transient local file.
//!
//! The file lives for exactly one run. [`DownloadedPdf`] owns it and removes
//! it when dropped, so the early-return paths of the pipeline (scan failure,
//! send failure, panic) clean up the same way the success path does. When no
//! fixed path is configured the file sits in a `TempDir` that is dropped
//! alongside it.

use crate::error::GazetteError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// File name used inside the temporary directory.
const TEMP_FILE_NAME: &str = "gazette.pdf";

/// A downloaded PDF, removed from disk on drop.
#[derive(Debug)]
pub struct DownloadedPdf {
    path: PathBuf,
    bytes: Vec<u8>,
    // Kept alive until the guard drops; `None` for a fixed download path.
    _temp_dir: Option<TempDir>,
}

impl DownloadedPdf {
    /// Where the PDF was written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The downloaded content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Remove the file now. Calling it again, or dropping afterwards, is harmless.
    pub fn cleanup(&self) -> std::io::Result<()> {
        remove_transient(&self.path)
    }
}

impl Drop for DownloadedPdf {
    fn drop(&mut self) {
        if let Err(e) = remove_transient(&self.path) {
            warn!("Could not remove '{}': {}", self.path.display(), e);
        }
    }
}

/// Delete `path` if it exists. A missing file is success.
pub fn remove_transient(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed transient file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Build the HTTP client shared by page and PDF requests.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, GazetteError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("gazette-watch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GazetteError::Internal(format!("HTTP client: {}", e)))
}

/// GET `url` and return the body, mapping transport failures and
/// non-success statuses to download errors.
pub async fn get_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<Vec<u8>, GazetteError> {
    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            GazetteError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            GazetteError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(&map_err)?;

    if !response.status().is_success() {
        return Err(GazetteError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(&map_err)?;
    Ok(bytes.to_vec())
}

/// Download the PDF at `url`.
///
/// Writes to `destination` when given, otherwise into a new temporary
/// directory. The body goes to `<destination>.part` first and is renamed
/// into place, so the final path never holds a partial file.
pub async fn download_pdf(
    url: &str,
    destination: Option<&Path>,
    timeout_secs: u64,
) -> Result<DownloadedPdf, GazetteError> {
    info!("Downloading PDF from: {}", url);

    let client = http_client(timeout_secs)?;
    let bytes = get_bytes(&client, url, timeout_secs).await?;

    if bytes.is_empty() {
        return Err(GazetteError::DownloadFailed {
            url: url.to_string(),
            reason: "empty response body".into(),
        });
    }

    let (path, temp_dir) = match destination {
        Some(p) => (p.to_path_buf(), None),
        None => {
            let dir = TempDir::new().map_err(|e| GazetteError::Internal(e.to_string()))?;
            (dir.path().join(TEMP_FILE_NAME), Some(dir))
        }
    };

    write_atomically(&path, &bytes).await?;
    info!("Downloaded {} bytes to: {}", bytes.len(), path.display());

    Ok(DownloadedPdf {
        path,
        bytes,
        _temp_dir: temp_dir,
    })
}

/// Read a local PDF for an offline scan. The caller's file is never removed.
pub async fn load_local(path: &Path) -> Result<Vec<u8>, GazetteError> {
    tokio::fs::read(path).await.map_err(|e| GazetteError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), GazetteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GazetteError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    if let Err(e) = tokio::fs::write(&part, bytes).await {
        let _ = remove_transient(&part);
        return Err(GazetteError::Io {
            path: part,
            source: e,
        });
    }

    if let Err(e) = tokio::fs::rename(&part, path).await {
        let _ = remove_transient(&part);
        return Err(GazetteError::Io {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_transient_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        remove_transient(&path).unwrap();
        assert!(!path.exists());
        remove_transient(&path).unwrap();
    }

    #[tokio::test]
    async fn test_write_atomically_leaves_no_part_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("doc.pdf");

        write_atomically(&path, b"%PDF-1.7").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert!(!dir.path().join("nested").join("doc.pdf.part").exists());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_part_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), b"x").unwrap();

        let err = write_atomically(&path, b"%PDF-1.7").await.unwrap_err();

        assert!(matches!(err, GazetteError::Io { .. }));
        assert!(!dir.path().join("occupied.part").exists());
        assert!(path.join("keep.txt").exists());
    }

    #[test]
    fn test_guard_removes_fixed_path_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixed.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let guard = DownloadedPdf {
            path: path.clone(),
            bytes: b"%PDF".to_vec(),
            _temp_dir: None,
        };
        assert_eq!(guard.len(), 4);
        drop(guard);

        assert!(!path.exists());
    }

    #[test]
    fn test_explicit_cleanup_then_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixed.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let guard = DownloadedPdf {
            path: path.clone(),
            bytes: Vec::new(),
            _temp_dir: None,
        };
        guard.cleanup().unwrap();
        assert!(!path.exists());
        guard.cleanup().unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let err = download_pdf("http://127.0.0.1:9/gazette.pdf", None, 5)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                GazetteError::DownloadFailed { .. } | GazetteError::DownloadTimeout { .. }
            ),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_load_local_missing_file() {
        let err = load_local(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, GazetteError::Io { .. }));
    }
}
