//! Source document text extraction for offline index builds.
//!
//! PDFs go through the `pdftotext` binary from poppler; every other file is
//! read as UTF-8 text.

use std::path::Path;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{RagError, Result};

/// Extract the full text of the document at `path`.
///
/// Page breaks in PDFs become newlines so pages run together the way a
/// page-by-page concatenation would.
///
/// # Errors
///
/// Returns [`RagError::ExtractionError`] if the file cannot be read, if
/// `pdftotext` is unavailable or fails, or if no text is produced.
pub async fn extract_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf { extract_pdf(path).await? } else { read_plain(path).await? };

    if text.trim().is_empty() {
        warn!(path = %path.display(), "document produced no text");
        return Err(extraction_error(path, "no text extracted"));
    }

    info!(path = %path.display(), chars = text.chars().count(), "extracted document text");
    Ok(text)
}

async fn read_plain(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| extraction_error(path, e))
}

async fn extract_pdf(path: &Path) -> Result<String> {
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .await
        .map_err(|e| {
            extraction_error(path, format!("failed to run pdftotext: {e} (is poppler installed?)"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(extraction_error(path, format!("pdftotext failed: {}", stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout).replace('\u{c}', "\n"))
}

fn extraction_error(path: &Path, message: impl ToString) -> RagError {
    RagError::ExtractionError { path: path.display().to_string(), message: message.to_string() }
}
