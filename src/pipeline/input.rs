//! Input loading: read the selected file fully into memory.
//!
//! The decoder works on a byte buffer, so the whole file is read up front.
//! The `%PDF` magic is checked before anything reaches pdfium so callers get
//! a meaningful error rather than a pdfium parse failure.

use crate::error::ExtractError;
use std::path::Path;
use tracing::debug;

/// A file read into memory, with the name used in messages and reports.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Read `path` into memory and validate that it looks like a PDF.
pub async fn load_pdf(path: &Path) -> Result<LoadedFile, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let name = display_name(path);
    validate_pdf_bytes(&name, &bytes)?;
    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());

    Ok(LoadedFile { name, bytes })
}

/// Check that `bytes` is non-empty and starts with the PDF magic.
pub fn validate_pdf_bytes(name: &str, bytes: &[u8]) -> Result<(), ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::EmptyFile {
            name: name.to_string(),
        });
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(ExtractError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// File name component of `path`, or the whole path if it has none.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
