//! Error types for the pdfglance library.
//!
//! Three error types match three failure scopes:
//!
//! * [`ExtractError`]: **fatal**, the run cannot produce a report (no file,
//!   unreadable PDF, decoder failure, nothing extracted). Returned as
//!   `Err(ExtractError)` from [`crate::Orchestrator::extract`] and friends.
//!
//! * [`OcrError`]: **non-fatal**, recognition failed for a single page. The
//!   page contributes no text, the error is logged and kept in
//!   [`crate::output::ExtractionReport::ocr_errors`], and the run continues.
//!
//! * [`ChartError`]: the chart could not be rasterised. Charts are an
//!   optional output, so callers usually log this and move on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Nothing usable was supplied; no state changed.
    Input,
    /// A run is already in flight; the request was ignored.
    Busy,
    /// Decoding or extraction failed; the run was aborted.
    Extraction,
    /// The configuration is invalid.
    Config,
    /// Anything else.
    Internal,
}

/// All fatal errors returned by the pdfglance library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The extraction was triggered without a file.
    #[error("Please select a PDF file.")]
    NoFileSelected,

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the file failed for another reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is zero bytes long.
    #[error("File '{name}' is empty")]
    EmptyFile { name: String },

    /// The bytes do not start with the `%PDF` magic.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── Busy ──────────────────────────────────────────────────────────────
    /// The trigger control is disabled because a run is in progress.
    #[error("An extraction is already running; wait for it to finish")]
    Busy,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the executable, install it system-wide,\n\
or point --pdfium-lib (PDFGLANCE_PDFIUM_LIB) at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// A page index outside `1..=total` was requested from the decoder.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The decoder could not produce the text content of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextContentFailed { page: usize, detail: String },

    /// The decoder could not rasterise a page for OCR.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Every page came back empty, natively and through OCR.
    #[error("No text extracted or OCR result found ({pages} pages scanned)")]
    NoTextExtracted { pages: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The vision OCR provider is not initialised (missing API key etc.).
    #[error("OCR provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Classify the error for callers that only care about the failure scope.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::NoFileSelected
            | ExtractError::FileNotFound { .. }
            | ExtractError::PermissionDenied { .. }
            | ExtractError::ReadFailed { .. }
            | ExtractError::EmptyFile { .. }
            | ExtractError::NotAPdf { .. } => ErrorKind::Input,
            ExtractError::Busy => ErrorKind::Busy,
            ExtractError::PdfiumBindingFailed(_)
            | ExtractError::CorruptPdf { .. }
            | ExtractError::PasswordRequired { .. }
            | ExtractError::WrongPassword { .. }
            | ExtractError::PageOutOfRange { .. }
            | ExtractError::TextContentFailed { .. }
            | ExtractError::RenderFailed { .. }
            | ExtractError::NoTextExtracted { .. } => ErrorKind::Extraction,
            ExtractError::InvalidConfig(_) | ExtractError::ProviderNotConfigured { .. } => {
                ErrorKind::Config
            }
            ExtractError::OutputWriteFailed { .. } | ExtractError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// A non-fatal OCR error for a single page.
///
/// The page simply contributes no text; the run carries on.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OcrError {
    /// OCR is switched off in the configuration.
    #[error("Page {page}: OCR is disabled")]
    Disabled { page: usize },

    /// The OCR engine could not be started at all.
    #[error("Page {page}: OCR engine '{engine}' is unavailable: {detail}")]
    EngineUnavailable {
        page: usize,
        engine: String,
        detail: String,
    },

    /// The rendered page could not be encoded for the engine.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The engine ran but reported a failure.
    #[error("Page {page}: recognition failed after {attempts} attempt(s): {detail}")]
    RecognitionFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The OCR task panicked or was cancelled before it could report.
    #[error("OCR task aborted: {detail}")]
    TaskAborted { detail: String },
}

impl OcrError {
    /// Page the error belongs to, when known.
    pub fn page(&self) -> Option<usize> {
        match self {
            OcrError::Disabled { page }
            | OcrError::EngineUnavailable { page, .. }
            | OcrError::EncodeFailed { page, .. }
            | OcrError::RecognitionFailed { page, .. } => Some(*page),
            OcrError::TaskAborted { .. } => None,
        }
    }
}

/// Errors raised while rasterising a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    /// A pie chart needs at least two values.
    #[error("Not enough values for a chart: {found} (need at least 2)")]
    NotEnoughValues { found: usize },

    /// All values are zero, so no sector has an angle.
    #[error("Chart values sum to zero")]
    EmptyTotal,

    /// The canvas dimensions are zero or too large.
    #[error("Invalid chart canvas {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    /// PNG encoding failed.
    #[error("Chart PNG encoding failed: {0}")]
    EncodeFailed(String),

    /// Writing the PNG to disk failed.
    #[error("Failed to write chart '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
