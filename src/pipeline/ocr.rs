//! OCR fallback for pages without a text layer.
//!
//! [`OcrEngine`] is the seam between the page pipeline and whatever actually
//! reads pixels. Engines report progress through the [`OcrProgress`] handle
//! they are given and return plain text; cleanup and block construction
//! happen here, in [`recognize_page`], so every engine behaves the same.

use super::encode::encode_png;
use super::postprocess::clean_ocr_text;
use super::vision::VisionOcrEngine;
use crate::config::{ExtractionConfig, OcrBackend};
use crate::error::{ExtractError, OcrError};
use crate::output::TextBlock;
use crate::progress::{OcrProgress, ProgressSink};
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads text out of a rendered page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and errors.
    fn name(&self) -> &str;

    /// Whether the pipeline should render pages for this engine at all.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Recognise `image`. `language` is a Tesseract-style code such as `eng`.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &OcrProgress,
    ) -> Result<String, OcrError>;
}

/// Build the engine selected by `config.ocr`.
pub fn build_ocr_engine(config: &ExtractionConfig) -> Result<Arc<dyn OcrEngine>, ExtractError> {
    Ok(match config.ocr {
        OcrBackend::Tesseract => Arc::new(TesseractEngine::new(&config.tesseract_command)),
        OcrBackend::Vision => Arc::new(VisionOcrEngine::from_config(config)?),
        OcrBackend::Disabled => Arc::new(DisabledOcr),
    })
}

/// Run `engine` on one page and turn the result into a block.
///
/// `Ok(None)` means the engine ran but found nothing legible.
pub(crate) async fn recognize_page(
    engine: &dyn OcrEngine,
    page: usize,
    image: &DynamicImage,
    language: &str,
    sink: &ProgressSink,
) -> Result<Option<TextBlock>, OcrError> {
    let progress = sink.for_ocr(page);
    let raw = engine.recognize(image, language, &progress).await?;
    let text = clean_ocr_text(&raw);

    if text.is_empty() {
        debug!("OCR on page {} produced no text", page);
        return Ok(None);
    }

    info!(
        "OCR result from page {} ({}): {} chars",
        page,
        engine.name(),
        text.chars().count()
    );
    Ok(Some(TextBlock::ocr(page, text)))
}

// ── Tesseract ────────────────────────────────────────────────────────────

/// Runs the `tesseract` executable on a temporary PNG.
///
/// `tesseract <image> stdout -l <lang>` prints the recognised text; nothing
/// else is written to disk.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &OcrProgress,
    ) -> Result<String, OcrError> {
        let page = progress.page();
        progress.report("encoding page image", 0.0);

        let png = encode_png(image).map_err(|e| OcrError::EncodeFailed {
            page,
            detail: e.to_string(),
        })?;

        let unavailable = |detail: String| OcrError::EngineUnavailable {
            page,
            engine: self.command.clone(),
            detail,
        };

        let tmp = tempfile::Builder::new()
            .prefix("pdfglance-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| unavailable(format!("temp file: {e}")))?;
        tokio::fs::write(tmp.path(), &png)
            .await
            .map_err(|e| unavailable(format!("temp file write: {e}")))?;

        progress.report("recognizing text", 0.2);
        let output = tokio::process::Command::new(&self.command)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::RecognitionFailed {
                page,
                attempts: 1,
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        progress.report("done", 1.0);
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── Disabled ─────────────────────────────────────────────────────────────

/// Stand-in engine when OCR is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

#[async_trait]
impl OcrEngine for DisabledOcr {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn recognize(
        &self,
        _image: &DynamicImage,
        _language: &str,
        progress: &OcrProgress,
    ) -> Result<String, OcrError> {
        Err(OcrError::Disabled {
            page: progress.page(),
        })
    }
}
