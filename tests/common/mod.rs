//! In-memory decoder and OCR fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use pdfglance::{
    ExtractError, ExtractionConfig, OcrEngine, OcrError, OcrProgress, Orchestrator, PdfDecoder,
    PdfDocument,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Bytes that pass the `%PDF` check; the fakes never parse them.
pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n% fake\n";

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub fragments: Vec<String>,
    pub text_fails: bool,
    pub render_fails: bool,
}

impl FakePage {
    pub fn text(s: &str) -> Self {
        Self {
            fragments: s.split(' ').map(str::to_owned).collect(),
            ..Self::default()
        }
    }

    pub fn image_only() -> Self {
        Self::default()
    }

    pub fn broken_text() -> Self {
        Self {
            text_fails: true,
            ..Self::default()
        }
    }

    pub fn broken_render() -> Self {
        Self {
            render_fails: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDecoder {
    pages: Vec<FakePage>,
    text_delay: Option<Duration>,
}

impl FakeDecoder {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            text_delay: None,
        }
    }

    /// Every text fetch sleeps first, so concurrent callers can interleave.
    pub fn with_text_delay(mut self, delay: Duration) -> Self {
        self.text_delay = Some(delay);
        self
    }
}

#[async_trait]
impl PdfDecoder for FakeDecoder {
    async fn open(&self, _name: &str, _bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, ExtractError> {
        Ok(Arc::new(FakeDocument {
            pages: self.pages.clone(),
            text_delay: self.text_delay,
        }))
    }
}

struct FakeDocument {
    pages: Vec<FakePage>,
    text_delay: Option<Duration>,
}

impl FakeDocument {
    fn page(&self, page: usize) -> Result<&FakePage, ExtractError> {
        self.pages
            .get(page.wrapping_sub(1))
            .ok_or(ExtractError::PageOutOfRange {
                page,
                total: self.pages.len(),
            })
    }
}

#[async_trait]
impl PdfDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn text_content(&self, page: usize) -> Result<Vec<String>, ExtractError> {
        if let Some(delay) = self.text_delay {
            tokio::time::sleep(delay).await;
        }
        let p = self.page(page)?;
        if p.text_fails {
            return Err(ExtractError::TextContentFailed {
                page,
                detail: "content stream truncated".into(),
            });
        }
        Ok(p.fragments.clone())
    }

    async fn render(&self, page: usize, _scale: f32) -> Result<DynamicImage, ExtractError> {
        if self.page(page)?.render_fails {
            return Err(ExtractError::RenderFailed {
                page,
                detail: "bitmap allocation failed".into(),
            });
        }
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(16, 16)))
    }
}

/// OCR engine with a fixed answer per page and optional per-page latency.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOcr {
    answers: HashMap<usize, Result<String, String>>,
    delays: HashMap<usize, Duration>,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, page: usize, text: &str) -> Self {
        self.answers.insert(page, Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, page: usize, detail: &str) -> Self {
        self.answers.insert(page, Err(detail.to_string()));
        self
    }

    pub fn delay(mut self, page: usize, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn recognize(
        &self,
        _image: &DynamicImage,
        _language: &str,
        progress: &OcrProgress,
    ) -> Result<String, OcrError> {
        let page = progress.page();
        progress.report("recognizing text", 0.5);
        if let Some(delay) = self.delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }
        match self.answers.get(&page) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(detail)) => Err(OcrError::RecognitionFailed {
                page,
                attempts: 1,
                detail: detail.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn orchestrator(
    decoder: FakeDecoder,
    ocr: ScriptedOcr,
    config: ExtractionConfig,
) -> Orchestrator {
    Orchestrator::new(Arc::new(decoder), Arc::new(ocr), config)
}
