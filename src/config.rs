//! Configuration types for PDF text extraction.
//!
//! Every knob of a run lives in [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`].

use crate::error::ExtractError;
use crate::progress::EventSender;
use crate::summarize::DEFAULT_SUMMARY_LIMIT;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for an extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfglance::{BlockOrder, ExtractionConfig, OcrBackend};
///
/// let config = ExtractionConfig::builder()
///     .ocr(OcrBackend::Tesseract)
///     .ocr_language("deu")
///     .block_order(BlockOrder::PageOrder)
///     .summary_limit(280)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Which engine reads pages that have no text layer. Default: Tesseract.
    pub ocr: OcrBackend,

    /// Language code handed to the OCR engine. Default: `"eng"`.
    pub ocr_language: String,

    /// Executable used by the Tesseract backend. Default: `"tesseract"`.
    pub tesseract_command: String,

    /// Scale factor used when rasterising a page for OCR. Range: 0.25–4.0. Default: 1.0.
    ///
    /// At 1.0 one PDF point maps to one pixel. Scanned pages with small print
    /// recognise noticeably better at 2.0, at four times the pixel count.
    pub render_scale: f32,

    /// Order of blocks in the final text. Default: [`BlockOrder::PageOrder`].
    pub block_order: BlockOrder,

    /// Character budget of the summary. Default: 500.
    pub summary_limit: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to a pdfium shared library. If None, the working directory and
    /// then the system library paths are searched.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Vision backend: LLM model identifier. If None, uses `gpt-4.1-nano`.
    pub model: Option<String>,

    /// Vision backend: provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Vision backend: pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Vision backend: sampling temperature. Default: 0.0.
    ///
    /// Transcription has exactly one right answer; any creativity is noise.
    pub temperature: f32,

    /// Vision backend: maximum tokens per page. Default: 4096.
    pub max_tokens: usize,

    /// Vision backend: retries on a failed call. Default: 2.
    pub max_retries: u32,

    /// Vision backend: initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Progress-event channel. Default: None (no events).
    pub events: Option<EventSender>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr: OcrBackend::default(),
            ocr_language: "eng".to_string(),
            tesseract_command: "tesseract".to_string(),
            render_scale: 1.0,
            block_order: BlockOrder::default(),
            summary_limit: DEFAULT_SUMMARY_LIMIT,
            password: None,
            pdfium_lib_path: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 2,
            retry_backoff_ms: 500,
            events: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("ocr", &self.ocr)
            .field("ocr_language", &self.ocr_language)
            .field("tesseract_command", &self.tesseract_command)
            .field("render_scale", &self.render_scale)
            .field("block_order", &self.block_order)
            .field("summary_limit", &self.summary_limit)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .field("events", &self.events.is_some())
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn ocr(mut self, backend: OcrBackend) -> Self {
        self.config.ocr = backend;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_command = cmd.into();
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn block_order(mut self, order: BlockOrder) -> Self {
        self.config.block_order = order;
        self
    }

    pub fn summary_limit(mut self, chars: usize) -> Self {
        self.config.summary_limit = chars;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn events(mut self, tx: EventSender) -> Self {
        self.config.events = Some(tx);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(0.25..=4.0).contains(&c.render_scale) {
            return Err(ExtractError::InvalidConfig(format!(
                "Render scale must be 0.25–4.0, got {}",
                c.render_scale
            )));
        }
        if c.summary_limit == 0 {
            return Err(ExtractError::InvalidConfig(
                "Summary limit must be ≥ 1 character".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language code must not be empty".into(),
            ));
        }
        if c.ocr == OcrBackend::Tesseract && c.tesseract_command.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Tesseract command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// OCR engine used for pages without a text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Local `tesseract` executable. (default)
    #[default]
    Tesseract,
    /// Vision LLM transcription through `edgequake-llm`.
    Vision,
    /// No OCR; image-only pages contribute nothing.
    Disabled,
}

/// Order of blocks in the final extracted text.
///
/// OCR runs concurrently with the remaining pages, so its results complete
/// in an order that depends on timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOrder {
    /// Blocks sorted by page number once every OCR task has finished. (default)
    #[default]
    PageOrder,
    /// Blocks kept in the order they were appended. OCR blocks land wherever
    /// their recognition happened to finish; the result is not deterministic.
    Arrival,
}
