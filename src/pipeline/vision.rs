//! Vision-LLM OCR backend.
//!
//! Sends the rendered page to a multimodal model through `edgequake-llm` and
//! treats the reply as recognised text.
//!
//! ## Retry Strategy
//!
//! Rate limits and 5xx responses are common when several image-only pages
//! are recognised at once. Each attempt after the first waits
//! `retry_backoff_ms * 2^(attempt-1)`: with the 500 ms default and two
//! retries that is 500 ms then 1 s.

use super::encode::{encode_png, to_image_data};
use super::ocr::OcrEngine;
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, OcrError};
use crate::progress::OcrProgress;
use crate::prompts::transcription_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// OCR through a vision-capable chat model.
pub struct VisionOcrEngine {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl std::fmt::Debug for VisionOcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionOcrEngine")
            .field("provider", &"<dyn LLMProvider>")
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl VisionOcrEngine {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Resolve a provider from the config and environment.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        debug!(
            "Vision OCR provider resolved (requested: {:?} / {:?})",
            config.provider_name, config.model
        );
        Ok(Self::new(provider, config))
    }

    fn options(&self) -> CompletionOptions {
        build_options(self.temperature, self.max_tokens)
    }
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Wait before attempt `attempt` (0-based); the first attempt does not wait.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    match attempt {
        0 => 0,
        n => base_ms.saturating_mul(2u64.saturating_pow(n - 1)),
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: &OcrProgress,
    ) -> Result<String, OcrError> {
        let page = progress.page();
        let start = Instant::now();
        progress.report("encoding page image", 0.0);

        let png = encode_png(image).map_err(|e| OcrError::EncodeFailed {
            page,
            detail: e.to_string(),
        })?;

        // The image carries the content; the user turn only needs to exist.
        let messages = vec![
            ChatMessage::system(transcription_prompt(language)),
            ChatMessage::user_with_images("", vec![to_image_data(&png)]),
        ];
        let options = self.options();

        let attempts = self.max_retries + 1;
        let mut last_err = String::from("Unknown error");

        for attempt in 0..attempts {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Page {}: OCR retry {}/{} after {}ms",
                    page, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            progress.report(
                "recognizing text",
                0.1 + 0.8 * attempt as f32 / attempts as f32,
            );

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens, {:?}",
                        page,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    progress.report("done", 1.0);
                    return Ok(response.content);
                }
                Err(e) => {
                    last_err = e.to_string();
                    warn!("Page {}: OCR attempt {} failed: {}", page, attempt + 1, last_err);
                }
            }
        }

        Err(OcrError::RecognitionFailed {
            page,
            attempts,
            detail: last_err,
        })
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Provider lookup, most specific first:
///
/// 1. `config.provider` as given
/// 2. `config.provider_name` with `config.model` (or [`DEFAULT_VISION_MODEL`])
/// 3. `EDGEQUAKE_LLM_PROVIDER` and `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. Whatever [`ProviderFactory::from_env`] finds
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "Vision OCR needs an LLM provider.\n\
                Set OPENAI_API_KEY or ANTHROPIC_API_KEY, pass --provider, or use --ocr tesseract.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
