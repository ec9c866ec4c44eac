//! Page pipeline: walk the document, keep native text, OCR the rest.
//!
//! Pages are visited in order. A page whose text layer joins to something
//! non-blank becomes a native block immediately. A page without one is
//! rendered (awaited, so a render failure stops the run) and its recognition
//! is spawned onto a [`JoinSet`]; the walk moves on to the next page while
//! OCR runs. Recognised blocks are appended to the shared buffer as each
//! task finishes, so in [`BlockOrder::Arrival`] mode they land wherever
//! their timing puts them.
//!
//! Every OCR task is joined before the buffer is inspected. A failed task
//! costs its page and nothing else.

use super::document::{join_fragments, PdfDocument};
use super::ocr::{recognize_page, OcrEngine};
use crate::config::{BlockOrder, ExtractionConfig};
use crate::error::{ExtractError, OcrError};
use crate::output::{ExtractedText, RunStats, TextBlock};
use crate::progress::{ProgressEvent, ProgressSink};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// What the page walk produced. Durations in `stats` are left at zero for
/// the caller to fill in.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub text: ExtractedText,
    pub stats: RunStats,
    pub ocr_errors: Vec<OcrError>,
}

type SharedText = Arc<Mutex<ExtractedText>>;

/// How one OCR task ended.
enum OcrOutcome {
    Recognised,
    Blank,
    Failed(OcrError),
}

/// Extract every page of `doc`.
///
/// Errors from the decoder (text content or rendering) abort the run and
/// drop any OCR still in flight. Returns
/// [`ExtractError::NoTextExtracted`] when no non-blank block survives.
pub async fn extract_pages(
    doc: Arc<dyn PdfDocument>,
    ocr: Arc<dyn OcrEngine>,
    config: &ExtractionConfig,
    sink: &ProgressSink,
) -> Result<PipelineOutput, ExtractError> {
    let total = doc.page_count();
    let text: SharedText = Arc::new(Mutex::new(ExtractedText::new()));
    let mut tasks: JoinSet<(usize, OcrOutcome)> = JoinSet::new();
    let mut stats = RunStats {
        total_pages: total,
        ..RunStats::default()
    };

    for page in 1..=total {
        sink.emit(ProgressEvent::PageStarted {
            page,
            total_pages: total,
        });

        let fragments = doc.text_content(page).await?;
        let joined = join_fragments(&fragments);

        if !joined.trim().is_empty() {
            debug!("Page {}: {} chars of native text", page, joined.chars().count());
            append(&text, TextBlock::native(page, joined), sink).await;
            stats.native_pages += 1;
            continue;
        }

        if !ocr.is_enabled() {
            debug!("Page {}: no text layer and OCR is off", page);
            stats.blank_pages += 1;
            continue;
        }

        debug!("Page {}: no text layer, rendering for OCR", page);
        let image = doc.render(page, config.render_scale).await?;
        sink.emit(ProgressEvent::OcrQueued { page });

        let engine = Arc::clone(&ocr);
        let text = Arc::clone(&text);
        let sink = sink.clone();
        let language = config.ocr_language.clone();
        tasks.spawn(async move {
            let outcome = match recognize_page(engine.as_ref(), page, &image, &language, &sink).await
            {
                Ok(Some(block)) => {
                    append(&text, block, &sink).await;
                    OcrOutcome::Recognised
                }
                Ok(None) => OcrOutcome::Blank,
                Err(e) => OcrOutcome::Failed(e),
            };
            (page, outcome)
        });
    }

    let mut ocr_errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, OcrOutcome::Recognised)) => stats.ocr_pages += 1,
            Ok((page, OcrOutcome::Blank)) => {
                debug!("Page {}: OCR found nothing", page);
                stats.blank_pages += 1;
            }
            Ok((page, OcrOutcome::Failed(e))) => {
                warn!("Page {}: OCR failed: {}", page, e);
                sink.emit(ProgressEvent::OcrFailed {
                    page,
                    error: e.to_string(),
                });
                stats.ocr_failed_pages += 1;
                ocr_errors.push(e);
            }
            Err(e) => {
                warn!("OCR task did not complete: {}", e);
                stats.ocr_failed_pages += 1;
                ocr_errors.push(OcrError::TaskAborted {
                    detail: e.to_string(),
                });
            }
        }
    }
    ocr_errors.sort_by_key(|e| e.page());

    let mut text = std::mem::take(&mut *text.lock().await);
    if config.block_order == BlockOrder::PageOrder {
        text.sort_by_page();
    }

    sink.emit(ProgressEvent::PagesFinished { blocks: text.len() });
    info!(
        "Pages done: {} native, {} OCR, {} failed, {} blank",
        stats.native_pages, stats.ocr_pages, stats.ocr_failed_pages, stats.blank_pages
    );

    if text.is_empty() {
        return Err(ExtractError::NoTextExtracted { pages: total });
    }

    Ok(PipelineOutput {
        text,
        stats,
        ocr_errors,
    })
}

async fn append(text: &SharedText, block: TextBlock, sink: &ProgressSink) {
    let event = ProgressEvent::BlockAppended {
        page: block.page,
        provenance: block.provenance,
        chars: block.text.chars().count(),
    };
    text.lock().await.push(block);
    sink.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::DisabledOcr;
    use crate::progress::{OcrProgress, event_channel};
    use async_trait::async_trait;
    use image::{DynamicImage, RgbaImage};

    struct Pages(Vec<&'static str>);

    #[async_trait]
    impl PdfDocument for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        async fn text_content(&self, page: usize) -> Result<Vec<String>, ExtractError> {
            Ok(self.0[page - 1]
                .split('|')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect())
        }

        async fn render(&self, _page: usize, _scale: f32) -> Result<DynamicImage, ExtractError> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(4, 4)))
        }
    }

    struct Echo;

    #[async_trait]
    impl OcrEngine for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn recognize(
            &self,
            _image: &DynamicImage,
            _language: &str,
            progress: &OcrProgress,
        ) -> Result<String, OcrError> {
            Ok(format!("scanned {}", progress.page()))
        }
    }

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    #[tokio::test]
    async fn native_fragments_join_with_spaces() {
        let doc = Arc::new(Pages(vec!["Hello|world"]));
        let out = extract_pages(doc, Arc::new(Echo), &config(), &ProgressSink::default())
            .await
            .unwrap();
        assert_eq!(out.text.render(), "Page 1:\nHello world\n\n");
        assert_eq!(out.stats.native_pages, 1);
    }

    #[tokio::test]
    async fn empty_page_goes_to_ocr() {
        let doc = Arc::new(Pages(vec!["Intro", "", "Outro"]));
        let (tx, mut rx) = event_channel();
        let sink = ProgressSink::new(Some(tx));
        let out = extract_pages(doc, Arc::new(Echo), &config(), &sink).await.unwrap();

        assert_eq!(
            out.text.render(),
            "Page 1:\nIntro\n\nOCR Text from page 2:\nscanned 2\n\nPage 3:\nOutro\n\n"
        );
        assert_eq!(out.stats.ocr_pages, 1);

        let mut queued = false;
        while let Ok(event) = rx.try_recv() {
            queued |= event == ProgressEvent::OcrQueued { page: 2 };
        }
        assert!(queued);
    }

    #[tokio::test]
    async fn whitespace_fragments_count_as_empty() {
        let doc = Arc::new(Pages(vec!["Body", " |  "]));
        let out = extract_pages(doc, Arc::new(DisabledOcr), &config(), &ProgressSink::default())
            .await
            .unwrap();
        assert_eq!(out.text.len(), 1);
        assert_eq!(out.stats.blank_pages, 1);
    }

    #[tokio::test]
    async fn nothing_extracted_is_an_error() {
        let doc = Arc::new(Pages(vec!["", ""]));
        let err = extract_pages(doc, Arc::new(DisabledOcr), &config(), &ProgressSink::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoTextExtracted { pages: 2 }));
    }

    #[tokio::test]
    async fn zero_pages_is_an_error() {
        let doc = Arc::new(Pages(vec![]));
        let err = extract_pages(doc, Arc::new(Echo), &config(), &ProgressSink::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::NoTextExtracted { pages: 0 }));
    }
}
