//! Progress events for extraction runs.
//!
//! Progress flows over an explicit channel: configure a sender with
//! [`crate::config::ExtractionConfigBuilder::events`] and drain the matching
//! receiver wherever it suits the host application (a progress bar, a log,
//! a UI thread). Sending never blocks and a dropped receiver is ignored.
//!
//! # Example
//!
//! ```rust
//! use pdfglance::{event_channel, ExtractionConfig, ProgressEvent};
//!
//! let (tx, mut rx) = event_channel();
//! let config = ExtractionConfig::builder().events(tx).build().unwrap();
//!
//! # let _ = config;
//! while let Ok(event) = rx.try_recv() {
//!     if let ProgressEvent::OcrFailed { page, error } = event {
//!         eprintln!("page {page}: {error}");
//!     }
//! }
//! ```

use crate::orchestrator::RunState;
use crate::output::Provenance;
use serde::Serialize;
use tokio::sync::mpsc;

/// One observable step of an extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The orchestrator moved to a new state.
    StateChanged { state: RunState },
    /// The document was opened.
    DocumentOpened { page_count: usize },
    /// Native text is being fetched for a page.
    PageStarted { page: usize, total_pages: usize },
    /// A block was appended to the extracted text.
    BlockAppended {
        page: usize,
        provenance: Provenance,
        chars: usize,
    },
    /// A page had no native text and was handed to the OCR engine.
    OcrQueued { page: usize },
    /// Incremental OCR status reported by the engine.
    OcrProgress {
        page: usize,
        status: String,
        progress: f32,
    },
    /// OCR for a page failed; the page contributes no text.
    OcrFailed { page: usize, error: String },
    /// Every page (and every OCR task) has been accounted for.
    PagesFinished { blocks: usize },
}

/// Sending half of the progress channel.
pub type EventSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of the progress channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a new progress channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Cheap, cloneable publisher used inside the pipeline.
///
/// Wraps an optional [`EventSender`]; with no sender every `emit` is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<EventSender>,
}

impl ProgressSink {
    pub fn new(tx: Option<EventSender>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone: nobody is listening, which is fine.
            let _ = tx.send(event);
        }
    }

    /// A page-bound handle handed to OCR engines.
    pub fn for_ocr(&self, page: usize) -> OcrProgress {
        OcrProgress {
            page,
            sink: self.clone(),
        }
    }
}

/// Progress handle passed to [`crate::pipeline::ocr::OcrEngine::recognize`].
#[derive(Debug, Clone)]
pub struct OcrProgress {
    page: usize,
    sink: ProgressSink,
}

impl OcrProgress {
    /// Page this handle reports for.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Publish an engine status; `progress` is clamped to `0.0..=1.0`.
    pub fn report(&self, status: impl Into<String>, progress: f32) {
        self.sink.emit(ProgressEvent::OcrProgress {
            page: self.page,
            status: status.into(),
            progress: progress.clamp(0.0, 1.0),
        });
    }
}
