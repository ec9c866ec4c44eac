//! Run orchestration: file selection, state machine, summary and chart.
//!
//! An [`Orchestrator`] owns one decoder, one OCR engine and a
//! [`TriggerControl`]. Only one run may be in flight per orchestrator; a
//! second call while busy returns [`ExtractError::Busy`] and changes nothing.
//!
//! ```text
//! Idle ──▶ Loading ──▶ Extracting ──▶ Summarizing ──▶ Idle
//!             │            │
//!             └────────────┴──▶ Error ──▶ Idle
//! ```

use crate::chart::{build_dataset, MIN_CHART_VALUES};
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{DocumentInfo, ExtractionReport};
use crate::pipeline::document::PdfDecoder;
use crate::pipeline::input::{load_pdf, validate_pdf_bytes, LoadedFile};
use crate::pipeline::ocr::{build_ocr_engine, OcrEngine};
use crate::pipeline::pages::extract_pages;
use crate::pipeline::pdfium::PdfiumDecoder;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::summarize::summarize;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where an orchestrator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    /// Reading and validating the input.
    Loading,
    /// Opening the document and walking its pages.
    Extracting,
    /// Building the summary and chart dataset.
    Summarizing,
    /// The run failed; always followed by `Idle`.
    Error,
}

/// The "start extraction" control. Disabled while a run is in flight.
#[derive(Debug)]
pub struct TriggerControl {
    enabled: AtomicBool,
}

impl Default for TriggerControl {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }
}

impl TriggerControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Disable the control if it is enabled. The returned guard re-enables
    /// it when dropped; `None` means another holder already has it.
    pub fn try_disable(&self) -> Option<TriggerGuard<'_>> {
        self.enabled
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard { control: self })
    }
}

/// Holds a [`TriggerControl`] disabled for its lifetime.
#[derive(Debug)]
pub struct TriggerGuard<'a> {
    control: &'a TriggerControl,
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.control.enabled.store(true, Ordering::Release);
    }
}

/// Ties one run to its orchestrator. On drop the state falls back to Idle
/// (covering cancellation and panics) and then the trigger is released.
struct RunGuard<'a> {
    owner: &'a Orchestrator,
    _trigger: TriggerGuard<'a>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.owner.state() != RunState::Idle {
            self.owner.set_state(RunState::Idle);
        }
    }
}

/// Drives extraction runs.
pub struct Orchestrator {
    decoder: Arc<dyn PdfDecoder>,
    ocr: Arc<dyn OcrEngine>,
    config: ExtractionConfig,
    sink: ProgressSink,
    trigger: TriggerControl,
    state: watch::Sender<RunState>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ocr", &self.ocr.name())
            .field("config", &self.config)
            .field("trigger", &self.trigger)
            .field("state", &self.state())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        decoder: Arc<dyn PdfDecoder>,
        ocr: Arc<dyn OcrEngine>,
        config: ExtractionConfig,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            decoder,
            ocr,
            sink: ProgressSink::new(config.events.clone()),
            config,
            trigger: TriggerControl::new(),
            state,
        }
    }

    /// pdfium decoder plus the OCR engine named in `config`.
    pub fn from_config(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let decoder = PdfiumDecoder::new(config.pdfium_lib_path.clone(), config.password.clone());
        let ocr = build_ocr_engine(&config)?;
        Ok(Self::new(Arc::new(decoder), ocr, config))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Receiver that sees every state change from now on.
    pub fn state_updates(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub fn trigger_enabled(&self) -> bool {
        self.trigger.is_enabled()
    }

    /// Extract text from the selected file.
    ///
    /// `None` fails with [`ExtractError::NoFileSelected`] before the trigger
    /// or the state is touched.
    pub async fn extract(&self, selection: Option<&Path>) -> Result<ExtractionReport, ExtractError> {
        let path = selection.ok_or(ExtractError::NoFileSelected)?;
        let _run = self.begin()?;
        let started = Instant::now();

        self.set_state(RunState::Loading);
        let result = match load_pdf(path).await {
            Ok(file) => self.process(file, started).await,
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    /// Same as [`extract`](Self::extract) for a document already in memory.
    pub async fn extract_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ExtractionReport, ExtractError> {
        let _run = self.begin()?;
        let started = Instant::now();

        self.set_state(RunState::Loading);
        let result = match validate_pdf_bytes(file_name, &bytes) {
            Ok(()) => {
                let file = LoadedFile {
                    name: file_name.to_string(),
                    bytes,
                };
                self.process(file, started).await
            }
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    fn begin(&self) -> Result<RunGuard<'_>, ExtractError> {
        match self.trigger.try_disable() {
            Some(trigger) => Ok(RunGuard {
                owner: self,
                _trigger: trigger,
            }),
            None => {
                warn!("Extraction requested while another run is in progress");
                Err(ExtractError::Busy)
            }
        }
    }

    fn set_state(&self, state: RunState) {
        debug!("State → {:?}", state);
        self.state.send_replace(state);
        self.sink.emit(ProgressEvent::StateChanged { state });
    }

    fn finish(
        &self,
        result: Result<ExtractionReport, ExtractError>,
    ) -> Result<ExtractionReport, ExtractError> {
        if let Err(ref e) = result {
            error!("Extraction failed: {}", e);
            self.set_state(RunState::Error);
        }
        self.set_state(RunState::Idle);
        result
    }

    async fn process(
        &self,
        file: LoadedFile,
        started: Instant,
    ) -> Result<ExtractionReport, ExtractError> {
        let LoadedFile { name, bytes } = file;
        let byte_len = bytes.len();
        let load_ms = started.elapsed().as_millis() as u64;

        self.set_state(RunState::Extracting);
        let extract_start = Instant::now();
        info!("Extracting text from '{}' ({} bytes)", name, byte_len);

        let doc = self.decoder.open(&name, bytes).await?;
        let page_count = doc.page_count();
        self.sink
            .emit(ProgressEvent::DocumentOpened { page_count });

        let output = extract_pages(doc, Arc::clone(&self.ocr), &self.config, &self.sink).await?;
        let extract_ms = extract_start.elapsed().as_millis() as u64;

        self.set_state(RunState::Summarizing);
        let text = output.text.render();
        let summary = summarize(&text, self.config.summary_limit);
        let chart = build_dataset(&text);
        if chart.is_none() {
            debug!("Fewer than {} numbers in the text; no chart", MIN_CHART_VALUES);
        }

        let mut stats = output.stats;
        stats.load_duration_ms = load_ms;
        stats.extract_duration_ms = extract_ms;
        stats.total_duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "Extracted {} chars from {} pages in {}ms",
            text.chars().count(),
            page_count,
            stats.total_duration_ms
        );

        Ok(ExtractionReport {
            document: DocumentInfo {
                file_name: name,
                byte_len,
                page_count,
            },
            blocks: output.text,
            text,
            summary,
            chart,
            stats,
            ocr_errors: output.ocr_errors,
        })
    }
}

// ── Convenience entry points ─────────────────────────────────────────────

/// Extract a file with pdfium and the OCR engine named in `config`.
///
/// # Example
///
/// ```rust,no_run
/// use pdfglance::{extract_file, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = extract_file("scan.pdf", &ExtractionConfig::default()).await?;
/// println!("{}", report.summary);
/// # Ok(())
/// # }
/// ```
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionReport, ExtractError> {
    Orchestrator::from_config(config.clone())?
        .extract(Some(path.as_ref()))
        .await
}

/// Synchronous wrapper around [`extract_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_file_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionReport, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_file(path, config))
}

/// Write `contents` to `path` through a temporary sibling and a rename, so a
/// reader never sees a half-written file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ExtractError> {
    let failed = |e: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)?;
    Ok(())
}
