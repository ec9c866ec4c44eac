//! # pdfglance
//!
//! Extract the text of a PDF, fall back to OCR for pages that have no text
//! layer, and produce a short summary plus a small pie-chart dataset from
//! the numbers found in the text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Load       read the file, check the %PDF signature
//!  ├─ 2. Decode     open with pdfium on a dedicated worker thread
//!  ├─ 3. Pages      native text per page; empty pages rendered and OCR'd
//!  │                 concurrently (tesseract or a vision LLM)
//!  ├─ 4. Summarize  first 500 characters + "..."
//!  └─ 5. Chart      first three numbers in the text as a pie dataset
//! ```
//!
//! Each page becomes a block: `Page N:` for native text and
//! `OCR Text from page N:` for recognised text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfglance::{extract_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let report = extract_file("report.pdf", &config).await?;
//!     println!("{}", report.text);
//!     println!("Summary: {}", report.summary);
//!     if let Some(chart) = &report.chart {
//!         println!("Chart values: {:?}", chart.values);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfglance` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfglance = { version = "0.1", default-features = false }
//! ```
//!
//! ## OCR Backends
//!
//! | Backend | Needs | Notes |
//! |---------|-------|-------|
//! | `tesseract` | `tesseract` on `PATH` | Default; language packs via `--lang` |
//! | `vision` | an LLM API key | Any vision model supported by `edgequake-llm` |
//! | `disabled` | nothing | Image-only pages contribute no text |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chart;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chart::{build_dataset, ChartDataset, ChartKind, ChartRenderer, PieChartRenderer};
pub use config::{BlockOrder, ExtractionConfig, ExtractionConfigBuilder, OcrBackend};
pub use error::{ChartError, ErrorKind, ExtractError, OcrError};
pub use orchestrator::{
    extract_file, extract_file_sync, write_atomic, Orchestrator, RunState, TriggerControl,
};
pub use output::{DocumentInfo, ExtractedText, ExtractionReport, Provenance, RunStats, TextBlock};
pub use pipeline::document::{PdfDecoder, PdfDocument};
pub use pipeline::ocr::{DisabledOcr, OcrEngine, TesseractEngine};
pub use pipeline::pdfium::PdfiumDecoder;
pub use pipeline::vision::VisionOcrEngine;
pub use progress::{event_channel, EventReceiver, EventSender, OcrProgress, ProgressEvent};
pub use summarize::summarize;
