//! Pipeline stages for PDF text extraction.
//!
//! Each submodule implements one step. The decoder and OCR engine sit behind
//! traits so the page walk can be tested without pdfium or Tesseract.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdfium ──▶ pages ──┬──▶ native text block
//! (bytes)   (decode)  (walk)   └──▶ render ──▶ ocr/vision ──▶ postprocess ──▶ OCR block
//! ```
//!
//! 1. [`input`]       read the file and check the `%PDF` signature
//! 2. [`document`]    decoder traits the rest of the pipeline talks to
//! 3. [`pdfium`]      pdfium implementation, one worker thread per document
//! 4. [`pages`]       visit pages in order and spawn OCR for empty ones
//! 5. [`encode`]      PNG bytes (and base64 image data) for the OCR engines
//! 6. [`ocr`]         OCR engine trait, Tesseract backend, disabled stand-in
//! 7. [`vision`]      vision-LLM OCR backend
//! 8. [`postprocess`] cleanup of recognised text

pub mod document;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod pages;
pub mod pdfium;
pub mod postprocess;
pub mod vision;
