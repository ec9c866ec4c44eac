//! Decoder boundary: the traits the page pipeline talks to.
//!
//! The pipeline never sees pdfium directly. [`PdfDecoder`] turns a byte buffer
//! into a [`PdfDocument`]; the document answers per-page text and render
//! requests. [`crate::pipeline::pdfium`] provides the real implementation and
//! tests plug in in-memory fakes.

use crate::error::ExtractError;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;

/// Opens documents from bytes.
#[async_trait]
pub trait PdfDecoder: Send + Sync {
    /// Parse `bytes` into a document. `name` is only used in error messages.
    async fn open(&self, name: &str, bytes: Vec<u8>) -> Result<Arc<dyn PdfDocument>, ExtractError>;
}

/// An opened document. Pages are 1-indexed.
#[async_trait]
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Text fragments of the page's embedded text layer, in content order.
    /// An image-only page returns an empty list (or only blank fragments).
    async fn text_content(&self, page: usize) -> Result<Vec<String>, ExtractError>;

    /// Rasterise the page; at `scale` 1.0 one point is one pixel.
    async fn render(&self, page: usize, scale: f32) -> Result<DynamicImage, ExtractError>;
}

/// Join fragments the way the page pipeline compares them: single spaces.
pub fn join_fragments(fragments: &[String]) -> String {
    fragments.join(" ")
}
