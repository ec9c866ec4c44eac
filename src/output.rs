//! Output types: extracted text blocks, run statistics and the final report.

use crate::chart::ChartDataset;
use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a block of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The page's embedded text layer.
    Native,
    /// Optical character recognition of the rendered page.
    Ocr,
}

/// Text contributed by a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// 1-indexed page number.
    pub page: usize,
    pub provenance: Provenance,
    pub text: String,
}

impl TextBlock {
    pub fn native(page: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            provenance: Provenance::Native,
            text: text.into(),
        }
    }

    pub fn ocr(page: usize, text: impl Into<String>) -> Self {
        Self {
            page,
            provenance: Provenance::Ocr,
            text: text.into(),
        }
    }

    /// Header line introducing the block, without the trailing newline.
    pub fn header(&self) -> String {
        match self.provenance {
            Provenance::Native => format!("Page {}:", self.page),
            Provenance::Ocr => format!("OCR Text from page {}:", self.page),
        }
    }
}

impl fmt::Display for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n\n", self.header(), self.text)
    }
}

/// Append-only sequence of per-page text blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedText {
    blocks: Vec<TextBlock>,
}

impl ExtractedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: TextBlock) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when no block carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.text.trim().is_empty())
    }

    /// Pages that contributed a block of the given provenance, in block order.
    pub fn pages_with(&self, provenance: Provenance) -> Vec<usize> {
        self.blocks
            .iter()
            .filter(|b| b.provenance == provenance)
            .map(|b| b.page)
            .collect()
    }

    /// Concatenate every block into the displayed text.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Stable sort by page number; blocks of the same page keep their order.
    pub(crate) fn sort_by_page(&mut self) {
        self.blocks.sort_by_key(|b| b.page);
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

/// Basic facts about the processed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub byte_len: usize,
    pub page_count: usize,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_pages: usize,
    /// Pages whose text layer was used.
    pub native_pages: usize,
    /// Pages recognised by OCR.
    pub ocr_pages: usize,
    /// Pages where OCR failed.
    pub ocr_failed_pages: usize,
    /// Pages that produced no text at all (OCR disabled or blank result).
    pub blank_pages: usize,
    pub load_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a finished run produced.
///
/// `text`, `summary` and `chart` are the three display regions; `blocks` keeps
/// the per-page provenance behind `text`.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub document: DocumentInfo,
    pub blocks: ExtractedText,
    pub text: String,
    pub summary: String,
    pub chart: Option<ChartDataset>,
    pub stats: RunStats,
    pub ocr_errors: Vec<OcrError>,
}
