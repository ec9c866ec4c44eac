//! Chart dataset extraction and pie-chart rasterisation.
//!
//! The dataset is whatever numbers appear first in the extracted text; no
//! attempt is made to understand what they measure. Rendering uses
//! `tiny-skia` into an in-memory pixmap, encoded as PNG.

use crate::error::ChartError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};
use std::path::Path;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::debug;

/// Fixed slice labels; a dataset always carries all three.
pub const CHART_LABELS: [&str; 3] = ["Data 1", "Data 2", "Data 3"];

/// Fixed slice colours, matched to values by index.
pub const CHART_COLORS: [&str; 3] = ["#FF5733", "#33FF57", "#3357FF"];

/// Fewer numbers than this and no chart is produced.
pub const MIN_CHART_VALUES: usize = 2;

/// At most this many numbers are charted.
pub const MAX_CHART_VALUES: usize = 3;

// ASCII word boundaries, so digits glued to accented letters still count.
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)[0-9]+(?:\.[0-9]+)?(?-u:\b)").unwrap());

/// Kind of chart a dataset describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Pie,
}

/// Declarative chart description: kind, labels, values and colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

/// Every integer or decimal number in `text`, in order of appearance.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    RE_NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Build a pie dataset from the first three numbers in `text`.
///
/// Returns `None` when fewer than two numbers are found.
pub fn build_dataset(text: &str) -> Option<ChartDataset> {
    let numbers = extract_numbers(text);
    if numbers.len() < MIN_CHART_VALUES {
        debug!("Not enough data for visualization ({} numbers)", numbers.len());
        return None;
    }

    Some(ChartDataset {
        kind: ChartKind::Pie,
        labels: CHART_LABELS.iter().map(|s| s.to_string()).collect(),
        values: numbers.into_iter().take(MAX_CHART_VALUES).collect(),
        colors: CHART_COLORS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Something that can turn a dataset into an encoded image.
pub trait ChartRenderer {
    /// Render `dataset`, returning PNG bytes.
    fn render(&self, dataset: &ChartDataset) -> Result<Vec<u8>, ChartError>;

    /// Render `dataset` and write the PNG to `path`.
    fn render_to_file(&self, dataset: &ChartDataset, path: &Path) -> Result<(), ChartError> {
        let png = self.render(dataset)?;
        std::fs::write(path, png).map_err(|source| ChartError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Pie chart on a white canvas with a row of colour swatches underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PieChartRenderer {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
        }
    }
}

const LEGEND_HEIGHT: f32 = 32.0;
const MARGIN: f32 = 12.0;
const SWATCH: f32 = 14.0;
// Arc flattening step, in radians (about 2 degrees).
const ARC_STEP: f32 = 0.035;

impl PieChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn sector(cx: f32, cy: f32, r: f32, start: f32, sweep: f32) -> Option<tiny_skia::Path> {
        let steps = ((sweep / ARC_STEP).ceil() as usize).max(1);
        let mut pb = PathBuilder::new();
        pb.move_to(cx, cy);
        for i in 0..=steps {
            let a = start + sweep * i as f32 / steps as f32;
            pb.line_to(cx + r * a.cos(), cy + r * a.sin());
        }
        pb.close();
        pb.finish()
    }
}

impl ChartRenderer for PieChartRenderer {
    fn render(&self, dataset: &ChartDataset) -> Result<Vec<u8>, ChartError> {
        if dataset.values.len() < MIN_CHART_VALUES {
            return Err(ChartError::NotEnoughValues {
                found: dataset.values.len(),
            });
        }
        let total: f64 = dataset.values.iter().sum();
        if total <= 0.0 {
            return Err(ChartError::EmptyTotal);
        }

        let invalid = ChartError::InvalidCanvas {
            width: self.width,
            height: self.height,
        };
        if (self.width as f32) < 2.0 * MARGIN + SWATCH
            || (self.height as f32) < 2.0 * MARGIN + LEGEND_HEIGHT + SWATCH
        {
            return Err(invalid);
        }
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(invalid)?;
        pixmap.fill(Color::WHITE);

        let w = self.width as f32;
        let pie_h = self.height as f32 - LEGEND_HEIGHT;
        let (cx, cy) = (w / 2.0, pie_h / 2.0);
        let r = (w.min(pie_h) / 2.0 - MARGIN).max(1.0);

        let mut border = Paint::default();
        border.set_color(Color::WHITE);
        border.anti_alias = true;
        let stroke = Stroke {
            width: 2.0,
            ..Stroke::default()
        };

        // 12 o'clock, clockwise (y grows downwards).
        let mut angle = -FRAC_PI_2;
        let slot = w / dataset.values.len() as f32;
        for (i, value) in dataset.values.iter().enumerate() {
            let mut paint = Paint::default();
            paint.set_color(slice_color(dataset, i));
            paint.anti_alias = true;

            let sweep = (value / total) as f32 * TAU;
            if sweep > 0.0 {
                if let Some(path) = Self::sector(cx, cy, r, angle, sweep) {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                    pixmap.stroke_path(&path, &border, &stroke, Transform::identity(), None);
                }
                angle += sweep;
            }

            let x = slot * i as f32 + (slot - SWATCH) / 2.0;
            let y = pie_h + (LEGEND_HEIGHT - SWATCH) / 2.0;
            if let Some(rect) = Rect::from_xywh(x, y, SWATCH, SWATCH) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }

        pixmap
            .encode_png()
            .map_err(|e| ChartError::EncodeFailed(e.to_string()))
    }
}

/// Colour for slice `i`, falling back to grey for unparsable entries.
fn slice_color(dataset: &ChartDataset, i: usize) -> Color {
    dataset
        .colors
        .get(i)
        .and_then(|c| parse_hex_color(c))
        .unwrap_or_else(|| Color::from_rgba8(128, 128, 128, 255))
}

/// Parse `#RRGGBB`.
fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_sentence_yields_two_values() {
        let ds = build_dataset("Revenue was 120.5 and costs were 80 last year").expect("dataset");
        assert_eq!(ds.kind, ChartKind::Pie);
        assert_eq!(ds.values, vec![120.5, 80.0]);
        assert_eq!(ds.labels, vec!["Data 1", "Data 2", "Data 3"]);
        assert_eq!(ds.colors, vec!["#FF5733", "#33FF57", "#3357FF"]);
    }

    #[test]
    fn no_numbers_no_chart() {
        assert!(build_dataset("no numbers here").is_none());
    }

    #[test]
    fn single_number_no_chart() {
        assert!(build_dataset("only 42 here").is_none());
    }

    #[test]
    fn takes_first_three() {
        let ds = build_dataset("1 2 3 4 5").unwrap();
        assert_eq!(ds.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn page_headers_are_scanned_too() {
        let ds = build_dataset("Page 1:\nTotal 250\n\n").unwrap();
        assert_eq!(ds.values, vec![1.0, 250.0]);
    }

    #[test]
    fn numbers_inside_words_are_ignored() {
        assert_eq!(extract_numbers("abc123 x9 7 and 3.25"), vec![7.0, 3.25]);
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() {
        assert_eq!(extract_numbers("costs were 80. Then 12.5."), vec![80.0, 12.5]);
    }

    #[test]
    fn parse_hex() {
        let c = parse_hex_color("#FF5733").unwrap();
        assert_eq!(c.to_color_u8().red(), 0xFF);
        assert_eq!(c.to_color_u8().green(), 0x57);
        assert_eq!(c.to_color_u8().blue(), 0x33);
        assert!(parse_hex_color("FF5733").is_none());
        assert!(parse_hex_color("#GG0000").is_none());
    }

    #[test]
    fn renders_png_of_requested_size() {
        let ds = build_dataset("10 20 30").unwrap();
        let png = PieChartRenderer::new(200, 160).render(&ds).expect("render");
        let img = image::load_from_memory(&png).expect("valid png");
        assert_eq!((img.width(), img.height()), (200, 160));
    }

    #[test]
    fn first_slice_starts_at_twelve_o_clock() {
        // Two equal slices: the right half is slice 1, the left half slice 2.
        let ds = build_dataset("5 5").unwrap();
        let png = PieChartRenderer::default().render(&ds).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        let right = img.get_pixel(300, 184);
        let left = img.get_pixel(100, 184);
        assert_eq!(&right.0[..3], &[0xFF, 0x57, 0x33]);
        assert_eq!(&left.0[..3], &[0x33, 0xFF, 0x57]);
    }

    #[test]
    fn zero_total_is_rejected() {
        let ds = build_dataset("0 and 0.0").unwrap();
        assert!(matches!(
            PieChartRenderer::default().render(&ds),
            Err(ChartError::EmptyTotal)
        ));
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let ds = build_dataset("1 2").unwrap();
        assert!(matches!(
            PieChartRenderer::new(10, 10).render(&ds),
            Err(ChartError::InvalidCanvas { .. })
        ));
    }

    #[test]
    fn render_to_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let ds = build_dataset("3 4").unwrap();
        PieChartRenderer::default()
            .render_to_file(&ds, &path)
            .expect("written");
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
