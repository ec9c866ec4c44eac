//! Image encoding for the OCR engines.
//!
//! Tesseract reads a PNG file from disk; the vision backend wants base64
//! inside the JSON request body. PNG is used for both because it is lossless:
//! compression artefacts around glyph edges cost recognition accuracy.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap a PNG buffer for a multimodal chat message.
///
/// `detail: "high"` keeps the full tile budget so small print stays legible.
pub fn to_image_data(png: &[u8]) -> ImageData {
    ImageData::new(STANDARD.encode(png), "image/png").with_detail("high")
}
