//! Image encoding: rendered page → PNG bytes → base64 `ImageData`.
//!
//! Page sources hand out plain PNG bytes; the enricher wraps them into the
//! provider's image type at call time. `detail: "high"` requests the full
//! tile budget from GPT-4-class models.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} PNG bytes",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap PNG bytes as a base64 image attachment for the VLM request.
pub fn to_image_data(png: &[u8]) -> ImageData {
    ImageData::new(STANDARD.encode(png), "image/png").with_detail("high")
}
