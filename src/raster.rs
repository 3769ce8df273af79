//! Page rasterization and PNG encoding

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::document::DocumentHandle;
use crate::error::{IngestError, Result};

/// A rendered page bitmap
///
/// Short-lived: produced for one page, consumed by OCR or encoding, dropped.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number
    pub page_number: usize,
    pub scale: f32,
    pixels: RgbaImage,
}

impl PageImage {
    pub fn new(page_number: usize, scale: f32, pixels: RgbaImage) -> Self {
        Self {
            page_number,
            scale,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}

/// Render page `page_number` (1-based) of `handle` at `scale`
///
/// Waits for the render to finish; the bitmap is never partially filled.
pub async fn rasterize(handle: &DocumentHandle, page_number: usize, scale: f32) -> Result<PageImage> {
    if page_number == 0 || page_number > handle.page_count() {
        return Err(IngestError::render(
            page_number,
            format!(
                "page out of range (document has {} pages)",
                handle.page_count()
            ),
        ));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(IngestError::render(
            page_number,
            format!("invalid scale {}", scale),
        ));
    }

    let data = handle.data();
    let page_index = page_number - 1;
    let pixels = handle
        .engine()
        .run(move |backend| backend.render_page(&data, page_index, scale))
        .await?;

    tracing::debug!(
        page_number,
        scale,
        width = pixels.width(),
        height = pixels.height(),
        "Page rasterized"
    );

    Ok(PageImage::new(page_number, scale, pixels))
}

/// Encode a page bitmap as PNG at the best compression level
pub fn encode_png(image: &PageImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut output, CompressionType::Best, FilterType::Adaptive);

    encoder
        .write_image(
            image.pixels.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| IngestError::Image(e.to_string()))?;

    Ok(output)
}
