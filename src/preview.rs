//! First-page preview images
//!
//! Failures never escape as `Err`: the caller gets a [`ConversionResult`]
//! with `error` populated and can branch on it.

use serde::Serialize;

use crate::document::DocumentHandle;
use crate::engine::EngineLoader;
use crate::error::Result;
use crate::raster::{encode_png, rasterize};

/// Preview of page 1, PNG-encoded
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionResult {
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 0 when `image` is `None`
    pub width: u32,
    pub height: u32,
}

impl ConversionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.image.is_some()
    }
}

/// Render page 1 of `buffer` at `scale` and encode it as PNG
pub async fn build_preview(
    loader: &EngineLoader,
    buffer: &[u8],
    file_name: &str,
    scale: f32,
) -> ConversionResult {
    let file_name = preview_file_name(file_name);

    match render_first_page(loader, buffer, scale).await {
        Ok((png, width, height)) => {
            tracing::info!(file_name = %file_name, width, height, bytes = png.len(), "Preview built");
            ConversionResult {
                image: Some(png),
                file_name,
                error: None,
                width,
                height,
            }
        }
        Err(e) => {
            tracing::error!(file_name = %file_name, "Preview failed: {}", e);
            ConversionResult {
                image: None,
                file_name,
                error: Some(format!("Failed to convert PDF: {}", e)),
                width: 0,
                height: 0,
            }
        }
    }
}

async fn render_first_page(loader: &EngineLoader, buffer: &[u8], scale: f32) -> Result<(Vec<u8>, u32, u32)> {
    let engine = loader.get_engine().await?;
    let handle = DocumentHandle::open(&engine, buffer).await?;

    let image = rasterize(&handle, 1, scale).await?;
    let png = encode_png(&image)?;

    Ok((png, image.width(), image.height()))
}

/// `report.PDF` -> `report.png`; names without a `.pdf` suffix keep theirs
pub fn preview_file_name(file_name: &str) -> String {
    let base = match file_name.len().checked_sub(4) {
        Some(split)
            if file_name.is_char_boundary(split)
                && file_name[split..].eq_ignore_ascii_case(".pdf") =>
        {
            &file_name[..split]
        }
        _ => file_name,
    };
    format!("{}.png", base)
}
