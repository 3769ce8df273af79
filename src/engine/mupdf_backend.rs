//! MuPDF backend
//!
//! MuPDF documents are not thread-safe and `mupdf::Document` is `!Send`, so no
//! document outlives a single backend call: every call opens a fresh document
//! from the caller's bytes, does its work, and drops it before returning.

use std::sync::Arc;

use image::RgbaImage;
use mupdf::{Colorspace, Document, Matrix, Pixmap, TextPageOptions};

use super::backend::{EngineFactory, PdfBackend};
use crate::error::{IngestError, Result};

const PDF_MIME: &str = "application/pdf";

/// [`PdfBackend`] implemented on MuPDF
#[derive(Debug, Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    fn open(data: &[u8]) -> Result<Document> {
        Document::from_bytes(data, PDF_MIME).map_err(Into::into)
    }
}

impl PdfBackend for MupdfBackend {
    fn name(&self) -> &str {
        "mupdf"
    }

    fn page_count(&self, data: &[u8]) -> Result<usize> {
        let doc = Self::open(data)?;
        let count = doc.page_count()?;
        Ok(count.max(0) as usize)
    }

    fn page_text_items(&self, data: &[u8], page_index: usize) -> Result<Vec<String>> {
        let page_number = page_index + 1;
        let text_err = |e: mupdf::Error| IngestError::text_extraction(page_number, e.to_string());

        let doc = Self::open(data)?;
        let page = doc.load_page(page_index as i32).map_err(text_err)?;
        let text_page = page
            .to_text_page(TextPageOptions::empty())
            .map_err(text_err)?;

        // One item per stext line
        let mut items = Vec::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let text: String = line.chars().filter_map(|ch| ch.char()).collect();
                if !text.is_empty() {
                    items.push(text);
                }
            }
        }

        Ok(items)
    }

    fn render_page(&self, data: &[u8], page_index: usize, scale: f32) -> Result<RgbaImage> {
        let page_number = page_index + 1;
        let render_err = |e: mupdf::Error| IngestError::render(page_number, e.to_string());

        let doc = Self::open(data)?;
        let page = doc.load_page(page_index as i32).map_err(render_err)?;

        let matrix = Matrix::new_scale(scale, scale);
        let colorspace = Colorspace::device_rgb();
        // No alpha: OCR needs the opaque white page background
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, true)
            .map_err(render_err)?;

        pixmap_to_rgba(&pixmap, page_number)
    }
}

/// Loads [`MupdfBackend`], verifying MuPDF by opening a one-page smoke-test document
#[derive(Debug, Default)]
pub struct MupdfFactory;

impl EngineFactory for MupdfFactory {
    fn load(&self) -> Result<Arc<dyn PdfBackend>> {
        let backend = MupdfBackend;
        let smoke = build_pdf(&[""]);

        let pages = backend
            .page_count(&smoke)
            .map_err(|e| {
                IngestError::EngineLoad(format!("MuPDF smoke test failed: {}", e))
            })?;
        if pages != 1 {
            return Err(IngestError::EngineLoad(format!(
                "MuPDF smoke test returned {} pages, expected 1",
                pages
            )));
        }

        tracing::info!("MuPDF engine ready");
        Ok(Arc::new(backend))
    }
}

/// Copy pixmap samples into an RGBA buffer
/// Bytes needed for a `width` x `height` RGBA buffer
fn rgba_capacity(width: u32, height: u32, page_number: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| {
            IngestError::render(
                page_number,
                format!("pixmap of {}x{} is too large to convert", width, height),
            )
        })
}

fn pixmap_to_rgba(pixmap: &Pixmap, page_number: usize) -> Result<RgbaImage> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba_buffer = Vec::with_capacity(rgba_capacity(width, height, page_number)?);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba_buffer.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(width, height, rgba_buffer).ok_or_else(|| {
        IngestError::render(page_number, "pixmap does not fit an RGBA buffer")
    })
}

/// Build a small single-font PDF with one text run per page
///
/// An empty string yields a page with an empty content stream.
pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::with_capacity(3 + pages.len() * 2);

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        pages.len()
    ));
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    for (i, text) in pages.iter().enumerate() {
        let content = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", escape_pdf_string(text))
        };
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R \
             /Resources << /Font << /F1 3 0 R >> >> >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );

    out
}

fn escape_pdf_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
