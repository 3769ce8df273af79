//! Page-by-page OCR over a rendered document
//!
//! Runs only when the embedded text layer is inadequate. A page that fails to
//! render, encode or recognize contributes an empty line and a diagnostic;
//! it never aborts the remaining pages.

use serde::Serialize;

use super::service::OcrService;
use crate::document::DocumentHandle;
use crate::error::IngestError;
use crate::raster::{encode_png, rasterize};
use crate::text_layer::join_pages;

/// Step of the per-page OCR loop that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStage {
    Render,
    Encode,
    Ocr,
}

/// A page that was skipped during OCR fallback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDiagnostic {
    /// 1-based page number
    pub page: usize,
    pub stage: DiagnosticStage,
    pub message: String,
}

/// Outcome of one page
#[derive(Debug)]
pub struct PageOcr {
    pub page: usize,
    pub result: Result<String, IngestError>,
}

/// Aggregated OCR output for a document
#[derive(Debug, Default)]
pub struct OcrOutcome {
    /// Page texts joined by newlines, trimmed
    pub text: String,
    pub pages: Vec<PageOcr>,
}

impl OcrOutcome {
    /// One diagnostic per failed page, in page order
    pub fn diagnostics(&self) -> Vec<PageDiagnostic> {
        self.pages
            .iter()
            .filter_map(|page| match &page.result {
                Ok(_) => None,
                Err(err) => Some(PageDiagnostic {
                    page: page.page,
                    stage: diagnostic_stage(err),
                    message: err.to_string(),
                }),
            })
            .collect()
    }

    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.result.is_err()).count()
    }
}

fn diagnostic_stage(err: &IngestError) -> DiagnosticStage {
    match err.root() {
        IngestError::Image(_) => DiagnosticStage::Encode,
        IngestError::Ocr(_) => DiagnosticStage::Ocr,
        _ => DiagnosticStage::Render,
    }
}

/// Rasterize, encode and recognize every page in order
pub async fn ocr_fallback(
    handle: &DocumentHandle,
    ocr: &OcrService,
    language: &str,
    scale: f32,
) -> OcrOutcome {
    let total = handle.page_count();
    let mut pages = Vec::with_capacity(total);

    for page_number in 1..=total {
        let result = recognize_page(handle, ocr, page_number, language, scale).await;

        match &result {
            Ok(text) => tracing::debug!(
                page_number,
                total,
                chars = text.chars().count(),
                "OCR page complete"
            ),
            Err(e) => tracing::warn!(page_number, total, "OCR skipped page: {}", e),
        }

        pages.push(PageOcr {
            page: page_number,
            result,
        });
    }

    let page_texts: Vec<&str> = pages
        .iter()
        .map(|page| page.result.as_deref().unwrap_or(""))
        .collect();
    let text = join_pages(&page_texts);

    OcrOutcome { text, pages }
}

async fn recognize_page(
    handle: &DocumentHandle,
    ocr: &OcrService,
    page_number: usize,
    language: &str,
    scale: f32,
) -> Result<String, IngestError> {
    // Bitmap is dropped once encoded; only one page is resident at a time
    let png = {
        let image = rasterize(handle, page_number, scale).await?;
        encode_png(&image)?
    };

    let result = ocr.recognize(&png, Some(language)).await?;
    Ok(result.text.trim().to_string())
}
