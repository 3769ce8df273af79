//! Embedded text layer extraction

use crate::document::DocumentHandle;
use crate::error::{IngestError, Result};

/// Concatenate the embedded text of every page
///
/// Pages are read one at a time in order. Items on a page are joined with a
/// space, pages with a newline, and the result is trimmed.
pub async fn extract_text_layer(handle: &DocumentHandle) -> Result<String> {
    let total = handle.page_count();
    let mut pages = Vec::with_capacity(total);

    for page_number in 1..=total {
        let data = handle.data();
        let page_index = page_number - 1;

        let items = handle
            .engine()
            .run(move |backend| backend.page_text_items(&data, page_index))
            .await
            .map_err(|e| match e {
                IngestError::TextExtraction { .. } | IngestError::Worker(_) => e,
                other => IngestError::text_extraction(page_number, other.to_string()),
            })?;

        let page_text = items.join(" ");
        tracing::debug!(page_number, total, chars = page_text.chars().count(), "Page text read");
        pages.push(page_text);
    }

    Ok(join_pages(&pages))
}

/// Join page texts with newlines and trim the result
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut full = String::new();
    for page in pages {
        full.push_str(page.as_ref());
        full.push('\n');
    }
    full.trim().to_string()
}

/// Whether extracted text is long enough to skip OCR
///
/// Blank text is never adequate, whatever the threshold.
pub fn is_adequate(text: &str, min_chars: usize) -> bool {
    let chars = text.trim().chars().count();
    chars > 0 && chars >= min_chars
}
