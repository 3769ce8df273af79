//! Open documents
//!
//! A [`DocumentHandle`] owns a private copy of the caller's bytes. The copy is
//! shared (`Arc<[u8]>`) with the engine jobs of this one invocation and is
//! never handed back to the caller.

use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{IngestError, Result};

/// PDF header may be preceded by junk; readers scan the first kilobyte
const HEADER_SEARCH_WINDOW: usize = 1024;

/// An open document for one pipeline invocation
pub struct DocumentHandle {
    engine: Engine,
    data: Arc<[u8]>,
    page_count: usize,
}

impl DocumentHandle {
    /// Copy `bytes` and open them with `engine`
    pub async fn open(engine: &Engine, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(IngestError::DocumentOpen("empty input buffer".to_string()));
        }
        if !has_pdf_header(bytes) {
            return Err(IngestError::DocumentOpen(
                "invalid PDF file (missing %PDF header)".to_string(),
            ));
        }

        let data: Arc<[u8]> = Arc::from(bytes);

        let job_data = Arc::clone(&data);
        let page_count = engine
            .run(move |backend| backend.page_count(&job_data))
            .await
            .map_err(|e| match e {
                IngestError::DocumentOpen(_) | IngestError::Worker(_) => e,
                other => IngestError::DocumentOpen(other.to_string()),
            })?;

        tracing::debug!(bytes_len = data.len(), page_count, "Document opened");

        Ok(Self {
            engine: engine.clone(),
            data,
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Shared bytes for an engine job
    pub(crate) fn data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("bytes_len", &self.data.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}
