//! Ingestion error types
//!
//! Unified error handling for engine loading, rendering, text extraction and OCR.

use thiserror::Error;

use crate::ocr::OcrError;
use crate::pipeline::PipelineStage;

/// Unified ingestion error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// The parsing/rendering engine could not be initialized
    #[error("Engine load error: {0}")]
    EngineLoad(String),

    /// The input buffer could not be opened as a document
    #[error("Document open error: {0}")]
    DocumentOpen(String),

    /// A page could not be rasterized
    #[error("Render error on page {page}: {message}")]
    Render { page: usize, message: String },

    /// Bitmap encoding failed
    #[error("Image error: {0}")]
    Image(String),

    /// Embedded text could not be read from a page
    #[error("Text extraction error on page {page}: {message}")]
    TextExtraction { page: usize, message: String },

    /// OCR provider failure
    #[error(transparent)]
    Ocr(#[from] OcrError),

    /// Neither the text layer nor OCR produced any text
    #[error("No text could be extracted from the PDF (including OCR)")]
    NoTextExtracted,

    /// Render worker unavailable or a job died
    #[error("Render worker error: {0}")]
    Worker(String),

    /// Whole-invocation timeout
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    /// Terminal failure tagged with the pipeline stage it happened in
    #[error("PDF text extraction failed while {stage}: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    pub fn render(page: usize, message: impl Into<String>) -> Self {
        Self::Render {
            page,
            message: message.into(),
        }
    }

    pub fn text_extraction(page: usize, message: impl Into<String>) -> Self {
        Self::TextExtraction {
            page,
            message: message.into(),
        }
    }

    /// Wrap with the stage it failed in. Already-wrapped errors keep their
    /// original stage.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            wrapped @ Self::Stage { .. } => wrapped,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any stage wrappers removed
    pub fn root(&self) -> &IngestError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stage the error was raised in, if it was tagged
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

impl From<mupdf::Error> for IngestError {
    fn from(err: mupdf::Error) -> Self {
        IngestError::DocumentOpen(err.to_string())
    }
}
