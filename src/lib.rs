//! PDF ingestion
//!
//! Turns an uploaded PDF buffer into plain text and a first-page preview.
//! The embedded text layer is used when it carries enough characters;
//! otherwise every page is rendered and run through OCR.
//!
//! ```rust,ignore
//! use pdf_ingest::ExtractionPipeline;
//!
//! pdf_ingest::telemetry::init_tracing(None);
//!
//! let pipeline = ExtractionPipeline::from_env();
//! let extracted = pipeline.extract_text(&bytes).await?;
//! let preview = pipeline.build_preview(&bytes, "upload.pdf").await;
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod preview;
pub mod raster;
pub mod telemetry;
pub mod text_layer;

pub use config::IngestConfig;
pub use document::DocumentHandle;
pub use engine::{Engine, EngineLoader, EngineStatus};
pub use error::{IngestError, Result};
pub use ocr::{OcrService, PageDiagnostic};
pub use pipeline::{ExtractionMethod, ExtractionPipeline, ExtractionResult, PipelineStage};
pub use preview::ConversionResult;
