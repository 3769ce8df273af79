//! OCR Module
//!
//! Recognizes text from rendered pages when a PDF has no usable text layer.
//!
//! Supports multiple backends:
//! - Tesseract (local CLI, requires installation)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdf_ingest::config::OcrConfig;
//! use pdf_ingest::ocr::{ocr_fallback, OcrService};
//!
//! let service = OcrService::new(OcrConfig::default());
//!
//! // Check available providers
//! let providers = service.available_providers().await;
//!
//! // OCR every page of an open document at scale 2
//! let outcome = ocr_fallback(&handle, &service, "eng", 2.0).await;
//! for diagnostic in outcome.diagnostics() {
//!     eprintln!("page {} skipped: {}", diagnostic.page, diagnostic.message);
//! }
//! ```

mod fallback;
mod provider;
mod service;
mod types;

pub use fallback::{ocr_fallback, DiagnosticStage, OcrOutcome, PageDiagnostic, PageOcr};
pub use provider::{OcrProvider, OllamaProvider, TesseractProvider};
pub use service::OcrService;
pub use types::{OcrError, OcrProviderKind, OcrResult};
