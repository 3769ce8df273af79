//! Extraction pipeline
//!
//! ```text
//! Idle → LoadingEngine → OpeningDocument → ExtractingText ─adequate─► Done
//!                                               │
//!                                               └─short─► OcrFallback ─► Done | Failed
//! ```
//!
//! Nothing survives an invocation except the shared engine.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::config::IngestConfig;
use crate::document::DocumentHandle;
use crate::engine::EngineLoader;
use crate::error::{IngestError, Result};
use crate::ocr::{ocr_fallback, OcrService, PageDiagnostic};
use crate::preview::{build_preview, ConversionResult};
use crate::text_layer::{extract_text_layer, is_adequate};

/// Per-invocation pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    LoadingEngine,
    OpeningDocument,
    ExtractingText,
    OcrFallback,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::LoadingEngine => "loading engine",
            Self::OpeningDocument => "opening document",
            Self::ExtractingText => "extracting text",
            Self::OcrFallback => "running OCR fallback",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How the returned text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    TextLayer,
    Ocr,
}

/// Text extracted from one document
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub page_count: usize,
    /// Pages skipped during OCR fallback
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<PageDiagnostic>,
}

/// Tracks and logs the stage of one invocation
struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
        }
    }

    fn enter(&mut self, next: PipelineStage) {
        tracing::debug!(from = %self.stage, to = %next, "Pipeline stage");
        self.stage = next;
    }

    /// Tag `err` with the current stage and move to `Failed`
    fn fail(&mut self, err: IngestError) -> IngestError {
        let err = err.at_stage(self.stage);
        self.enter(PipelineStage::Failed);
        err
    }
}

/// Text extraction with OCR fallback, plus first-page previews
#[derive(Clone)]
pub struct ExtractionPipeline {
    loader: Arc<EngineLoader>,
    ocr: Arc<OcrService>,
    config: IngestConfig,
}

impl ExtractionPipeline {
    pub fn new(loader: Arc<EngineLoader>, ocr: Arc<OcrService>, config: IngestConfig) -> Self {
        Self { loader, ocr, config }
    }

    /// Global engine and providers configured from `INGEST_*` variables
    pub fn from_env() -> Self {
        let config = IngestConfig::from_env();
        let ocr = Arc::new(OcrService::new(config.ocr.clone()));
        Self::new(EngineLoader::global(), ocr, config)
    }

    pub fn loader(&self) -> &Arc<EngineLoader> {
        &self.loader
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Extract text, using the configured default OCR language if needed
    pub async fn extract_text(&self, buffer: &[u8]) -> Result<ExtractionResult> {
        let language = self.config.ocr.default_language.clone();
        self.extract_text_with_language(buffer, &language).await
    }

    /// Extract text, running OCR in `language` if the text layer is too short
    #[instrument(skip(self, buffer), fields(bytes_len = buffer.len()))]
    pub async fn extract_text_with_language(&self, buffer: &[u8], language: &str) -> Result<ExtractionResult> {
        let mut tracker = StageTracker::new();

        let outcome = match self.config.pipeline.timeout {
            Some(limit) => {
                let timed =
                    tokio::time::timeout(limit, self.run_extraction(buffer, language, &mut tracker)).await;
                match timed {
                    Ok(outcome) => outcome,
                    // Tagged with the stage the run was abandoned in
                    Err(_) => Err(tracker.fail(IngestError::Timeout(limit.as_secs()))),
                }
            }
            None => self.run_extraction(buffer, language, &mut tracker).await,
        };

        match &outcome {
            Ok(result) => tracing::info!(
                method = ?result.method,
                page_count = result.page_count,
                chars = result.text.chars().count(),
                skipped_pages = result.diagnostics.len(),
                "Text extracted"
            ),
            Err(e) => tracing::error!("Failed to extract PDF text: {}", e),
        }

        outcome
    }

    async fn run_extraction(
        &self,
        buffer: &[u8],
        language: &str,
        tracker: &mut StageTracker,
    ) -> Result<ExtractionResult> {
        tracker.enter(PipelineStage::LoadingEngine);
        let engine = self.loader.get_engine().await.map_err(|e| tracker.fail(e))?;

        tracker.enter(PipelineStage::OpeningDocument);
        let handle = DocumentHandle::open(&engine, buffer)
            .await
            .map_err(|e| tracker.fail(e))?;
        let page_count = handle.page_count();

        tracker.enter(PipelineStage::ExtractingText);
        let text = extract_text_layer(&handle).await.map_err(|e| tracker.fail(e))?;

        if is_adequate(&text, self.config.text.min_chars) {
            tracker.enter(PipelineStage::Done);
            return Ok(ExtractionResult {
                text,
                method: ExtractionMethod::TextLayer,
                page_count,
                diagnostics: Vec::new(),
            });
        }

        if !self.ocr.has_available_provider().await {
            if text.is_empty() {
                return Err(tracker.fail(IngestError::NoTextExtracted));
            }
            tracing::warn!(
                chars = text.chars().count(),
                "Low text content but no OCR provider is available; keeping text layer"
            );
            tracker.enter(PipelineStage::Done);
            return Ok(ExtractionResult {
                text,
                method: ExtractionMethod::TextLayer,
                page_count,
                diagnostics: Vec::new(),
            });
        }

        tracker.enter(PipelineStage::OcrFallback);
        tracing::warn!(
            chars = text.chars().count(),
            min_chars = self.config.text.min_chars,
            "Low text content detected; attempting OCR fallback"
        );
        let outcome = ocr_fallback(&handle, &self.ocr, language, self.config.render.ocr_scale).await;

        if outcome.text.is_empty() {
            return Err(tracker.fail(IngestError::NoTextExtracted));
        }

        tracker.enter(PipelineStage::Done);
        Ok(ExtractionResult {
            diagnostics: outcome.diagnostics(),
            text: outcome.text,
            method: ExtractionMethod::Ocr,
            page_count,
        })
    }

    /// Render a PNG preview of page 1 at the configured preview scale
    pub async fn build_preview(&self, buffer: &[u8], file_name: &str) -> ConversionResult {
        build_preview(&self.loader, buffer, file_name, self.config.render.preview_scale).await
    }
}
