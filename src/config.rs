//! Configuration management for the ingestion pipeline
//!
//! Every setting has a default; `from_env` overrides from `INGEST_*`
//! environment variables (a `.env` file is honoured via dotenvy).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::ocr::OcrProviderKind;

/// Minimum trimmed length for an embedded text layer to be used as-is
pub const MIN_TEXT_LAYER_CHARS: usize = 20;
/// Scale for the human-facing first-page preview
pub const PREVIEW_SCALE: f32 = 4.0;
/// Scale for pages rendered as OCR input
pub const OCR_SCALE: f32 = 2.0;
/// Default OCR language (Tesseract code)
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    pub engine: EngineConfig,
    pub render: RenderConfig,
    pub text: TextConfig,
    pub ocr: OcrConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Try to start the dedicated render worker thread
    pub use_worker: bool,
    /// Start a fresh load on the next request after a failed one
    pub retry_failed_load: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub preview_scale: f32,
    pub ocr_scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextConfig {
    pub min_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Provider order; unavailable providers are skipped
    pub providers: Vec<OcrProviderKind>,
    pub default_language: String,
    pub tesseract_path: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound for one whole `extract_text` invocation
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_worker: true,
            retry_failed_load: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_scale: PREVIEW_SCALE,
            ocr_scale: OCR_SCALE,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            min_chars: MIN_TEXT_LAYER_CHARS,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            providers: vec![OcrProviderKind::Tesseract, OcrProviderKind::Ollama],
            default_language: DEFAULT_OCR_LANGUAGE.to_string(),
            tesseract_path: "tesseract".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            engine: EngineConfig {
                use_worker: parse_var("INGEST_ENGINE_WORKER", defaults.engine.use_worker),
                retry_failed_load: parse_var(
                    "INGEST_ENGINE_RETRY",
                    defaults.engine.retry_failed_load,
                ),
            },
            render: RenderConfig {
                preview_scale: positive_scale(
                    "INGEST_PREVIEW_SCALE",
                    defaults.render.preview_scale,
                ),
                ocr_scale: positive_scale("INGEST_OCR_SCALE", defaults.render.ocr_scale),
            },
            text: TextConfig {
                min_chars: positive_count("INGEST_MIN_TEXT_CHARS", defaults.text.min_chars),
            },
            ocr: OcrConfig {
                providers: env::var("INGEST_OCR_PROVIDERS")
                    .ok()
                    .map(|raw| parse_providers(&raw))
                    .filter(|providers| !providers.is_empty())
                    .unwrap_or(defaults.ocr.providers),
                default_language: env::var("INGEST_OCR_LANGUAGE")
                    .unwrap_or(defaults.ocr.default_language),
                tesseract_path: env::var("INGEST_TESSERACT_PATH")
                    .unwrap_or(defaults.ocr.tesseract_path),
                ollama_url: env::var("INGEST_OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: env::var("INGEST_OLLAMA_MODEL")
                    .unwrap_or(defaults.ocr.ollama_model),
            },
            pipeline: PipelineConfig {
                timeout: env::var("INGEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            },
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value {:?} for {}", raw, name);
            default
        }),
        Err(_) => default,
    }
}

fn positive_scale(name: &str, default: f32) -> f32 {
    let scale = parse_var(name, default);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        tracing::warn!("{} must be a positive number, using {}", name, default);
        default
    }
}

fn positive_count(name: &str, default: usize) -> usize {
    match parse_var(name, default) {
        0 => {
            tracing::warn!("{} must be at least 1, using {}", name, default);
            default
        }
        count => count,
    }
}

/// Parse a comma-separated provider list such as `"tesseract,ollama"`
pub(crate) fn parse_providers(raw: &str) -> Vec<OcrProviderKind> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.to_ascii_lowercase().as_str() {
            "tesseract" => Some(OcrProviderKind::Tesseract),
            "ollama" => Some(OcrProviderKind::Ollama),
            other => {
                tracing::warn!("Unknown OCR provider {:?} ignored", other);
                None
            }
        })
        .collect()
}
