//! OCR Service
//!
//! Orchestrates OCR providers in their configured order.

use std::sync::Arc;

use tokio::sync::OnceCell;

use super::{
    provider::{OcrProvider, OllamaProvider, TesseractProvider},
    types::{OcrError, OcrProviderKind, OcrResult},
};
use crate::config::OcrConfig;

/// OCR service for recognizing rendered pages
pub struct OcrService {
    default_language: String,
    providers: Vec<Arc<dyn OcrProvider>>,
    /// Indices into `providers`, checked on first use
    available: OnceCell<Vec<usize>>,
}

impl OcrService {
    /// Create a service with the built-in providers named in `config`
    pub fn new(config: OcrConfig) -> Self {
        let providers = config
            .providers
            .iter()
            .map(|kind| -> Arc<dyn OcrProvider> {
                match kind {
                    OcrProviderKind::Tesseract => {
                        Arc::new(TesseractProvider::new(&config.tesseract_path))
                    }
                    OcrProviderKind::Ollama => {
                        Arc::new(OllamaProvider::new(&config.ollama_url, &config.ollama_model))
                    }
                }
            })
            .collect();

        Self::with_providers(providers, &config.default_language)
    }

    /// Create a service from explicit providers, tried in the given order
    pub fn with_providers(providers: Vec<Arc<dyn OcrProvider>>, default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
            providers,
            available: OnceCell::new(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    async fn available_indices(&self) -> &[usize] {
        self.available
            .get_or_init(|| async {
                let mut available = Vec::new();
                for (index, provider) in self.providers.iter().enumerate() {
                    if provider.is_available().await {
                        available.push(index);
                    } else {
                        tracing::debug!("OCR provider {} is not available", provider.kind());
                    }
                }
                tracing::info!(
                    available = available.len(),
                    configured = self.providers.len(),
                    "OCR provider availability checked"
                );
                available
            })
            .await
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProviderKind> {
        self.available_indices()
            .await
            .iter()
            .map(|&index| self.providers[index].kind())
            .collect()
    }

    pub async fn has_available_provider(&self) -> bool {
        !self.available_indices().await.is_empty()
    }

    /// Recognize a PNG page image, falling through providers on failure
    pub async fn recognize(&self, png: &[u8], language: Option<&str>) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.default_language);
        let mut last_error = None;

        for &index in self.available_indices().await {
            let provider = &self.providers[index];
            match provider.recognize(png, lang).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!("OCR provider {} failed: {}, trying next", provider.kind(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::ProviderNotAvailable("No OCR providers available".to_string())
        }))
    }
}
