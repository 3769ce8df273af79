//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::{OcrError, OcrProviderKind, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Get the provider type
    fn kind(&self) -> OcrProviderKind;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Recognize the text in a PNG-encoded image
    async fn recognize(&self, png: &[u8], language: &str) -> Result<OcrResult, OcrError>;
}

/// Tesseract CLI provider
pub struct TesseractProvider {
    /// Binary to invoke
    binary: String,
    /// Where input images are staged; the system temp dir when unset
    temp_dir: Option<PathBuf>,
}

impl TesseractProvider {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            temp_dir: None,
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Stage `png` in a temp file that is removed when the handle drops
    async fn stage_input(&self, png: &[u8]) -> Result<NamedTempFile, OcrError> {
        let write_err =
            |e: std::io::Error| OcrError::ProcessingError(format!("Failed to write temp file: {}", e));

        let mut builder = tempfile::Builder::new();
        builder.prefix("ocr_input_").suffix(".png");
        let input = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(write_err)?;

        let mut file = tokio::fs::File::from_std(input.reopen().map_err(write_err)?);
        file.write_all(png).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;

        Ok(input)
    }
}

impl Default for TesseractProvider {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrProvider for TesseractProvider {
    fn kind(&self) -> OcrProviderKind {
        OcrProviderKind::Tesseract
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, png: &[u8], language: &str) -> Result<OcrResult, OcrError> {
        // Dropping `input` (including on cancellation) deletes the staged image
        let input = self.stage_input(png).await?;

        // "stdout" as output base prints the text instead of writing <base>.txt
        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .kill_on_drop(true)
            .output()
            .await;

        drop(input);

        let output =
            output.map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            confidence: 80.0, // Tesseract doesn't report page confidence on plain output
            provider: OcrProviderKind::Tesseract,
        })
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn default_url() -> Self {
        Self::new("http://localhost:11434", "llava")
    }
}

#[async_trait]
impl OcrProvider for OllamaProvider {
    fn kind(&self) -> OcrProviderKind {
        OcrProviderKind::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, png: &[u8], language: &str) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(png);

        let prompt = format!(
            "Extract all text from this image exactly as written. The text language is {} \
             (Tesseract code). Return only the extracted text, nothing else.",
            language
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = result["response"].as_str().unwrap_or("").trim().to_string();

        Ok(OcrResult {
            text,
            confidence: 75.0, // LLMs don't provide confidence scores
            provider: OcrProviderKind::Ollama,
        })
    }
}
