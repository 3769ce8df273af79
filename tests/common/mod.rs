//! In-memory engine backend and OCR provider for pipeline tests
//!
//! Rendered pages are small solid bitmaps whose red channel holds the 1-based
//! page number, so the scripted OCR provider can tell which page it was handed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use pdf_ingest::config::{EngineConfig, IngestConfig};
use pdf_ingest::engine::{EngineFactory, EngineLoader, PdfBackend, RenderWorker};
use pdf_ingest::ocr::{OcrError, OcrProvider, OcrProviderKind, OcrResult, OcrService};
use pdf_ingest::{ExtractionPipeline, IngestError};

/// Minimal buffer that passes the header check
pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n% in-memory test document\n";

/// One page of a fake document
#[derive(Debug, Clone)]
pub struct FakePage {
    pub text_items: Vec<String>,
    pub render_fails: bool,
}

impl FakePage {
    pub fn text(items: &[&str]) -> Self {
        Self {
            text_items: items.iter().map(|s| s.to_string()).collect(),
            render_fails: false,
        }
    }

    pub fn scanned() -> Self {
        Self::text(&[])
    }

    pub fn broken_render(mut self) -> Self {
        self.render_fails = true;
        self
    }
}

/// A render request seen by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub page_number: usize,
    pub scale: f32,
    pub thread: Option<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    pages: Vec<FakePage>,
    render_delay: Duration,
    pub renders: Mutex<Vec<RenderCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Counts a backend call as in flight until dropped
struct InFlight<'a>(&'a FakeBackend);

impl<'a> InFlight<'a> {
    fn enter(backend: &'a FakeBackend) -> Self {
        let now = backend.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        backend.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(backend)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeBackend {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn render_calls(&self) -> Vec<RenderCall> {
        self.renders.lock().unwrap().clone()
    }

    /// Most backend calls ever observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn page(&self, page_index: usize) -> pdf_ingest::Result<&FakePage> {
        self.pages
            .get(page_index)
            .ok_or_else(|| IngestError::render(page_index + 1, "no such page"))
    }
}

impl PdfBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn page_count(&self, data: &[u8]) -> pdf_ingest::Result<usize> {
        let _call = InFlight::enter(self);
        if data != FAKE_PDF {
            return Err(IngestError::DocumentOpen("unexpected bytes".into()));
        }
        Ok(self.pages.len())
    }

    fn page_text_items(&self, _data: &[u8], page_index: usize) -> pdf_ingest::Result<Vec<String>> {
        let _call = InFlight::enter(self);
        Ok(self.page(page_index)?.text_items.clone())
    }

    fn render_page(&self, _data: &[u8], page_index: usize, scale: f32) -> pdf_ingest::Result<RgbaImage> {
        let _call = InFlight::enter(self);
        let page = self.page(page_index)?;
        let page_number = page_index + 1;

        self.renders.lock().unwrap().push(RenderCall {
            page_number,
            scale,
            thread: std::thread::current().name().map(str::to_string),
        });
        std::thread::sleep(self.render_delay);

        if page.render_fails {
            return Err(IngestError::render(page_number, "canvas context unavailable"));
        }

        let side = scale.round().max(1.0) as u32;
        Ok(RgbaImage::from_pixel(
            side,
            side,
            Rgba([page_number as u8, 255, 255, 255]),
        ))
    }
}

/// Hands out one shared backend and counts loads
pub struct FakeFactory {
    pub backend: Arc<FakeBackend>,
    pub loads: AtomicUsize,
    pub fail_with: Option<String>,
    pub load_delay: Duration,
}

impl FakeFactory {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            backend: Arc::new(backend),
            loads: AtomicUsize::new(0),
            fail_with: None,
            load_delay: Duration::ZERO,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::new(FakeBackend::default())
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl EngineFactory for FakeFactory {
    fn load(&self) -> pdf_ingest::Result<Arc<dyn PdfBackend>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.load_delay);
        match &self.fail_with {
            Some(reason) => Err(IngestError::EngineLoad(reason.clone())),
            None => Ok(self.backend.clone()),
        }
    }

    fn spawn_worker(&self, backend: Arc<dyn PdfBackend>) -> io::Result<RenderWorker> {
        RenderWorker::spawn(backend)
    }
}

/// Recognizes pages from a script keyed by page number
pub struct ScriptedOcr {
    script: HashMap<usize, Result<String, String>>,
    pub calls: Mutex<Vec<(usize, String)>>,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn page(mut self, page_number: usize, text: &str) -> Self {
        self.script.insert(page_number, Ok(text.to_string()));
        self
    }

    pub fn failing_page(mut self, page_number: usize, message: &str) -> Self {
        self.script.insert(page_number, Err(message.to_string()));
        self
    }

    /// (page number, language) per call, in call order
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrProvider for ScriptedOcr {
    fn kind(&self) -> OcrProviderKind {
        OcrProviderKind::Tesseract
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, png: &[u8], language: &str) -> Result<OcrResult, OcrError> {
        let image = image::load_from_memory(png)
            .map_err(|e| OcrError::ProcessingError(e.to_string()))?
            .to_rgba8();
        let page_number = image.get_pixel(0, 0)[0] as usize;

        self.calls
            .lock()
            .unwrap()
            .push((page_number, language.to_string()));

        match self.script.get(&page_number) {
            Some(Ok(text)) => Ok(OcrResult {
                text: format!("  {}\n", text),
                confidence: 90.0,
                provider: OcrProviderKind::Tesseract,
            }),
            Some(Err(message)) => Err(OcrError::ProcessingError(message.clone())),
            None => Ok(OcrResult {
                text: String::new(),
                confidence: 0.0,
                provider: OcrProviderKind::Tesseract,
            }),
        }
    }
}

pub fn loader_for(factory: Arc<FakeFactory>, use_worker: bool) -> Arc<EngineLoader> {
    Arc::new(EngineLoader::new(
        factory,
        EngineConfig {
            use_worker,
            retry_failed_load: false,
        },
    ))
}

/// Pipeline over `pages` with `ocr` as the only OCR provider
pub fn pipeline_with(
    pages: Vec<FakePage>,
    ocr: Option<Arc<ScriptedOcr>>,
) -> (ExtractionPipeline, Arc<FakeFactory>) {
    let factory = Arc::new(FakeFactory::new(FakeBackend::new(pages)));
    let providers: Vec<Arc<dyn OcrProvider>> = match ocr {
        Some(provider) => vec![provider as Arc<dyn OcrProvider>],
        None => Vec::new(),
    };
    let service = Arc::new(OcrService::with_providers(providers, "eng"));
    let pipeline = ExtractionPipeline::new(
        loader_for(factory.clone(), true),
        service,
        IngestConfig::default(),
    );
    (pipeline, factory)
}
