//! Engine backend seam
//!
//! The pipeline never talks to a PDF library directly. Everything goes
//! through [`PdfBackend`], whose methods are synchronous and are only ever
//! called from the engine's dispatch (render worker thread or the blocking
//! pool behind the render lock), one call at a time.

use std::io;
use std::sync::Arc;

use image::RgbaImage;

use super::worker::RenderWorker;
use crate::error::Result;

/// Synchronous access to a PDF library
///
/// Page indices are 0-based here; the public API is 1-based.
pub trait PdfBackend: Send + Sync + 'static {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Parse `data` and return its page count
    fn page_count(&self, data: &[u8]) -> Result<usize>;

    /// Embedded text items of one page, in reading order
    fn page_text_items(&self, data: &[u8], page_index: usize) -> Result<Vec<String>>;

    /// Rasterize one page at `scale` (1.0 = 72 dpi)
    fn render_page(&self, data: &[u8], page_index: usize, scale: f32) -> Result<RgbaImage>;
}

/// Creates the backend when the engine is first requested
pub trait EngineFactory: Send + Sync + 'static {
    /// Load and verify the core engine. Runs on the blocking pool.
    fn load(&self) -> Result<Arc<dyn PdfBackend>>;

    /// Start the dedicated render worker for `backend`
    ///
    /// An error here is not fatal: the engine runs in no-worker mode.
    fn spawn_worker(&self, backend: Arc<dyn PdfBackend>) -> io::Result<RenderWorker> {
        RenderWorker::spawn(backend)
    }
}
