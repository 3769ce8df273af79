//! PDF engine
//!
//! The engine is created once and shared by every pipeline invocation.
//!
//! # Thread Safety
//!
//! MuPDF's context is **NOT thread-safe**. This module addresses this via:
//!
//! 1. **EngineLoader**: one mutex-guarded load, shared by all waiters
//! 2. **RenderWorker**: one dedicated thread runs every backend call
//! 3. **Render lock**: without a worker, blocking-pool calls take one lock
//! 4. **Fresh documents**: each backend call opens and drops its own document
//!
//! # Usage
//!
//! ```rust,ignore
//! use pdf_ingest::engine::EngineLoader;
//!
//! let loader = EngineLoader::global();
//! let engine = loader.get_engine().await?;
//! assert!(engine.worker_available() || !config.engine.use_worker);
//! ```

mod backend;
mod loader;
mod mupdf_backend;
mod worker;

pub use backend::{EngineFactory, PdfBackend};
pub use loader::{Engine, EngineLoader, EngineState, EngineStatus};
pub use mupdf_backend::{MupdfBackend, MupdfFactory};
pub use worker::{RenderWorker, WORKER_THREAD_NAME};

#[cfg(test)]
pub(crate) use mupdf_backend::build_pdf;
