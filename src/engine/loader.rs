//! Lazy, shared engine initialization
//!
//! ```text
//!   Unloaded ──get_engine()──► Loading(shared future) ──ok──► Ready
//!                                      ▲          │
//!                   (retry enabled) ───┘          └──err──► Failed
//! ```
//!
//! The state sits behind a `parking_lot::Mutex` that is only held for the
//! transition itself, never across an await. Callers arriving while a load is
//! in flight clone the same `Shared` future, so the factory runs once no
//! matter how many tasks or threads ask at the same time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;

use super::backend::{EngineFactory, PdfBackend};
use super::mupdf_backend::MupdfFactory;
use super::worker::RenderWorker;
use crate::config::{EngineConfig, IngestConfig};
use crate::error::{IngestError, Result};

type LoadOutcome = std::result::Result<Engine, String>;
type PendingLoad = Shared<BoxFuture<'static, LoadOutcome>>;

static GLOBAL_LOADER: OnceLock<Arc<EngineLoader>> = OnceLock::new();

struct EngineInner {
    backend: Arc<dyn PdfBackend>,
    /// All calls go through this thread when present
    worker: Option<RenderWorker>,
    /// Serializes blocking-pool calls in no-worker mode
    render_lock: Mutex<()>,
}

/// A ready engine. Cheap to clone; every clone shares one backend and one
/// serialization point.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    fn new(backend: Arc<dyn PdfBackend>, worker: Option<RenderWorker>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                backend,
                worker,
                render_lock: Mutex::new(()),
            }),
        }
    }

    /// Whether renders go through the dedicated worker thread
    pub fn worker_available(&self) -> bool {
        self.inner.worker.is_some()
    }

    pub fn backend_name(&self) -> &str {
        self.inner.backend.name()
    }

    /// Run one backend job, serialized with every other job on this engine
    pub(crate) async fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&dyn PdfBackend) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if let Some(worker) = &self.inner.worker {
            return worker.submit(job).await;
        }

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = inner.render_lock.lock();
            job(inner.backend.as_ref())
        })
        .await
        .map_err(|e| IngestError::Worker(format!("Task join error: {}", e)))?
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend_name())
            .field("worker_available", &self.worker_available())
            .finish()
    }
}

/// Engine lifecycle state
pub enum EngineState {
    Unloaded,
    Loading { generation: usize, pending: PendingLoad },
    Ready { engine: Engine, worker_available: bool },
    Failed(String),
}

/// Snapshot of [`EngineState`] for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EngineStatus {
    Unloaded,
    Loading,
    Ready { worker_available: bool },
    Failed { reason: String },
}

/// Lazily creates the engine once and hands out clones of it
pub struct EngineLoader {
    factory: Arc<dyn EngineFactory>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    load_attempts: AtomicUsize,
}

impl EngineLoader {
    pub fn new(factory: Arc<dyn EngineFactory>, config: EngineConfig) -> Self {
        Self {
            factory,
            config,
            state: Mutex::new(EngineState::Unloaded),
            load_attempts: AtomicUsize::new(0),
        }
    }

    /// The process-wide loader (MuPDF, configured from the environment)
    pub fn global() -> Arc<EngineLoader> {
        GLOBAL_LOADER
            .get_or_init(|| {
                let config = IngestConfig::from_env();
                Arc::new(EngineLoader::new(Arc::new(MupdfFactory), config.engine))
            })
            .clone()
    }

    /// Get the engine, loading it on first use
    ///
    /// Concurrent callers during a load all await the same attempt and see
    /// the same outcome.
    pub async fn get_engine(&self) -> Result<Engine> {
        let (generation, pending) = {
            let mut state = self.state.lock();
            match &*state {
                EngineState::Ready { engine, .. } => return Ok(engine.clone()),
                EngineState::Failed(reason) if !self.config.retry_failed_load => {
                    return Err(IngestError::EngineLoad(reason.clone()));
                }
                EngineState::Loading {
                    generation,
                    pending,
                } => (*generation, pending.clone()),
                EngineState::Unloaded | EngineState::Failed(_) => {
                    let generation = self.load_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let pending = self.start_load(generation);
                    *state = EngineState::Loading {
                        generation,
                        pending: pending.clone(),
                    };
                    (generation, pending)
                }
            }
        };

        let outcome = pending.await;
        self.settle(generation, &outcome);
        outcome.map_err(IngestError::EngineLoad)
    }

    /// Current state without triggering a load
    pub fn status(&self) -> EngineStatus {
        match &*self.state.lock() {
            EngineState::Unloaded => EngineStatus::Unloaded,
            EngineState::Loading { .. } => EngineStatus::Loading,
            EngineState::Ready {
                worker_available, ..
            } => EngineStatus::Ready {
                worker_available: *worker_available,
            },
            EngineState::Failed(reason) => EngineStatus::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// Number of load attempts started so far
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    fn start_load(&self, generation: usize) -> PendingLoad {
        let factory = Arc::clone(&self.factory);
        let use_worker = self.config.use_worker;

        async move {
            tracing::info!(generation, "Loading PDF engine");

            let load_factory = Arc::clone(&factory);
            let backend = match tokio::task::spawn_blocking(move || load_factory.load()).await {
                Ok(Ok(backend)) => backend,
                Ok(Err(IngestError::EngineLoad(reason))) => return Err(reason),
                Ok(Err(e)) => return Err(e.to_string()),
                Err(e) => return Err(format!("Task join error: {}", e)),
            };

            let worker = if use_worker {
                match factory.spawn_worker(Arc::clone(&backend)) {
                    Ok(worker) => Some(worker),
                    Err(e) => {
                        tracing::warn!(
                            "Render worker unavailable, falling back to no-worker mode: {}",
                            e
                        );
                        None
                    }
                }
            } else {
                None
            };

            let engine = Engine::new(backend, worker);
            tracing::info!(
                backend = engine.backend_name(),
                worker_available = engine.worker_available(),
                "PDF engine loaded"
            );
            Ok(engine)
        }
        .boxed()
        .shared()
    }

    /// Record the outcome of load `generation`, unless a newer state won
    fn settle(&self, generation: usize, outcome: &LoadOutcome) {
        let mut state = self.state.lock();
        let current = matches!(
            &*state,
            EngineState::Loading { generation: g, .. } if *g == generation
        );
        if !current {
            return;
        }

        *state = match outcome {
            Ok(engine) => EngineState::Ready {
                engine: engine.clone(),
                worker_available: engine.worker_available(),
            },
            Err(reason) => {
                tracing::error!("PDF engine failed to load: {}", reason);
                EngineState::Failed(reason.clone())
            }
        };
    }
}
