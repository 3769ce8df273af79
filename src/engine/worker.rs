//! Dedicated render worker
//!
//! One OS thread owns all backend calls while the worker is alive. Jobs are
//! queued through a channel of capacity 1, so at most one job runs and at most
//! one more waits; further submitters suspend until the queue drains.
//!
//! ```text
//!  submit() ──► [mpsc, cap 1] ──► pdf-render-worker thread ──► job(backend)
//!     ▲                                                           │
//!     └────────────────────── oneshot result ◄────────────────────┘
//! ```

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::backend::PdfBackend;
use crate::error::{IngestError, Result};

/// Name of the worker thread
pub const WORKER_THREAD_NAME: &str = "pdf-render-worker";

type Job = Box<dyn FnOnce(&dyn PdfBackend) + Send>;

/// Handle to the render worker thread
///
/// The thread exits once every handle is dropped.
#[derive(Clone)]
pub struct RenderWorker {
    sender: mpsc::Sender<Job>,
}

impl RenderWorker {
    /// Spawn the worker thread for `backend`
    pub fn spawn(backend: Arc<dyn PdfBackend>) -> io::Result<Self> {
        let (sender, mut receiver) = mpsc::channel::<Job>(1);

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                tracing::debug!("Render worker started ({})", backend.name());
                while let Some(job) = receiver.blocking_recv() {
                    job(backend.as_ref());
                }
                tracing::debug!("Render worker stopped");
            })?;

        Ok(Self { sender })
    }

    /// Run `job` on the worker thread and wait for its result
    ///
    /// A panicking job is reported as [`IngestError::Worker`]; the worker
    /// keeps serving later jobs.
    pub async fn submit<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&dyn PdfBackend) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, response) = oneshot::channel();

        let job: Job = Box::new(move |backend| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(backend)))
                .unwrap_or_else(|_| Err(IngestError::Worker("render job panicked".to_string())));
            // Receiver gone means the caller was cancelled
            let _ = reply.send(result);
        });

        self.sender
            .send(job)
            .await
            .map_err(|_| IngestError::Worker("render worker has shut down".to_string()))?;

        response
            .await
            .map_err(|_| IngestError::Worker("render worker dropped the job".to_string()))?
    }
}
