//! Asset ingestion pipeline
//!
//! `ingest` resolves a path to a loader and runs the decode on a background
//! runtime. Results come back over a channel and are only applied when the
//! scene owner drains them, so the scene graph is never touched off-thread.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use lab_asset::{LoadError, LoadResult, LoaderRegistry};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::LoadingConfig;

/// Pipeline construction errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to create loader runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Monotonic id of one ingestion; later drops get larger tickets
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub(crate) u64);

impl LoadTicket {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What `ingest` did with a path
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No loader claims the extension; nothing was started
    Unsupported,
    /// A load was started
    Queued(LoadTicket),
}

/// A finished load
#[derive(Debug)]
pub struct Completion {
    pub ticket: LoadTicket,
    pub path: PathBuf,
    /// Name of the loader that ran
    pub loader: &'static str,
    pub result: LoadResult,
}

/// Message from the pipeline to the scene owner
#[derive(Debug)]
pub enum IngestReport {
    Unsupported(PathBuf),
    Completed(Completion),
}

/// Runs loaders off the frame loop
pub struct AssetIngestor {
    registry: LoaderRegistry,
    runtime: Option<tokio::runtime::Runtime>,
    permits: Arc<Semaphore>,
    last_ticket: AtomicU64,
    /// Tickets issued whose report has not been drained yet
    in_flight: Mutex<BTreeSet<LoadTicket>>,
    tx: Sender<IngestReport>,
    rx: Receiver<IngestReport>,
}

impl AssetIngestor {
    pub fn new(registry: LoaderRegistry, config: &LoadingConfig) -> Result<Self, IngestError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("lab-loader")
            .enable_all()
            .build()?;

        let (tx, rx) = unbounded();

        log::info!(
            "AssetIngestor: {} loaders, {} concurrent load(s)",
            registry.len(),
            config.max_concurrent_loads
        );

        Ok(Self {
            registry,
            runtime: Some(runtime),
            permits: Arc::new(Semaphore::new(config.max_concurrent_loads.max(1))),
            last_ticket: AtomicU64::new(0),
            in_flight: Mutex::new(BTreeSet::new()),
            tx,
            rx,
        })
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    /// Extension check only, no I/O
    pub fn is_loadable(&self, path: &Path) -> bool {
        self.registry.is_supported(path)
    }

    /// Start loading `path`. Returns immediately.
    pub fn ingest(&self, path: impl AsRef<Path>) -> IngestOutcome {
        let path = path.as_ref().to_path_buf();

        let (Some(loader), Some(runtime)) =
            (self.registry.find_loader(&path), self.runtime.as_ref())
        else {
            log::info!("AssetIngestor: no loader for {}", path.display());
            let _ = self.tx.send(IngestReport::Unsupported(path));
            return IngestOutcome::Unsupported;
        };

        let ticket = {
            let mut in_flight = self.in_flight.lock();
            let ticket = LoadTicket(self.last_ticket.fetch_add(1, Ordering::SeqCst) + 1);
            in_flight.insert(ticket);
            ticket
        };
        log::debug!("AssetIngestor: {} queued {} with {}", ticket, path.display(), loader.name());

        let permits = Arc::clone(&self.permits);
        let tx = self.tx.clone();

        runtime.spawn(async move {
            // The semaphore is never closed; a failed acquire just runs unthrottled
            let _permit = permits.acquire_owned().await.ok();
            let started = Instant::now();

            let name = loader.name();
            let blocking_path = path.clone();
            let result = tokio::task::spawn_blocking(move || loader.load_asset(&blocking_path))
                .await
                .unwrap_or_else(|e| {
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        "load task cancelled".to_string()
                    };
                    Err(LoadError::Panicked(message))
                });

            log::debug!(
                "AssetIngestor: {} finished in {:.1} ms",
                ticket,
                started.elapsed().as_secs_f64() * 1000.0
            );

            let _ = tx.send(IngestReport::Completed(Completion {
                ticket,
                path,
                loader: name,
                result,
            }));
        });

        IngestOutcome::Queued(ticket)
    }

    /// Take every report that has arrived, in arrival order
    pub fn drain_reports(&self) -> Vec<IngestReport> {
        let reports: Vec<IngestReport> = self.rx.try_iter().collect();
        let mut in_flight = self.in_flight.lock();
        for report in &reports {
            if let IngestReport::Completed(done) = report {
                in_flight.remove(&done.ticket);
            }
        }
        reports
    }

    /// Loads started but not yet drained
    pub fn pending(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Newest ticket still decoding or waiting to be drained
    pub fn newest_pending(&self) -> Option<LoadTicket> {
        self.in_flight.lock().last().copied()
    }

    /// Most recently issued ticket
    pub fn latest_ticket(&self) -> Option<LoadTicket> {
        match self.last_ticket.load(Ordering::SeqCst) {
            0 => None,
            n => Some(LoadTicket(n)),
        }
    }
}

impl Drop for AssetIngestor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Never wait on a stuck decode
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for AssetIngestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetIngestor")
            .field("registry", &self.registry)
            .field("pending", &self.pending())
            .field("latest_ticket", &self.latest_ticket())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
