//! Background batch coordination.
//!
//! One background worker per source file; pages stay strictly sequential
//! inside a file because merge decisions depend on the previous page. All
//! observable state lives in a [`BatchState`] snapshot that pollers read
//! while the worker runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{error, info};

use crate::catalog::ReferenceCatalog;
use crate::error::{BatchError, Result};
use crate::extract::DumpSource;
use crate::models::config::PoexConfig;
use crate::models::po::PODocument;
use crate::pipeline::{PageError, Pipeline};
use crate::store::PoStore;

/// Lifecycle of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    #[serde(rename = "complete")]
    Done,
    Error,
}

/// Page progress inside the file.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchProgress {
    pub current_page: usize,
    pub total_pages: usize,
}

/// Poller-visible state of one batch. Documents appear incrementally as
/// they finalize; a whole-file failure keeps what was already emitted.
#[derive(Debug, Clone, Serialize)]
pub struct BatchState {
    pub status: BatchStatus,
    pub progress: BatchProgress,
    pub pos: Vec<PODocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub page_errors: Vec<PageError>,
}

impl Default for BatchState {
    fn default() -> Self {
        Self {
            status: BatchStatus::Pending,
            progress: BatchProgress::default(),
            pos: Vec::new(),
            error: None,
            page_errors: Vec::new(),
        }
    }
}

/// Writer-side handle to one batch's state. Every mutation happens under
/// the lock, so pollers never observe a half-applied update.
#[derive(Clone)]
pub struct BatchHandle {
    state: Arc<Mutex<BatchState>>,
}

impl BatchHandle {
    fn update(&self, f: impl FnOnce(&mut BatchState)) {
        // A panic between updates leaves the last complete snapshot in
        // place, so a poisoned lock is still safe to recover and mutate.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }
}

/// Process-wide registry of batch id to state.
#[derive(Default)]
pub struct BatchStore {
    batches: Mutex<HashMap<String, Arc<Mutex<BatchState>>>>,
}

impl BatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, id: &str) -> Result<BatchHandle> {
        let state = Arc::new(Mutex::new(BatchState::default()));
        self.batches
            .lock()
            .map_err(|_| BatchError::WorkerFailed("batch registry lock poisoned".to_string()))?
            .insert(id.to_string(), Arc::clone(&state));
        Ok(BatchHandle { state })
    }

    /// Snapshot of one batch's current state.
    pub fn get(&self, id: &str) -> Result<BatchState> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| BatchError::WorkerFailed("batch registry lock poisoned".to_string()))?;
        let state = batches
            .get(id)
            .ok_or_else(|| BatchError::UnknownBatch(id.to_string()))?;
        let snapshot = state.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(snapshot)
    }

    /// Ids of all known batches, unordered.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self
            .batches
            .lock()
            .map_err(|_| BatchError::WorkerFailed("batch registry lock poisoned".to_string()))?
            .keys()
            .cloned()
            .collect())
    }
}

/// Spawns and tracks background file-processing workers.
pub struct BatchCoordinator {
    catalog: Arc<ReferenceCatalog>,
    config: Arc<PoexConfig>,
    store: Arc<dyn PoStore>,
    batches: Arc<BatchStore>,
    seq: AtomicU64,
}

impl BatchCoordinator {
    pub fn new(
        catalog: Arc<ReferenceCatalog>,
        config: Arc<PoexConfig>,
        store: Arc<dyn PoStore>,
    ) -> Self {
        Self {
            catalog,
            config,
            store,
            batches: Arc::new(BatchStore::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn batches(&self) -> &BatchStore {
        &self.batches
    }

    /// Snapshot of one batch's current state.
    pub fn status(&self, id: &str) -> Result<BatchState> {
        self.batches.get(id)
    }

    /// Start processing one extraction-dump file in the background.
    /// Returns immediately with the new batch id.
    pub fn spawn(&self, path: PathBuf) -> Result<String> {
        let id = format!("batch-{:06}", self.seq.fetch_add(1, Ordering::Relaxed) + 1);
        let handle = self.batches.create(&id)?;

        let catalog = Arc::clone(&self.catalog);
        let config = Arc::clone(&self.config);
        let store = Arc::clone(&self.store);
        let batch_id = id.clone();

        tokio::task::spawn_blocking(move || {
            handle.update(|s| s.status = BatchStatus::Processing);
            info!(batch = %batch_id, path = %path.display(), "batch started");

            let result = run_file(&path, &catalog, &config, store.as_ref(), &handle);
            match result {
                Ok(()) => {
                    handle.update(|s| s.status = BatchStatus::Done);
                    info!(batch = %batch_id, "batch done");
                }
                Err(e) => {
                    error!(batch = %batch_id, error = %e, "batch failed");
                    handle.update(|s| {
                        s.status = BatchStatus::Error;
                        s.error = Some(e.to_string());
                    });
                }
            }
        });

        Ok(id)
    }
}

fn run_file(
    path: &std::path::Path,
    catalog: &ReferenceCatalog,
    config: &PoexConfig,
    store: &dyn PoStore,
    handle: &BatchHandle,
) -> Result<()> {
    let source = DumpSource::from_path(path)?;
    let pipeline = Pipeline::new(catalog, config, store);

    let outcome = pipeline.process_file(
        &source,
        |current_page, total_pages| {
            handle.update(|s| {
                s.progress = BatchProgress {
                    current_page,
                    total_pages,
                };
            });
        },
        |document| {
            let document = document.clone();
            handle.update(|s| s.pos.push(document));
        },
    )?;

    handle.update(|s| s.page_errors = outcome.page_errors);
    Ok(())
}
