//! Persistence boundary.
//!
//! The pipeline needs three capabilities from storage: duplicate checks,
//! appending finalized documents, and recent-history reads. Anything with
//! those capabilities can back it; the in-memory implementation here serves
//! tests and the CLI.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::info;

use crate::error::{PoexError, Result};
use crate::models::po::PODocument;

/// Storage capabilities required by finalization and the CLI.
pub trait PoStore: Send + Sync {
    /// Whether a source file with this content hash was already processed.
    fn exists_by_hash(&self, file_hash: &str) -> Result<bool>;

    /// Whether a document with this PO number is already persisted.
    fn exists_by_po_number(&self, po_number: &str) -> Result<bool>;

    /// Persist one finalized document.
    fn save(&self, document: &PODocument) -> Result<()>;

    /// Most recently saved documents, newest first.
    fn fetch_recent(&self, limit: usize) -> Result<Vec<PODocument>>;
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    documents: Vec<PODocument>,
    file_hashes: HashSet<String>,
}

/// In-memory [`PoStore`]. Contents live for the process only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, MemoryStoreInner>> {
        self.inner
            .lock()
            .map_err(|_| PoexError::Store("store lock poisoned".to_string()))
    }
}

impl PoStore for MemoryStore {
    fn exists_by_hash(&self, file_hash: &str) -> Result<bool> {
        Ok(self.locked()?.file_hashes.contains(file_hash))
    }

    fn exists_by_po_number(&self, po_number: &str) -> Result<bool> {
        Ok(self
            .locked()?
            .documents
            .iter()
            .any(|d| d.po_number.as_deref() == Some(po_number)))
    }

    fn save(&self, document: &PODocument) -> Result<()> {
        let mut inner = self.locked()?;
        if let Some(hash) = document.file_hash.as_deref() {
            inner.file_hashes.insert(hash.to_string());
        }
        inner.documents.push(document.clone());
        info!(
            po_number = document.po_number.as_deref().unwrap_or("<none>"),
            items = document.items.len(),
            "saved document"
        );
        Ok(())
    }

    fn fetch_recent(&self, limit: usize) -> Result<Vec<PODocument>> {
        let inner = self.locked()?;
        Ok(inner.documents.iter().rev().take(limit).cloned().collect())
    }
}
