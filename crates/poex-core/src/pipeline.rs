//! Per-file processing pipeline.
//!
//! Drives one [`PageSource`] through adaptation, the merge engine, and
//! finalization, page by page in order. Page-level failures are recorded
//! and skipped; only source-level failures abort the file.

use tracing::{debug, warn};

use crate::catalog::ReferenceCatalog;
use crate::error::Result;
use crate::extract::PageSource;
use crate::merge::{Finalized, Finalizer, MergeGroup, PageMergeEngine, SourceMeta};
use crate::models::adapt::adapt_candidate;
use crate::models::config::PoexConfig;
use crate::models::po::PODocument;
use crate::store::PoStore;

/// A page that failed extraction; the rest of the file continues.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PageError {
    pub page: usize,
    pub message: String,
}

/// Everything one source file produced.
#[derive(Debug, Default)]
pub struct FileOutcome {
    /// Finalized documents in completion order, already persisted.
    pub documents: Vec<PODocument>,
    /// Rejection reasons for groups that were not purchase orders.
    pub rejected: Vec<String>,
    /// Pages that failed extraction.
    pub page_errors: Vec<PageError>,
    /// A file with this content hash was processed before.
    pub duplicate_file: bool,
}

/// One-file processor. Cheap to construct, borrows all collaborators.
pub struct Pipeline<'a> {
    catalog: &'a ReferenceCatalog,
    config: &'a PoexConfig,
    store: &'a dyn PoStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        catalog: &'a ReferenceCatalog,
        config: &'a PoexConfig,
        store: &'a dyn PoStore,
    ) -> Self {
        Self {
            catalog,
            config,
            store,
        }
    }

    /// Process every page of the source in order. `on_page` is invoked
    /// after each page with (pages_done, total_pages); `on_document` with
    /// every document the moment it is finalized, so observers see partial
    /// results even if a later page aborts the file.
    pub fn process_file(
        &self,
        source: &dyn PageSource,
        mut on_page: impl FnMut(usize, usize),
        mut on_document: impl FnMut(&PODocument),
    ) -> Result<FileOutcome> {
        let meta = source.meta();
        let mut outcome = FileOutcome::default();

        if let Some(hash) = meta.file_hash.as_deref() {
            if self.store.exists_by_hash(hash)? {
                warn!(hash, "file hash seen before, documents will re-check duplicates");
                outcome.duplicate_file = true;
            }
        }

        let finalizer = Finalizer::new(self.catalog, self.config, self.store);
        let mut engine = PageMergeEngine::new();
        let total_pages = source.total_pages();

        for page in 0..total_pages {
            match source.candidates(page) {
                Ok(candidates) => {
                    debug!(page, candidates = candidates.len(), "processing page");
                    for candidate in &candidates {
                        let Some(fragment) = adapt_candidate(candidate, page) else {
                            continue;
                        };
                        for group in engine.push(fragment) {
                            self.emit(&finalizer, group, &meta, &mut outcome, &mut on_document)?;
                        }
                    }
                }
                Err(e) => {
                    warn!(page, error = %e, "page failed, continuing with next");
                    outcome.page_errors.push(PageError {
                        page,
                        message: e.to_string(),
                    });
                }
            }
            on_page(page + 1, total_pages);
        }

        for group in engine.finish() {
            self.emit(&finalizer, group, &meta, &mut outcome, &mut on_document)?;
        }

        Ok(outcome)
    }

    fn emit(
        &self,
        finalizer: &Finalizer<'_>,
        group: MergeGroup,
        meta: &SourceMeta,
        outcome: &mut FileOutcome,
        on_document: &mut dyn FnMut(&PODocument),
    ) -> Result<()> {
        match finalizer.finalize(group, meta)? {
            Finalized::Document(document) => {
                self.store.save(&document)?;
                on_document(&document);
                outcome.documents.push(*document);
            }
            Finalized::Rejected { reason } => outcome.rejected.push(reason),
        }
        Ok(())
    }
}
