//! Extraction boundary.
//!
//! The extraction model is an external collaborator; the pipeline only
//! needs page-ordered candidate lists from it. [`DumpSource`] reads the
//! dump files the extraction service writes, one JSON document per source
//! file.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::ExtractError;
use crate::merge::SourceMeta;

/// Page-ordered access to extraction candidates for one source file.
pub trait PageSource {
    /// Number of pages in the source.
    fn total_pages(&self) -> usize;

    /// Candidate documents extracted from one page, in extractor order.
    /// A page may legitimately yield zero candidates (blank page, terms
    /// and conditions page).
    fn candidates(&self, page: usize) -> Result<Vec<Value>, ExtractError>;

    /// Metadata identifying the source file.
    fn meta(&self) -> SourceMeta;
}

#[derive(Debug, Deserialize)]
struct Dump {
    #[serde(default)]
    source_filename: Option<String>,
    #[serde(default)]
    file_hash: Option<String>,
    pages: Vec<Vec<Value>>,
}

/// [`PageSource`] over an extraction dump file:
/// `{ "source_filename": ..., "file_hash": ..., "pages": [[candidate, ...], ...] }`.
#[derive(Debug)]
pub struct DumpSource {
    dump: Dump,
}

impl DumpSource {
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let content = std::fs::read_to_string(path)?;
        let source = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            pages = source.total_pages(),
            "loaded extraction dump"
        );
        Ok(source)
    }

    pub fn from_json(content: &str) -> Result<Self, ExtractError> {
        let dump: Dump =
            serde_json::from_str(content).map_err(|e| ExtractError::Malformed(e.to_string()))?;
        Ok(Self { dump })
    }
}

impl PageSource for DumpSource {
    fn total_pages(&self) -> usize {
        self.dump.pages.len()
    }

    fn candidates(&self, page: usize) -> Result<Vec<Value>, ExtractError> {
        self.dump
            .pages
            .get(page)
            .cloned()
            .ok_or(ExtractError::InvalidPage(page))
    }

    fn meta(&self) -> SourceMeta {
        SourceMeta {
            filename: self.dump.source_filename.clone(),
            file_hash: self.dump.file_hash.clone(),
        }
    }
}
