//! Error types for the poex-core library.

use thiserror::Error;

/// Main error type for the poex library.
#[derive(Error, Debug)]
pub enum PoexError {
    /// Reference catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Extraction boundary error.
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Batch processing error.
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// Persistence boundary error.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to loading the reference catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read or parse the catalog CSV.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] csv::Error),

    /// A required column is missing from the catalog.
    #[error("catalog is missing column: {0}")]
    MissingColumn(String),

    /// The catalog contains no usable entries.
    #[error("catalog is empty")]
    Empty,

    /// Failed to open the catalog file.
    #[error("failed to open catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors crossing the extraction boundary.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The extractor output could not be parsed.
    #[error("unparsable extractor output: {0}")]
    Malformed(String),

    /// A page index outside the source was requested.
    #[error("invalid page index: {0}")]
    InvalidPage(usize),

    /// Failed to read the extraction source.
    #[error("failed to read extraction source: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to batch coordination.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The requested batch id is unknown.
    #[error("unknown batch: {0}")]
    UnknownBatch(String),

    /// The background worker panicked or was lost.
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}

/// Result type for the poex library.
pub type Result<T> = std::result::Result<T, PoexError>;
