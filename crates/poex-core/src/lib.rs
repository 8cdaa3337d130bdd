//! Core library for purchase-order extraction post-processing.
//!
//! This crate provides:
//! - Adaptation of loosely-typed extractor output into canonical models
//! - Multi-page merge reconstruction of logical purchase orders
//! - Retailer/branch identity resolution against a reference catalog
//! - Line-item deduplication and amount reconciliation
//! - Background batch coordination over extraction-dump files

pub mod batch;
pub mod catalog;
pub mod dates;
pub mod error;
pub mod extract;
pub mod matching;
pub mod merge;
pub mod models;
pub mod numbers;
pub mod pipeline;
pub mod store;
pub mod text;

pub use batch::{BatchCoordinator, BatchState, BatchStatus, BatchStore};
pub use catalog::{ReferenceCatalog, ReferenceEntry};
pub use error::{PoexError, Result};
pub use extract::{DumpSource, PageSource};
pub use matching::{IdentityMatcher, MatchOutcome, ResolvedIdentity, ScoreBreakdown, Signal};
pub use merge::{Finalized, Finalizer, MergeGroup, PageMergeEngine, SourceMeta};
pub use models::config::PoexConfig;
pub use models::fragment::{ExtractedFragment, LineItemFragment};
pub use models::po::{LineItem, PODocument};
pub use pipeline::{FileOutcome, PageError, Pipeline};
pub use store::{MemoryStore, PoStore};
