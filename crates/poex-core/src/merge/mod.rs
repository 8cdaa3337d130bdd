//! Multi-page document reconstruction.
//!
//! [`engine`] rebuilds logical POs from page fragments, [`dedupe`] removes
//! page-overlap item repeats, [`reconcile`] cross-checks totals, and
//! [`finalize`] turns a completed group into a persisted-shape document.

mod dedupe;
mod engine;
mod finalize;
mod reconcile;

pub use dedupe::dedupe_items;
pub use engine::{MergeGroup, MergeKey, PageMergeEngine};
pub use finalize::{Finalized, Finalizer, SourceMeta};
pub use reconcile::{reconcile, Reconciliation};
