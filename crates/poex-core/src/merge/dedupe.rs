//! Line-item deduplication.
//!
//! Page-boundary overlap makes the extractor re-emit the last rows of a
//! page at the top of the next one. Items repeat a barcode or article code
//! in that case, so identity-keyed first-wins removal is enough; items
//! with neither key are kept unconditionally.

use std::collections::HashSet;

use tracing::debug;

use crate::models::fragment::LineItemFragment;

/// Remove repeated items, keeping the first occurrence per identity key
/// and preserving order. Idempotent.
pub fn dedupe_items(items: Vec<LineItemFragment>) -> Vec<LineItemFragment> {
    let before = items.len();
    let mut seen: HashSet<String> = HashSet::new();
    let deduped: Vec<LineItemFragment> = items
        .into_iter()
        .filter(|item| match item.identity_key() {
            Some(key) => seen.insert(key.to_string()),
            None => true,
        })
        .collect();

    if deduped.len() < before {
        debug!(before, after = deduped.len(), "removed duplicate line items");
    }
    deduped
}
