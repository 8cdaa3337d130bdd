//! Multi-page merge state machine.
//!
//! PO extraction is inherently page-fragmented: continuation pages of the
//! same order repeat no identifier, while a genuinely new order always
//! introduces one. "A new key appears" is therefore the completion signal
//! for whatever was open, which lets documents stream out before the whole
//! file has been processed.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::adapt::is_null_sentinel;
use crate::models::fragment::{ExtractedFragment, LineItemFragment};
use crate::text::normalize;

/// Derived identifier deciding whether two fragments describe the same
/// logical PO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeKey {
    po_part: String,
    retailer_part: String,
}

impl MergeKey {
    fn new(po_part: &str, retailer: Option<&str>) -> Self {
        Self {
            po_part: po_part.trim().to_string(),
            retailer_part: retailer.map(normalize).unwrap_or_default(),
        }
    }
}

impl std::fmt::Display for MergeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.retailer_part.is_empty() {
            write!(f, "{}", self.po_part)
        } else {
            write!(f, "{}|{}", self.po_part, self.retailer_part)
        }
    }
}

/// Mutable accumulator for one in-progress logical PO.
#[derive(Debug, Clone)]
pub struct MergeGroup {
    pub key: MergeKey,
    pub document_type: Option<String>,
    pub retailer: Option<String>,
    pub po_number: Option<String>,
    pub branch_name: Option<String>,
    pub branch_code: Option<String>,
    pub delivery_address: Option<String>,
    pub buyer_name: Option<String>,
    pub po_date: Option<String>,
    pub delivery_date: Option<String>,
    pub expiry_date: Option<String>,
    pub currency: Option<String>,
    pub tax_id: Option<String>,
    pub total_amount: Option<Decimal>,
    pub items: Vec<LineItemFragment>,
    pub first_page: usize,
    pub last_page: usize,
}

impl MergeGroup {
    fn open(key: MergeKey, fragment: ExtractedFragment) -> Self {
        Self {
            key,
            document_type: fragment.document_type,
            retailer: fragment.retailer,
            po_number: fragment.po_number,
            branch_name: fragment.branch_name,
            branch_code: fragment.branch_code,
            delivery_address: fragment.delivery_address,
            buyer_name: fragment.buyer_name,
            po_date: fragment.po_date,
            delivery_date: fragment.delivery_date,
            expiry_date: fragment.expiry_date,
            currency: fragment.currency,
            tax_id: fragment.tax_id,
            total_amount: fragment.total_amount,
            items: fragment.items,
            first_page: fragment.page_index,
            last_page: fragment.page_index,
        }
    }

    /// Merge a later fragment into the accumulator: items are appended;
    /// total_amount is replaced only by a strictly larger value (partial
    /// pages carry running subtotals lower than the final cumulative
    /// total); every other scalar keeps its first non-empty value.
    fn merge(&mut self, fragment: ExtractedFragment) {
        self.items.extend(fragment.items);
        self.last_page = fragment.page_index;

        if let Some(new_total) = fragment.total_amount {
            match self.total_amount {
                Some(current) if new_total <= current => {}
                _ => self.total_amount = Some(new_total),
            }
        }

        fill(&mut self.document_type, fragment.document_type);
        fill(&mut self.retailer, fragment.retailer);
        fill(&mut self.po_number, fragment.po_number);
        fill(&mut self.branch_name, fragment.branch_name);
        fill(&mut self.branch_code, fragment.branch_code);
        fill(&mut self.delivery_address, fragment.delivery_address);
        fill(&mut self.buyer_name, fragment.buyer_name);
        fill(&mut self.po_date, fragment.po_date);
        fill(&mut self.delivery_date, fragment.delivery_date);
        fill(&mut self.expiry_date, fragment.expiry_date);
        fill(&mut self.currency, fragment.currency);
        fill(&mut self.tax_id, fragment.tax_id);
    }

    fn retailer_matches(&self, fragment: &ExtractedFragment) -> bool {
        let frag_retailer = fragment.retailer.as_deref().unwrap_or("");
        let own_retailer = self.retailer.as_deref().unwrap_or("");
        frag_retailer.is_empty()
            || own_retailer.is_empty()
            || normalize(frag_retailer) == normalize(own_retailer)
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.as_deref().map(str::is_empty).unwrap_or(true) {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            *slot = Some(v);
        }
    }
}

/// Converts an ordered stream of per-page fragments into merge groups,
/// emitting each group as soon as it is known complete.
///
/// Pages must be pushed in increasing page order; merge decisions on page
/// N depend on the state left by page N-1. One engine per file, never
/// shared.
#[derive(Debug, Default)]
pub struct PageMergeEngine {
    open: Vec<MergeGroup>,
    placeholder_seq: usize,
}

impl PageMergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment; returns any groups that became complete.
    pub fn push(&mut self, fragment: ExtractedFragment) -> Vec<MergeGroup> {
        match effective_po_number(&fragment) {
            Some(po) => {
                let key = MergeKey::new(&po, fragment.retailer.as_deref());
                self.open_or_merge(key, fragment)
            }
            None => self.attach_continuation(fragment),
        }
    }

    /// End of the page stream: everything still open is complete.
    pub fn finish(&mut self) -> Vec<MergeGroup> {
        std::mem::take(&mut self.open)
    }

    fn open_or_merge(&mut self, key: MergeKey, fragment: ExtractedFragment) -> Vec<MergeGroup> {
        if let Some(group) = self.open.iter_mut().find(|g| g.key == key) {
            debug!(key = %key, page = fragment.page_index, "merging fragment into open group");
            group.merge(fragment);
            return Vec::new();
        }

        // A new key is evidence every currently open group is complete.
        let finalized = std::mem::take(&mut self.open);
        debug!(
            key = %key,
            page = fragment.page_index,
            closed = finalized.len(),
            "opening new group"
        );
        self.open.push(MergeGroup::open(key, fragment));
        finalized
    }

    /// A fragment with no PO number continues the most recently started
    /// open group of the same (or unspecified) retailer. Without one, a
    /// placeholder key starts a fresh group.
    fn attach_continuation(&mut self, fragment: ExtractedFragment) -> Vec<MergeGroup> {
        if let Some(group) = self
            .open
            .iter_mut()
            .rev()
            .find(|g| g.retailer_matches(&fragment))
        {
            debug!(
                key = %group.key,
                page = fragment.page_index,
                "attaching continuation page"
            );
            group.merge(fragment);
            return Vec::new();
        }

        self.placeholder_seq += 1;
        let key = MergeKey::new(
            &format!("NO_PO_{}", self.placeholder_seq),
            fragment.retailer.as_deref(),
        );
        self.open_or_merge(key, fragment)
    }
}

/// The PO number as merge-key material: `None` for absent values and for
/// the extractor's null sentinels.
fn effective_po_number(fragment: &ExtractedFragment) -> Option<String> {
    let po = fragment.po_number.as_deref()?;
    if is_null_sentinel(po) {
        None
    } else {
        Some(po.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frag(po: Option<&str>, retailer: Option<&str>, item_count: usize, page: usize) -> ExtractedFragment {
        ExtractedFragment {
            po_number: po.map(str::to_string),
            retailer: retailer.map(str::to_string),
            items: (0..item_count)
                .map(|i| LineItemFragment {
                    article_code: Some(format!("P{page}-{i}")),
                    ..Default::default()
                })
                .collect(),
            page_index: page,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_key_merges_item_union() {
        let mut engine = PageMergeEngine::new();
        assert!(engine.push(frag(Some("12345"), Some("MYDIN"), 3, 0)).is_empty());
        assert!(engine.push(frag(Some("12345"), Some("MYDIN"), 2, 1)).is_empty());

        let groups = engine.finish();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 5);
    }

    #[test]
    fn test_continuation_attaches_to_open_group() {
        let mut engine = PageMergeEngine::new();
        engine.push(frag(Some("12345"), Some("MYDIN"), 3, 0));
        let emitted = engine.push(frag(None, Some("MYDIN"), 2, 1));
        assert!(emitted.is_empty());

        let groups = engine.finish();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 5);
    }

    #[test]
    fn test_continuation_with_empty_retailer_attaches() {
        let mut engine = PageMergeEngine::new();
        engine.push(frag(Some("A1"), Some("MYDIN"), 1, 0));
        assert!(engine.push(frag(None, None, 4, 1)).is_empty());

        let groups = engine.finish();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 5);
    }

    #[test]
    fn test_new_key_finalizes_previous_group() {
        let mut engine = PageMergeEngine::new();
        engine.push(frag(Some("A1"), Some("MYDIN"), 2, 0));
        let emitted = engine.push(frag(Some("A2"), Some("MYDIN"), 1, 1));
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].po_number.as_deref(), Some("A1"));
        assert_eq!(emitted[0].items.len(), 2);

        let rest = engine.finish();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].po_number.as_deref(), Some("A2"));
    }

    #[test]
    fn test_non_adjacent_duplicate_po_not_remerged() {
        // Documented behavior: a PO number reappearing after an
        // intervening different PO starts a second document.
        let mut engine = PageMergeEngine::new();
        engine.push(frag(Some("A1"), Some("X"), 1, 0));
        let first = engine.push(frag(Some("A2"), Some("X"), 1, 1));
        assert_eq!(first.len(), 1);
        let second = engine.push(frag(Some("A1"), Some("X"), 1, 2));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].po_number.as_deref(), Some("A2"));

        let rest = engine.finish();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].po_number.as_deref(), Some("A1"));
        assert_eq!(rest[0].items.len(), 1);
    }

    #[test]
    fn test_null_sentinel_po_treated_as_continuation() {
        let mut engine = PageMergeEngine::new();
        engine.push(frag(Some("A1"), Some("X"), 1, 0));
        let mut cont = frag(Some("null"), Some("X"), 2, 1);
        cont.po_number = Some("null".to_string());
        assert!(engine.push(cont).is_empty());

        let groups = engine.finish();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 3);
    }

    #[test]
    fn test_orphan_continuation_gets_placeholder_key() {
        let mut engine = PageMergeEngine::new();
        let emitted = engine.push(frag(None, Some("PELANGI"), 2, 0));
        assert!(emitted.is_empty());

        let groups = engine.finish();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].key.to_string().starts_with("NO_PO_1"));
        assert_eq!(groups[0].po_number, None);
    }

    #[test]
    fn test_continuation_different_retailer_does_not_attach() {
        let mut engine = PageMergeEngine::new();
        engine.push(frag(Some("A1"), Some("MYDIN"), 1, 0));
        let emitted = engine.push(frag(None, Some("GIANT"), 1, 1));
        // New placeholder key closes the MYDIN group.
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].po_number.as_deref(), Some("A1"));
    }

    #[test]
    fn test_larger_total_wins() {
        use std::str::FromStr;
        let mut engine = PageMergeEngine::new();

        let mut first = frag(Some("12345"), Some("MYDIN"), 3, 0);
        first.total_amount = Some(Decimal::from_str("50.00").unwrap());
        engine.push(first);

        let mut cont = frag(None, Some("MYDIN"), 2, 1);
        cont.total_amount = Some(Decimal::from_str("120.00").unwrap());
        engine.push(cont);

        let groups = engine.finish();
        assert_eq!(
            groups[0].total_amount,
            Some(Decimal::from_str("120.00").unwrap())
        );
    }

    #[test]
    fn test_smaller_total_ignored() {
        use std::str::FromStr;
        let mut engine = PageMergeEngine::new();

        let mut first = frag(Some("12345"), Some("MYDIN"), 1, 0);
        first.total_amount = Some(Decimal::from_str("120.00").unwrap());
        engine.push(first);

        let mut cont = frag(Some("12345"), Some("MYDIN"), 1, 1);
        cont.total_amount = Some(Decimal::from_str("50.00").unwrap());
        engine.push(cont);

        let groups = engine.finish();
        assert_eq!(
            groups[0].total_amount,
            Some(Decimal::from_str("120.00").unwrap())
        );
    }

    #[test]
    fn test_scalars_first_non_empty_wins() {
        let mut engine = PageMergeEngine::new();

        let mut first = frag(Some("A1"), Some("X"), 1, 0);
        first.buyer_name = Some("ACME SDN BHD".to_string());
        engine.push(first);

        let mut second = frag(Some("A1"), Some("X"), 1, 1);
        second.buyer_name = Some("DIFFERENT BUYER".to_string());
        second.branch_name = Some("BRANCH B".to_string());
        engine.push(second);

        let groups = engine.finish();
        assert_eq!(groups[0].buyer_name.as_deref(), Some("ACME SDN BHD"));
        assert_eq!(groups[0].branch_name.as_deref(), Some("BRANCH B"));
    }
}
