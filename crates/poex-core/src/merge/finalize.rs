//! Group finalization: merge accumulator to persisted-shape document.
//!
//! Runs once per merge group, after the engine has declared it complete.
//! Everything fallible about a single document ends here: either a
//! [`PODocument`] or a rejection reason, never a hard error for bad content.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::catalog::ReferenceCatalog;
use crate::dates::parse_date;
use crate::error::Result;
use crate::matching::IdentityMatcher;
use crate::merge::dedupe::dedupe_items;
use crate::merge::engine::MergeGroup;
use crate::merge::reconcile::{reconcile, Reconciliation};
use crate::models::adapt::is_null_sentinel;
use crate::models::config::PoexConfig;
use crate::models::fragment::LineItemFragment;
use crate::models::po::{LineItem, PODocument};
use crate::store::PoStore;

/// Source-file metadata attached to every document finalized from it.
#[derive(Debug, Clone, Default)]
pub struct SourceMeta {
    pub filename: Option<String>,
    pub file_hash: Option<String>,
}

/// Outcome of finalizing one merge group.
#[derive(Debug)]
pub enum Finalized {
    Document(Box<PODocument>),
    /// Not a persistable purchase order. Batch mode drops these silently;
    /// single-document mode surfaces the reason.
    Rejected { reason: String },
}

/// Turns completed merge groups into enriched documents.
pub struct Finalizer<'a> {
    catalog: &'a ReferenceCatalog,
    config: &'a PoexConfig,
    store: &'a dyn PoStore,
}

impl<'a> Finalizer<'a> {
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

    /// Finalize one group: dedupe, enrich against the catalog, validate,
    /// check for duplicates, reconcile amounts.
    pub fn finalize(&self, group: MergeGroup, meta: &SourceMeta) -> Result<Finalized> {
        if let Some(reason) = rejection_reason(&group) {
            debug!(key = %group.key, reason = %reason, "rejecting merge group");
            return Ok(Finalized::Rejected { reason });
        }

        let page_span = group.last_page - group.first_page + 1;
        let items = dedupe_items(group.items);

        let matcher = IdentityMatcher::new(self.catalog, &self.config.matching);
        let outcome = matcher.resolve(
            group.retailer.as_deref().unwrap_or_default(),
            group.delivery_address.as_deref().unwrap_or_default(),
            group.branch_name.as_deref().unwrap_or_default(),
        );

        let mut document = PODocument {
            retailer_name: group.retailer.clone(),
            retailer_name_standardized: group.retailer,
            branch_name: group.branch_name,
            branch_code: group.branch_code,
            delivery_address: group.delivery_address,
            buyer_name: group.buyer_name,
            po_number: group.po_number.as_deref().and_then(clean_po_number),
            po_date: group.po_date.as_deref().and_then(parse_date),
            delivery_date: group.delivery_date.as_deref().and_then(parse_date),
            expiry_date: group.expiry_date.as_deref().and_then(parse_date),
            currency: group
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.config.enrichment.default_currency.clone()),
            total_amount: group.total_amount.unwrap_or(Decimal::ZERO),
            tax_id: group.tax_id.as_deref().and_then(clean_tax_id),
            reliability_score: outcome.score,
            items: items.iter().cloned().map(finalize_item).collect(),
            source_filename: meta.filename.clone(),
            file_hash: meta.file_hash.clone(),
            ..Default::default()
        };

        // On a match the catalog is the source of truth: its standardized
        // fields replace the extracted ones wherever the catalog has them.
        if let Some(resolved) = outcome.resolved {
            document.retailer_name = Some(resolved.retailer_name.clone());
            document.retailer_name_standardized = Some(resolved.retailer_name);
            document.debtor_code = resolved.debtor_code;
            if resolved.branch_code.is_some() {
                document.branch_code = resolved.branch_code;
            }
            if resolved.branch_label.is_some() {
                document.branch_name = resolved.branch_label;
            }
            if resolved.delivery_address.is_some() {
                document.delivery_address = resolved.delivery_address;
            }
        }

        if let Some(po_number) = document.po_number.as_deref() {
            if self.store.exists_by_po_number(po_number)? {
                document.already_exists = true;
                document.duplicate_message =
                    Some(format!("PO {po_number} has already been processed"));
            }
        }

        if let Reconciliation::Flagged { reason, .. } =
            reconcile(document.total_amount, &items, self.config.reconcile.tolerance)
        {
            document.is_flagged = true;
            document.flag_reason = Some(reason);
        }

        info!(
            po_number = document.po_number.as_deref().unwrap_or("<none>"),
            retailer = document
                .retailer_name_standardized
                .as_deref()
                .unwrap_or("<unmatched>"),
            score = document.reliability_score,
            items = document.items.len(),
            pages = page_span,
            flagged = document.is_flagged,
            "finalized document"
        );
        Ok(Finalized::Document(Box::new(document)))
    }
}

/// Document types that are never purchase orders.
const NON_PO_TYPES: &[&str] = &["invoice", "receipt", "packing"];

fn rejection_reason(group: &MergeGroup) -> Option<String> {
    if let Some(doc_type) = group.document_type.as_deref() {
        let lower = doc_type.to_lowercase();
        if NON_PO_TYPES.iter().any(|t| lower.contains(t)) {
            return Some(format!("document type is \"{doc_type}\", not a purchase order"));
        }
    }
    if group
        .retailer
        .as_deref()
        .map(|r| r.trim().is_empty())
        .unwrap_or(true)
    {
        return Some("no retailer name extracted".to_string());
    }
    if group.items.is_empty() {
        return Some("no line items extracted".to_string());
    }
    None
}

/// Clean a raw PO number: the extractor misreads the "NO." label as part
/// of the value ("ONO12345") and zero-pads identifiers.
fn clean_po_number(raw: &str) -> Option<String> {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("ONO") {
        s = rest;
    }
    let cleaned = s.trim_start_matches(['O', '0']).trim().to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Blank-ish and all-zero tax ids carry no information.
fn clean_tax_id(raw: &str) -> Option<String> {
    let s = raw.trim();
    if is_null_sentinel(s) {
        return None;
    }
    let digits: String = s.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if digits.is_empty() || digits.chars().all(|c| c == '0') {
        return None;
    }
    Some(s.to_string())
}

fn finalize_item(item: LineItemFragment) -> LineItem {
    LineItem {
        article_code: item.article_code,
        barcode: item.barcode,
        description: item.description,
        quantity: item.quantity,
        uom: item.uom.map(|u| u.trim().to_lowercase()),
        unit_price: item.unit_price,
        line_total: item.line_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::engine::PageMergeEngine;
    use crate::models::fragment::ExtractedFragment;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const CSV: &str = "\
debtor_code,retailers_name,retailers_group_name,branch,branch_code,delivery_address
300-M001,MYDIN TRI SHAAS SDN BHD,MYDIN,MYDIN MALL SEREMBAN 2,1044,JALAN HARUAN SEREMBAN
";

    fn group_from(fragment: ExtractedFragment) -> MergeGroup {
        let mut engine = PageMergeEngine::new();
        engine.push(fragment);
        engine.finish().remove(0)
    }

    fn mydin_fragment() -> ExtractedFragment {
        ExtractedFragment {
            document_type: Some("Purchase Order".to_string()),
            retailer: Some("MYDIN".to_string()),
            po_number: Some("OO012345".to_string()),
            po_date: Some("15.03.2024".to_string()),
            delivery_address: Some("JALAN HARUAN, SEREMBAN".to_string()),
            total_amount: Some(Decimal::from_str("25.00").unwrap()),
            tax_id: Some("000-000".to_string()),
            items: vec![LineItemFragment {
                article_code: Some("A1".to_string()),
                uom: Some("CTN".to_string()),
                line_total: Some(Decimal::from_str("25.00").unwrap()),
                ..Default::default()
            }],
            page_index: 0,
            ..Default::default()
        }
    }

    fn finalize_one(fragment: ExtractedFragment, store: &MemoryStore) -> Finalized {
        let catalog = ReferenceCatalog::from_reader(CSV.as_bytes()).unwrap();
        let config = PoexConfig::default();
        let finalizer = Finalizer::new(&catalog, &config, store);
        finalizer
            .finalize(group_from(fragment), &SourceMeta::default())
            .unwrap()
    }

    #[test]
    fn test_full_enrichment() {
        let store = MemoryStore::new();
        let Finalized::Document(doc) = finalize_one(mydin_fragment(), &store) else {
            panic!("expected document");
        };

        assert_eq!(doc.po_number.as_deref(), Some("12345"));
        assert_eq!(
            doc.retailer_name_standardized.as_deref(),
            Some("MYDIN TRI SHAAS SDN BHD")
        );
        assert_eq!(doc.debtor_code.as_deref(), Some("300-M001"));
        assert_eq!(doc.branch_code.as_deref(), Some("1044"));
        assert_eq!(
            doc.po_date,
            Some(chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert_eq!(doc.currency, "MYR");
        assert_eq!(doc.tax_id, None);
        assert_eq!(doc.items[0].uom.as_deref(), Some("ctn"));
        assert!(doc.reliability_score > 0);
        assert!(!doc.is_flagged);
    }

    #[test]
    fn test_invoice_rejected() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.document_type = Some("Tax Invoice".to_string());
        let Finalized::Rejected { reason } = finalize_one(fragment, &store) else {
            panic!("expected rejection");
        };
        assert!(reason.contains("Tax Invoice"));
    }

    #[test]
    fn test_missing_retailer_rejected() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.retailer = None;
        assert!(matches!(
            finalize_one(fragment, &store),
            Finalized::Rejected { .. }
        ));
    }

    #[test]
    fn test_no_items_rejected() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.items.clear();
        assert!(matches!(
            finalize_one(fragment, &store),
            Finalized::Rejected { .. }
        ));
    }

    #[test]
    fn test_duplicate_po_detected() {
        use crate::store::PoStore;
        let store = MemoryStore::new();
        store
            .save(&PODocument {
                po_number: Some("12345".to_string()),
                ..Default::default()
            })
            .unwrap();

        let Finalized::Document(doc) = finalize_one(mydin_fragment(), &store) else {
            panic!("expected document");
        };
        assert!(doc.already_exists);
        assert!(doc.duplicate_message.unwrap().contains("12345"));
    }

    #[test]
    fn test_amount_mismatch_flagged_not_rejected() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.total_amount = Some(Decimal::from_str("98.99").unwrap());
        fragment.items[0].line_total = Some(Decimal::from_str("100.00").unwrap());

        let Finalized::Document(doc) = finalize_one(fragment, &store) else {
            panic!("expected document");
        };
        assert!(doc.is_flagged);
        assert!(doc.flag_reason.unwrap().contains("1.01"));
    }

    #[test]
    fn test_missing_declared_total_not_flagged() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.total_amount = None;
        fragment.items = vec![
            LineItemFragment {
                article_code: Some("A1".to_string()),
                line_total: Some(Decimal::from_str("60.00").unwrap()),
                ..Default::default()
            },
            LineItemFragment {
                article_code: Some("A2".to_string()),
                line_total: Some(Decimal::from_str("40.00").unwrap()),
                ..Default::default()
            },
        ];

        let Finalized::Document(doc) = finalize_one(fragment, &store) else {
            panic!("expected document");
        };
        assert!(!doc.is_flagged, "falsely flagged: {:?}", doc.flag_reason);
        assert_eq!(doc.flag_reason, None);
    }

    #[test]
    fn test_match_replaces_extracted_identity_fields() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.branch_name = Some("MYDN MALL SRBN".to_string());
        fragment.branch_code = Some("XX99".to_string());
        fragment.delivery_address = Some("JLN HARUAN, SEREMBAN 70300".to_string());

        let Finalized::Document(doc) = finalize_one(fragment, &store) else {
            panic!("expected document");
        };
        assert_eq!(doc.retailer_name.as_deref(), Some("MYDIN TRI SHAAS SDN BHD"));
        assert_eq!(
            doc.retailer_name_standardized.as_deref(),
            Some("MYDIN TRI SHAAS SDN BHD")
        );
        assert_eq!(doc.branch_name.as_deref(), Some("MYDIN MALL SEREMBAN 2"));
        assert_eq!(doc.branch_code.as_deref(), Some("1044"));
        assert_eq!(
            doc.delivery_address.as_deref(),
            Some("JALAN HARUAN SEREMBAN")
        );
    }

    #[test]
    fn test_unmatched_retailer_keeps_extracted_values() {
        let store = MemoryStore::new();
        let mut fragment = mydin_fragment();
        fragment.retailer = Some("ACME WHOLESALE".to_string());
        fragment.delivery_address = Some("NOWHERE STREET".to_string());

        let Finalized::Document(doc) = finalize_one(fragment, &store) else {
            panic!("expected document");
        };
        assert_eq!(
            doc.retailer_name_standardized.as_deref(),
            Some("ACME WHOLESALE")
        );
        assert_eq!(doc.debtor_code, None);
        assert_eq!(doc.reliability_score, 0);
    }

    #[test]
    fn test_clean_po_number() {
        assert_eq!(clean_po_number("ONO12345").as_deref(), Some("12345"));
        assert_eq!(clean_po_number("0007788").as_deref(), Some("7788"));
        assert_eq!(clean_po_number("OO12345").as_deref(), Some("12345"));
        assert_eq!(clean_po_number("PO-99").as_deref(), Some("PO-99"));
        assert_eq!(clean_po_number("000"), None);
    }

    #[test]
    fn test_clean_tax_id() {
        assert_eq!(clean_tax_id("000-000"), None);
        assert_eq!(clean_tax_id("N/A"), None);
        assert_eq!(clean_tax_id(""), None);
        assert_eq!(clean_tax_id("W10-1808-32000010").as_deref(), Some("W10-1808-32000010"));
    }
}
