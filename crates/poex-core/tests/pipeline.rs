//! End-to-end pipeline tests over extraction dumps.

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;

use poex_core::{DumpSource, MemoryStore, PoexConfig, Pipeline, ReferenceCatalog};

const CATALOG_CSV: &str = "\
debtor_code,retailers_name,retailers_group_name,branch,branch_code,delivery_address
300-M001,MYDIN TRI SHAAS SDN BHD,MYDIN,MYDIN MALL PUTRAJAYA,1021,PRESINT 15 PUTRAJAYA WILAYAH PERSEKUTUAN
300-M002,MYDIN TRI SHAAS SDN BHD,MYDIN,MYDIN MALL SEREMBAN 2,1044.0,JALAN HARUAN SEREMBAN NEGERI SEMBILAN
300-C001,CS GROCER SDN BHD,CS GROCER,CS GROCER (KAJANG MEWAH) (KM),77,JALAN KAJANG MEWAH SELANGOR
";

fn run(dump: serde_json::Value) -> Vec<poex_core::PODocument> {
    let catalog = ReferenceCatalog::from_reader(CATALOG_CSV.as_bytes()).unwrap();
    let config = PoexConfig::default();
    let store = MemoryStore::new();
    let source = DumpSource::from_json(&dump.to_string()).unwrap();
    Pipeline::new(&catalog, &config, &store)
        .process_file(&source, |_, _| {}, |_| {})
        .unwrap()
        .documents
}

/// A two-page MYDIN order: page two carries no PO number, extra items, and
/// the true cumulative total.
#[test]
fn test_two_page_order_reconstructed() {
    let documents = run(json!({
        "source_filename": "mydin_po.pdf",
        "pages": [
            [{
                "document_type": "Purchase Order",
                "retailer": "MYDIN",
                "po_number": "12345",
                "po_date": "15.03.2024",
                "delivery_address": "JALAN HARUAN, SEREMBAN",
                "total_amount": "50.00",
                "items": [
                    {"article_code": "A1", "qty": 2, "total_price": "20.00"},
                    {"article_code": "A2", "qty": 1, "total_price": "15.00"},
                    {"article_code": "A3", "qty": 1, "total_price": "15.00"}
                ]
            }],
            [{
                "retailer": "MYDIN",
                "total_amount": "MYR 120.00",
                "items": [
                    {"article_code": "A4", "qty": 4, "total_price": "40.00"},
                    {"article_code": "A5", "qty": 3, "total_price": "30.00"}
                ]
            }]
        ]
    }));

    assert_eq!(documents.len(), 1);
    let doc = &documents[0];
    assert_eq!(doc.po_number.as_deref(), Some("12345"));
    assert_eq!(doc.items.len(), 5);
    // The continuation page's larger cumulative total wins.
    assert_eq!(doc.total_amount, Decimal::from_str("120.00").unwrap());
    assert_eq!(
        doc.retailer_name_standardized.as_deref(),
        Some("MYDIN TRI SHAAS SDN BHD")
    );
    assert_eq!(doc.debtor_code.as_deref(), Some("300-M002"));
    assert_eq!(doc.branch_code.as_deref(), Some("1044"));
    assert_eq!(doc.currency, "MYR");
    assert_eq!(doc.source_filename.as_deref(), Some("mydin_po.pdf"));
    // 120.00 declared vs 120.00 item sum: consistent.
    assert!(!doc.is_flagged);
}

/// The same PO number reappearing after a different order starts a second
/// document; non-adjacent pages of one PO are not re-merged.
#[test]
fn test_non_adjacent_duplicate_po_yields_two_documents() {
    fn page(po: &str, code: &str) -> serde_json::Value {
        json!([{
            "document_type": "Purchase Order",
            "retailer": "CS GROCER",
            "po_number": po,
            "items": [{"article_code": code}]
        }])
    }

    let documents = run(json!({
        "pages": [page("A1", "X1"), page("A2", "Y1"), page("A1", "X2")]
    }));

    assert_eq!(documents.len(), 3);
    let a1_docs: Vec<_> = documents
        .iter()
        .filter(|d| d.po_number.as_deref() == Some("A1"))
        .collect();
    assert_eq!(a1_docs.len(), 2);
    assert_eq!(a1_docs[0].items.len(), 1);
    assert_eq!(a1_docs[1].items.len(), 1);
    // The second A1 document is reported as a duplicate of the first.
    assert!(a1_docs[1].already_exists);
}

#[test]
fn test_reconciliation_tolerance_boundary() {
    fn dump_with_total(total: &str) -> serde_json::Value {
        json!({
            "pages": [[{
                "document_type": "Purchase Order",
                "retailer": "MYDIN",
                "po_number": "77",
                "total_amount": total,
                "items": [
                    {"article_code": "A1", "total_price": "60.00"},
                    {"article_code": "A2", "total_price": "40.00"}
                ]
            }]]
        })
    }

    // Difference 0.99 is within the 1.00 tolerance.
    let ok = run(dump_with_total("100.99"));
    assert!(!ok[0].is_flagged);

    // Difference 1.01 is flagged, with the gap in the reason.
    let flagged = run(dump_with_total("98.99"));
    assert!(flagged[0].is_flagged);
    assert!(flagged[0].flag_reason.as_deref().unwrap().contains("1.01"));
}

/// Duplicate items straddling the page boundary are collapsed; items
/// without barcode or article code survive.
#[test]
fn test_page_overlap_items_deduplicated() {
    let documents = run(json!({
        "pages": [
            [{
                "document_type": "Purchase Order",
                "retailer": "MYDIN",
                "po_number": "55",
                "items": [
                    {"barcode": "955001", "qty": 2},
                    {"description": "loose item"}
                ]
            }],
            [{
                "retailer": "MYDIN",
                "items": [
                    {"barcode": "955001", "qty": 2},
                    {"barcode": "955002", "qty": 1},
                    {"description": "loose item"}
                ]
            }]
        ]
    }));

    assert_eq!(documents.len(), 1);
    // 955001 collapses; both keyless "loose item" rows are kept.
    assert_eq!(documents[0].items.len(), 4);
}

#[test]
fn test_unknown_retailer_document_kept_without_enrichment() {
    let documents = run(json!({
        "pages": [[{
            "document_type": "Purchase Order",
            "retailer": "TOTALLY UNKNOWN TRADING",
            "po_number": "9",
            "items": [{"article_code": "Z"}]
        }]]
    }));

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].reliability_score, 0);
    assert_eq!(documents[0].debtor_code, None);
    assert_eq!(
        documents[0].retailer_name_standardized.as_deref(),
        Some("TOTALLY UNKNOWN TRADING")
    );
}

#[test]
fn test_catalog_branch_code_artifact_stripped() {
    let documents = run(json!({
        "pages": [[{
            "document_type": "Purchase Order",
            "retailer": "MYDIN",
            "po_number": "42",
            "delivery_address": "JALAN HARUAN SEREMBAN",
            "items": [{"article_code": "A"}]
        }]]
    }));

    // Matched against the SEREMBAN row whose CSV branch code is "1044.0".
    assert_eq!(documents[0].branch_code.as_deref(), Some("1044"));
}
