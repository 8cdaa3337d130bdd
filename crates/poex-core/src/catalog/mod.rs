//! Reference catalog of known retailers and branches.
//!
//! Loaded once at startup from CSV and rebuilt only on explicit reload.
//! Entries are normalized on load so matching never re-normalizes catalog
//! data on the hot path.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::CatalogError;
use crate::text::normalize;

/// One retailer/branch row of the master list. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub retailer_group: Option<String>,
    pub retailer_name: String,
    pub branch_label: Option<String>,
    pub branch_code: Option<String>,
    pub debtor_code: Option<String>,
    pub delivery_address: Option<String>,

    /// Precomputed normalized forms used by the matcher.
    pub normalized_name: String,
    pub normalized_branch: String,
    pub normalized_group: String,
}

/// Raw CSV row shape; cleaned into [`ReferenceEntry`] on load.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    debtor_code: Option<String>,
    #[serde(default)]
    retailers_name: Option<String>,
    #[serde(default)]
    retailers_group_name: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    branch_code: Option<String>,
    #[serde(default)]
    delivery_address: Option<String>,
}

/// The master list of known retailers/branches.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceCatalog {
    /// Load the catalog from a CSV file.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        let catalog = Self::from_reader(file)?;
        info!(
            entries = catalog.len(),
            path = %path.display(),
            "loaded reference catalog"
        );
        Ok(catalog)
    }

    /// Load the catalog from any CSV reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers.iter().any(|h| h == "retailers_name") {
            return Err(CatalogError::MissingColumn("retailers_name".to_string()));
        }

        let mut entries = Vec::new();
        for row in csv_reader.deserialize::<RawRow>() {
            let row = row?;
            let Some(name) = clean_field(row.retailers_name) else {
                continue;
            };

            let branch_label = clean_field(row.branch);
            let group = clean_field(row.retailers_group_name);

            entries.push(ReferenceEntry {
                normalized_name: normalize(&name),
                normalized_branch: branch_label.as_deref().map(normalize).unwrap_or_default(),
                normalized_group: group.as_deref().map(normalize).unwrap_or_default(),
                retailer_group: group,
                retailer_name: name,
                branch_label,
                branch_code: clean_branch_code(row.branch_code),
                debtor_code: clean_field(row.debtor_code),
                delivery_address: clean_field(row.delivery_address),
            });
        }

        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { entries })
    }

    /// Rebuild the whole catalog from the given path.
    pub fn reload(&mut self, path: &Path) -> Result<(), CatalogError> {
        *self = Self::from_path(path)?;
        Ok(())
    }

    /// Entries in file order. Matching relies on this order being stable
    /// for deterministic tie-breaking.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Blank-ish cell values become `None`.
fn clean_field(value: Option<String>) -> Option<String> {
    let s = value?.trim().to_string();
    match s.to_lowercase().as_str() {
        "" | "nan" | "none" | "null" => None,
        _ => Some(s),
    }
}

/// Branch codes exported through a spreadsheet pick up a float ".0"
/// artifact; strip it.
fn clean_branch_code(value: Option<String>) -> Option<String> {
    let s = clean_field(value)?;
    Some(s.strip_suffix(".0").unwrap_or(&s).to_string())
}
