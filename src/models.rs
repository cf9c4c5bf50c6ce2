// ==============================================================================
// models.rs - MAF Record Data Models
// ==============================================================================
// Description: Normalized mutation record shape shared by all MAF dialects
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Column holding the tumor sample barcode (index and filter column)
pub const SAMPLE_BARCODE_COLUMN: &str = "tumor_sample_barcode";

/// Column holding the chromosome name
pub const CHROMOSOME_COLUMN: &str = "chromosome";

/// Synthetic column with the 1-based physical line number in the source file
pub const LINE_NUMBER_COLUMN: &str = "raw_file_line_number";

/// Synthetic archive column with the cancer type parsed from the file name
pub const CANCER_TYPE_COLUMN: &str = "cancer_type";

/// Synthetic archive column with the calling algorithm parsed from the file name
pub const CALLER_COLUMN: &str = "caller";

/// Columns used to match a variant across the two pipelines
pub const LOCUS_KEY_COLUMNS: [&str; 6] = [
    "tumor_sample_barcode",
    "chromosome",
    "start_position",
    "end_position",
    "reference_allele",
    "tumor_seq_allele2",
];

/// Provenance of an archive (GDC) MAF, parsed from its file name
///
/// GDC names its files `TCGA.<cancer type>.<caller>.<uuid>.somatic.maf.gz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSource {
    /// Cancer type (e.g., "BRCA")
    pub cancer_type: String,
    /// Variant calling algorithm (e.g., "mutect")
    pub caller: String,
}

/// Source dialect of a MAF file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Generic MAF: lower-cased header, no synthetic columns
    Plain,
    /// MC3 consortium MAF (one file per cohort)
    Consortium,
    /// GDC archive MAF (one file per cancer type and caller)
    Archive(ArchiveSource),
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Plain => "plain",
            Dialect::Consortium => "consortium",
            Dialect::Archive(_) => "archive",
        }
    }
}

/// Ordered, duplicate-free list of normalized column names
///
/// Shared between all records produced by one reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnSet {
    /// Build a column set, returning the first duplicated name on failure
    pub fn new(names: Vec<String>) -> Result<Self, String> {
        let mut positions = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(name.clone());
            }
        }
        Ok(Self { names, positions })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }
}

/// One normalized MAF row
///
/// Values are kept as strings; typing happens at the schema layer.
/// Invariant: `values.len() == columns.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct MafRecord {
    columns: Arc<ColumnSet>,
    values: Vec<String>,
    line_number: usize,
}

impl MafRecord {
    pub(crate) fn new(columns: Arc<ColumnSet>, values: Vec<String>, line_number: usize) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self {
            columns,
            values,
            line_number,
        }
    }

    /// Value of a column by normalized name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .position(column)
            .map(|idx| self.values[idx].as_str())
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 1-based line number of this record in its source file
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Iterate over (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn sample_barcode(&self) -> Option<&str> {
        self.get(SAMPLE_BARCODE_COLUMN)
    }
}

/// Overlap classification of a reconciled variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapClass {
    /// Reported by both GDC and MC3
    Shared,
    /// Reported by GDC only
    ArchiveOnly,
    /// Reported by MC3 only
    ConsortiumOnly,
}

impl OverlapClass {
    /// Indicator column set to 1 for rows of this class in the overlap table
    pub fn indicator_column(&self) -> &'static str {
        match self {
            OverlapClass::Shared => "shared_by_gdc_mc3",
            OverlapClass::ArchiveOnly => "only_in_gdc",
            OverlapClass::ConsortiumOnly => "only_in_mc3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Arc<ColumnSet> {
        Arc::new(ColumnSet::new(names.iter().map(|n| n.to_string()).collect()).unwrap())
    }

    #[test]
    fn test_column_set_rejects_duplicates() {
        let result = ColumnSet::new(vec!["strand".to_string(), "a".to_string(), "strand".to_string()]);
        assert_eq!(result.unwrap_err(), "strand");
    }

    #[test]
    fn test_record_lookup_by_name() {
        let record = MafRecord::new(
            columns(&["chromosome", "tumor_sample_barcode"]),
            vec!["chr1".to_string(), "TCGA-01".to_string()],
            4,
        );

        assert_eq!(record.get("chromosome"), Some("chr1"));
        assert_eq!(record.sample_barcode(), Some("TCGA-01"));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.line_number(), 4);

        let pairs: Vec<_> = record.iter().collect();
        assert_eq!(pairs, vec![("chromosome", "chr1"), ("tumor_sample_barcode", "TCGA-01")]);
    }

    #[test]
    fn test_overlap_class_indicator_columns() {
        assert_eq!(OverlapClass::Shared.indicator_column(), "shared_by_gdc_mc3");
        assert_eq!(OverlapClass::ArchiveOnly.indicator_column(), "only_in_gdc");
        assert_eq!(OverlapClass::ConsortiumOnly.indicator_column(), "only_in_mc3");
    }

    #[test]
    fn test_dialect_serde() {
        let json = serde_json::to_string(&Dialect::Consortium).unwrap();
        assert_eq!(json, "\"consortium\"");
        assert_eq!(Dialect::Plain.as_str(), "plain");
    }
}
