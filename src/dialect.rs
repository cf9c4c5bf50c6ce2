// ==============================================================================
// dialect.rs - MAF Dialect Rules
// ==============================================================================
// Description: Column normalization and per-line enrichment for the plain,
//              MC3 consortium and GDC archive MAF dialects
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// MC3 carries both `Strand` and `STRAND` (VEP) columns; lower-casing alone
// would collide, so the VEP one becomes `strand_vep`.
// ==============================================================================

use std::path::Path;

use crate::models::{
    ArchiveSource, ColumnSet, Dialect, CALLER_COLUMN, CANCER_TYPE_COLUMN, CHROMOSOME_COLUMN,
    LINE_NUMBER_COLUMN,
};

/// Raw consortium column renamed to avoid the `strand` collision
const VEP_STRAND_RAW: &str = "STRAND";
const VEP_STRAND_RENAMED: &str = "strand_vep";

/// Prefix added to consortium chromosome names (`1` -> `chr1`)
pub const CHROMOSOME_PREFIX: &str = "chr";

impl Dialect {
    /// Number of synthetic columns appended after the raw header
    pub fn synthetic_column_count(&self) -> usize {
        match self {
            Dialect::Plain => 0,
            Dialect::Consortium => 1,
            Dialect::Archive(_) => 3,
        }
    }

    /// Columns stored as INTEGER in the relational schema
    pub fn integer_columns(&self) -> &'static [&'static str] {
        match self {
            Dialect::Plain => &["start_position", "end_position"],
            Dialect::Consortium => &[
                "start_position",
                "end_position",
                "strand_vep",
                "raw_file_line_number",
            ],
            Dialect::Archive(_) => &["start_position", "end_position", "raw_file_line_number"],
        }
    }
}

impl ArchiveSource {
    /// Parse cancer type and caller from a GDC file name
    ///
    /// The name is split on `.`; token 2 is the cancer type and token 3 the
    /// caller. Returns `None` when fewer than three tokens exist.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let mut tokens = file_name.split('.');
        let _project = tokens.next()?;
        let cancer_type = tokens.next()?;
        let caller = tokens.next()?;

        Some(Self {
            cancer_type: cancer_type.to_string(),
            caller: caller.to_string(),
        })
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        Self::from_file_name(file_name)
    }
}

/// Normalize a raw header into the dialect's column list
///
/// Synthetic columns are appended in the same order `enrich_values` fills them.
pub fn normalize_columns(dialect: &Dialect, raw_columns: &[String]) -> Vec<String> {
    let mut columns = Vec::with_capacity(raw_columns.len() + dialect.synthetic_column_count());

    match dialect {
        Dialect::Plain => {
            columns.extend(raw_columns.iter().map(|c| c.to_lowercase()));
        }
        Dialect::Consortium => {
            for column in raw_columns {
                if column == VEP_STRAND_RAW {
                    columns.push(VEP_STRAND_RENAMED.to_string());
                } else {
                    columns.push(column.to_lowercase());
                }
            }
            columns.push(LINE_NUMBER_COLUMN.to_string());
        }
        Dialect::Archive(_) => {
            columns.extend(raw_columns.iter().map(|c| c.to_lowercase()));
            columns.push(CANCER_TYPE_COLUMN.to_string());
            columns.push(CALLER_COLUMN.to_string());
            columns.push(LINE_NUMBER_COLUMN.to_string());
        }
    }

    columns
}

/// Complete the raw values of one data line into a full record row
///
/// `values` holds exactly the raw header's token count on entry and the
/// normalized column count on return.
pub fn enrich_values(
    dialect: &Dialect,
    columns: &ColumnSet,
    values: &mut Vec<String>,
    line_number: usize,
) {
    match dialect {
        Dialect::Plain => {}
        Dialect::Consortium => {
            if let Some(idx) = columns.position(CHROMOSOME_COLUMN) {
                values[idx].insert_str(0, CHROMOSOME_PREFIX);
            }
            values.push(line_number.to_string());
        }
        Dialect::Archive(source) => {
            values.push(source.cancer_type.clone());
            values.push(source.caller.clone());
            values.push(line_number.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn archive() -> Dialect {
        Dialect::Archive(ArchiveSource {
            cancer_type: "BRCA".to_string(),
            caller: "mutect".to_string(),
        })
    }

    #[test]
    fn test_plain_lowercases_only() {
        let columns = normalize_columns(&Dialect::Plain, &raw(&["Hugo_Symbol", "Chromosome"]));
        assert_eq!(columns, vec!["hugo_symbol", "chromosome"]);
    }

    #[test]
    fn test_consortium_renames_vep_strand() {
        let header = raw(&["Hugo_Symbol", "Chromosome", "Strand", "STRAND"]);
        let columns = normalize_columns(&Dialect::Consortium, &header);

        assert_eq!(
            columns,
            vec!["hugo_symbol", "chromosome", "strand", "strand_vep", "raw_file_line_number"]
        );
        assert!(ColumnSet::new(columns).is_ok());
    }

    #[test]
    fn test_archive_appends_provenance_columns() {
        let header = raw(&["Hugo_Symbol", "Tumor_Sample_Barcode"]);
        let columns = normalize_columns(&archive(), &header);

        assert_eq!(
            columns,
            vec!["hugo_symbol", "tumor_sample_barcode", "cancer_type", "caller", "raw_file_line_number"]
        );
    }

    #[test]
    fn test_column_count_matches_synthetic_count() {
        let header = raw(&["A", "B", "C", "D", "E"]);
        for dialect in [Dialect::Plain, Dialect::Consortium, archive()] {
            let columns = normalize_columns(&dialect, &header);
            assert_eq!(columns.len(), header.len() + dialect.synthetic_column_count());
        }
    }

    #[test]
    fn test_consortium_enrichment_prefixes_chromosome() {
        let columns = ColumnSet::new(raw(&["chromosome", "start_position", "raw_file_line_number"])).unwrap();
        let mut values = raw(&["1", "100"]);

        enrich_values(&Dialect::Consortium, &columns, &mut values, 7);

        assert_eq!(values, raw(&["chr1", "100", "7"]));
    }

    #[test]
    fn test_archive_enrichment_appends_provenance() {
        let columns = ColumnSet::new(raw(&["chromosome", "cancer_type", "caller", "raw_file_line_number"])).unwrap();
        let mut values = raw(&["chr1"]);

        enrich_values(&archive(), &columns, &mut values, 12);

        assert_eq!(values, raw(&["chr1", "BRCA", "mutect", "12"]));
    }

    #[test]
    fn test_archive_source_from_file_name() {
        let source = ArchiveSource::from_file_name("x.BRCA.mutect.maf.gz").unwrap();
        assert_eq!(source.cancer_type, "BRCA");
        assert_eq!(source.caller, "mutect");

        let source = ArchiveSource::from_path(Path::new(
            "/gdc/dir/TCGA.LUAD.varscan.6c961926.somatic.maf.gz",
        ))
        .unwrap();
        assert_eq!(source.cancer_type, "LUAD");
        assert_eq!(source.caller, "varscan");
    }

    #[test]
    fn test_archive_source_needs_three_tokens() {
        assert!(ArchiveSource::from_file_name("TCGA.BRCA").is_none());
        assert!(ArchiveSource::from_file_name("variants").is_none());
    }
}
