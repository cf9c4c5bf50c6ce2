// ==============================================================================
// overlap.rs - GDC/MC3 Overlap Reconciliation
// ==============================================================================
// Description: Builds the full_overlap table classifying each variant as
//              shared, GDC-only or MC3-only
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Full outer join from two left joins:
//   1. GDC LEFT JOIN MC3            -> every GDC row (shared or GDC-only)
//   2. MC3 LEFT JOIN GDC, GDC rowid NULL -> MC3-only rows
//   3. UNION ALL of 1 and 2
// Without the NULL restriction in step 2, shared rows would appear twice.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

use crate::models::{OverlapClass, CANCER_TYPE_COLUMN, LOCUS_KEY_COLUMNS, SAMPLE_BARCODE_COLUMN};
use crate::schema::quote_ident;
use crate::store::{SqlValue, Store, StoreError};

/// Alias of the GDC table inside the overlap query
const ARCHIVE_ALIAS: &str = "g";
/// Alias of the MC3 table inside the overlap query
const CONSORTIUM_ALIAS: &str = "m";

const ARCHIVE_ROWID: &str = "gdc_rowid";
const CONSORTIUM_ROWID: &str = "mc3_rowid";

#[derive(Error, Debug)]
pub enum OverlapError {
    #[error("Invalid overlap definition: {0}")]
    InvalidSpec(String),

    #[error("Failed to build overlap table: {0}")]
    Store(#[from] StoreError),
}

/// Which input table a reported column comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Archive,
    Consortium,
}

impl Side {
    fn alias(&self) -> &'static str {
        match self {
            Side::Archive => ARCHIVE_ALIAS,
            Side::Consortium => CONSORTIUM_ALIAS,
        }
    }
}

/// A non-key column copied into the overlap table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportField {
    pub side: Side,
    pub column: String,
    pub alias: String,
    /// Placeholder value reported as NULL (e.g. "." for a missing exon)
    pub null_if: Option<String>,
}

impl ReportField {
    pub fn archive(column: &str, alias: &str) -> Self {
        Self {
            side: Side::Archive,
            column: column.to_string(),
            alias: alias.to_string(),
            null_if: None,
        }
    }

    pub fn consortium(column: &str, alias: &str) -> Self {
        Self {
            side: Side::Consortium,
            column: column.to_string(),
            alias: alias.to_string(),
            null_if: None,
        }
    }

    pub fn null_if(mut self, placeholder: &str) -> Self {
        self.null_if = Some(placeholder.to_string());
        self
    }

    fn select_expr(&self) -> String {
        let column = format!("{}.{}", self.side.alias(), quote_ident(&self.column));
        match &self.null_if {
            None => format!("{} AS {}", column, quote_ident(&self.alias)),
            Some(placeholder) => format!(
                "(CASE WHEN {col} = '{ph}' THEN NULL ELSE {col} END) AS {alias}",
                col = column,
                ph = placeholder.replace('\'', "''"),
                alias = quote_ident(&self.alias)
            ),
        }
    }
}

/// Reported columns of the GDC/MC3 comparison
pub fn default_report_fields() -> Vec<ReportField> {
    let mut fields = vec![
        ReportField::archive("tumor_seq_allele1", "gdc_tumor_seq_allele1"),
        ReportField::consortium("tumor_seq_allele1", "mc3_tumor_seq_allele1"),
        ReportField::archive("hgvsp", "gdc_hgvsp"),
        ReportField::consortium("hgvsp", "mc3_hgvsp"),
        ReportField::archive("hgvsc", "gdc_hgvsc"),
        ReportField::consortium("hgvsc", "mc3_hgvsc"),
        ReportField::archive("exon", "gdc_exon").null_if("."),
        ReportField::consortium("exon", "mc3_exon").null_if("."),
        ReportField::archive("variant_classification", "gdc_variant_classification"),
        ReportField::consortium("variant_classification", "mc3_variant_classification"),
        ReportField::archive("variant_type", "gdc_variant_type"),
        ReportField::consortium("variant_type", "mc3_variant_type"),
        ReportField::archive("hugo_symbol", "gdc_hugo_symbol"),
        ReportField::consortium("hugo_symbol", "mc3_hugo_symbol"),
        ReportField::consortium("transcript_id", "mc3_transcript_id"),
        ReportField::archive("transcript_id", "gdc_transcript_id"),
        ReportField::archive("callers", "gdc_callers"),
        ReportField::consortium("centers", "mc3_callers"),
        ReportField::consortium("ncallers", "mc3_ncallers"),
        ReportField::consortium("filter", "mc3_filter"),
        ReportField::archive("filter", "gdc_filter"),
        ReportField::archive("gdc_filter", "gdc_gdc_filter"),
        ReportField::archive("mc3_overlap", "gdc_mc3_overlap"),
        ReportField::archive("gdc_validation_status", "gdc_validation_status"),
    ];

    for column in [
        "t_depth_per_caller",
        "t_ref_count_per_caller",
        "t_alt_count_per_caller",
        "n_depth_per_caller",
        "n_ref_count_per_caller",
        "n_alt_count_per_caller",
    ] {
        fields.push(ReportField::archive(column, &format!("gdc_{}", column)));
    }
    for column in ["t_depth", "t_ref_count", "t_alt_count", "n_depth", "n_ref_count", "n_alt_count"] {
        fields.push(ReportField::consortium(column, &format!("mc3_{}", column)));
    }

    fields.extend([
        ReportField::archive("context", "gdc_context"),
        ReportField::consortium("context", "mc3_context"),
        ReportField::archive("existing_variation", "gdc_existing_variation").null_if(""),
        ReportField::consortium("existing_variation", "mc3_existing_variation").null_if("."),
    ]);
    fields
}

/// Tables and columns of one overlap build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapSpec {
    pub archive_table: String,
    pub consortium_table: String,
    /// Source of the sample -> cancer type lookup
    pub mapping_table: String,
    pub output_table: String,
    pub report_fields: Vec<ReportField>,
}

impl Default for OverlapSpec {
    fn default() -> Self {
        Self {
            archive_table: "gdc_shared_samples".to_string(),
            consortium_table: "mc3_shared_samples".to_string(),
            mapping_table: "gdc_shared_samples".to_string(),
            output_table: "full_overlap".to_string(),
            report_fields: default_report_fields(),
        }
    }
}

/// Row counts per overlap class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapSummary {
    pub total: i64,
    pub shared: i64,
    pub archive_only: i64,
    pub consortium_only: i64,
}

impl OverlapSummary {
    pub fn count(&self, class: OverlapClass) -> i64 {
        match class {
            OverlapClass::Shared => self.shared,
            OverlapClass::ArchiveOnly => self.archive_only,
            OverlapClass::ConsortiumOnly => self.consortium_only,
        }
    }
}

impl OverlapSpec {
    /// Reject aliases that collide with each other or with generated columns
    pub fn validate(&self) -> Result<(), OverlapError> {
        for (name, value) in [
            ("archive table", &self.archive_table),
            ("consortium table", &self.consortium_table),
            ("mapping table", &self.mapping_table),
            ("output table", &self.output_table),
        ] {
            if value.is_empty() {
                return Err(OverlapError::InvalidSpec(format!("{} name is empty", name)));
            }
        }

        let mut seen: HashSet<&str> = LOCUS_KEY_COLUMNS.iter().copied().collect();
        seen.extend([
            ARCHIVE_ROWID,
            CONSORTIUM_ROWID,
            CANCER_TYPE_COLUMN,
            OverlapClass::Shared.indicator_column(),
            OverlapClass::ArchiveOnly.indicator_column(),
            OverlapClass::ConsortiumOnly.indicator_column(),
        ]);
        for field in &self.report_fields {
            if !seen.insert(field.alias.as_str()) {
                return Err(OverlapError::InvalidSpec(format!(
                    "duplicate output column '{}'",
                    field.alias
                )));
            }
        }
        Ok(())
    }

    fn select_list(&self) -> String {
        let mut exprs: Vec<String> = LOCUS_KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
        exprs.extend(self.report_fields.iter().map(ReportField::select_expr));

        exprs.push(format!("{}.rowid AS {}", CONSORTIUM_ALIAS, CONSORTIUM_ROWID));
        exprs.push(format!("{}.rowid AS {}", ARCHIVE_ALIAS, ARCHIVE_ROWID));
        exprs.push(format!(
            "(CASE WHEN {m}.rowid IS NOT NULL AND {g}.rowid IS NOT NULL THEN 1 ELSE 0 END) AS {col}",
            m = CONSORTIUM_ALIAS,
            g = ARCHIVE_ALIAS,
            col = OverlapClass::Shared.indicator_column()
        ));
        exprs.push(format!(
            "(CASE WHEN {m}.rowid IS NULL AND {g}.rowid IS NOT NULL THEN 1 ELSE 0 END) AS {col}",
            m = CONSORTIUM_ALIAS,
            g = ARCHIVE_ALIAS,
            col = OverlapClass::ArchiveOnly.indicator_column()
        ));
        exprs.push(format!(
            "(CASE WHEN {m}.rowid IS NOT NULL AND {g}.rowid IS NULL THEN 1 ELSE 0 END) AS {col}",
            m = CONSORTIUM_ALIAS,
            g = ARCHIVE_ALIAS,
            col = OverlapClass::ConsortiumOnly.indicator_column()
        ));

        exprs.join(",\n        ")
    }

    /// Statements that (re)build the output table and its index
    pub fn build_sql(&self) -> String {
        let select_list = self.select_list();
        let join_key = LOCUS_KEY_COLUMNS.join(", ");
        let archive = quote_ident(&self.archive_table);
        let consortium = quote_ident(&self.consortium_table);
        let output = quote_ident(&self.output_table);
        let index = quote_ident(&format!("ix_{}_{}", self.output_table, SAMPLE_BARCODE_COLUMN));

        format!(
            "DROP TABLE IF EXISTS {output};

CREATE TABLE {output} AS
WITH sample_cancer_type AS (
    SELECT DISTINCT {barcode}, {cancer_type}
    FROM {mapping}
), reconciled AS (
    SELECT
        {select_list}
    FROM {archive} {g}
    LEFT JOIN {consortium} {m}
        USING ({join_key})
    UNION ALL
    SELECT
        {select_list}
    FROM {consortium} {m}
    LEFT JOIN {archive} {g}
        USING ({join_key})
    WHERE {g}.rowid IS NULL
)
SELECT reconciled.*, sample_cancer_type.{cancer_type}
FROM reconciled
LEFT JOIN sample_cancer_type
    USING ({barcode});

CREATE INDEX {index} ON {output} ({barcode});
",
            output = output,
            barcode = SAMPLE_BARCODE_COLUMN,
            cancer_type = CANCER_TYPE_COLUMN,
            mapping = quote_ident(&self.mapping_table),
            select_list = select_list,
            archive = archive,
            consortium = consortium,
            g = ARCHIVE_ALIAS,
            m = CONSORTIUM_ALIAS,
            join_key = join_key,
            index = index,
        )
    }

    fn summary_sql(&self) -> String {
        format!(
            "SELECT COUNT(*), COALESCE(SUM({}), 0), COALESCE(SUM({}), 0), COALESCE(SUM({}), 0) FROM {}",
            OverlapClass::Shared.indicator_column(),
            OverlapClass::ArchiveOnly.indicator_column(),
            OverlapClass::ConsortiumOnly.indicator_column(),
            quote_ident(&self.output_table)
        )
    }
}

/// Rebuild the overlap table and report its class counts
pub fn build_overlap<S: Store + ?Sized>(store: &mut S, spec: &OverlapSpec) -> Result<OverlapSummary, OverlapError> {
    spec.validate()?;

    info!(
        "Building {} from {} (GDC) and {} (MC3)",
        spec.output_table, spec.archive_table, spec.consortium_table
    );
    store.execute_script(&spec.build_sql())?;

    let summary = summarize(store, spec)?;
    info!(
        "{}: {} rows ({} shared, {} GDC only, {} MC3 only)",
        spec.output_table, summary.total, summary.shared, summary.archive_only, summary.consortium_only
    );
    Ok(summary)
}

/// Class counts of an existing overlap table
pub fn summarize<S: Store + ?Sized>(store: &mut S, spec: &OverlapSpec) -> Result<OverlapSummary, OverlapError> {
    let rows = store.query(&spec.summary_sql())?;
    let row = rows
        .first()
        .ok_or_else(|| OverlapError::InvalidSpec("summary query returned no rows".to_string()))?;

    let value = |idx: usize| row.get(idx).and_then(SqlValue::as_i64).unwrap_or(0);
    Ok(OverlapSummary {
        total: value(0),
        shared: value(1),
        archive_only: value(2),
        consortium_only: value(3),
    })
}
