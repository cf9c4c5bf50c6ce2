// ==============================================================================
// pipeline.rs - Variant Loading and Overlap Pipeline
// ==============================================================================
// Description: Orchestrates schema creation, MC3/GDC loading and overlap
//              reconciliation against one store
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::config::LoaderConfig;
use crate::discovery::{discover_archive_files, ArchiveKind};
use crate::loader::{BatchLoader, LoadStats};
use crate::models::Dialect;
use crate::overlap::{self, OverlapSpec, OverlapSummary};
use crate::parsers::MafReader;
use crate::schema::{define_schema, IngestMode, TableSchema};
use crate::store::{SqlValue, Store};

pub const MC3_TABLE: &str = "mc3";
pub const GDC_TABLE: &str = "gdc";
pub const MC3_PROTECTED_TABLE: &str = "mc3_protected";
pub const GDC_PROTECTED_TABLE: &str = "gdc_protected";

/// Samples present in both upstream shared-sample tables
const SHARED_SAMPLES_QUERY: &str = "\
SELECT DISTINCT tumor_sample_barcode FROM mc3_shared_samples
INTERSECT
SELECT DISTINCT tumor_sample_barcode FROM gdc_grouped_callers";

/// Destination tables and ingest mode of one load run
struct LoadPlan {
    consortium_table: &'static str,
    archive_table: &'static str,
    archive_kind: ArchiveKind,
    mode: IngestMode,
}

const ALL_VARIANTS: LoadPlan = LoadPlan {
    consortium_table: MC3_TABLE,
    archive_table: GDC_TABLE,
    archive_kind: ArchiveKind::Somatic,
    mode: IngestMode::AllVariants,
};

const SHARED_SAMPLE_VARIANTS: LoadPlan = LoadPlan {
    consortium_table: MC3_PROTECTED_TABLE,
    archive_table: GDC_PROTECTED_TABLE,
    archive_kind: ArchiveKind::Protected,
    mode: IngestMode::SharedSamples,
};

/// Load counters of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLoadSummary {
    pub table: String,
    pub files: usize,
    #[serde(flatten)]
    pub stats: LoadStats,
}

/// Machine-readable record of one CLI run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub tables: Vec<TableLoadSummary>,
    pub shared_samples: Option<usize>,
    pub overlap: Option<OverlapSummary>,
}

impl RunSummary {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            tables: Vec::new(),
            shared_samples: None,
            overlap: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run summary")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write run summary to {:?}", path))?;
        info!("Run summary written to {:?}", path);
        Ok(())
    }
}

/// Schema -> load -> reconcile runs against one store
pub struct VariantPipeline<'a, S: Store + ?Sized> {
    store: &'a mut S,
    loader: LoaderConfig,
}

impl<'a, S: Store + ?Sized> VariantPipeline<'a, S> {
    pub fn new(store: &'a mut S, loader: LoaderConfig) -> Self {
        Self { store, loader }
    }

    /// Rebuild `mc3` and `gdc` from every somatic variant
    pub fn load_all_variants(&mut self, mc3_maf: &Path, gdc_root: &Path) -> Result<Vec<TableLoadSummary>> {
        info!("Loading all MC3 and GDC somatic variants");
        self.load_tables(&ALL_VARIANTS, mc3_maf, gdc_root, None)
    }

    /// Rebuild `mc3_protected` and `gdc_protected`, keeping only `samples`
    pub fn load_shared_sample_variants(
        &mut self,
        mc3_maf: &Path,
        gdc_root: &Path,
        samples: &HashSet<String>,
    ) -> Result<Vec<TableLoadSummary>> {
        info!("Loading protected variants of {} shared samples", samples.len());
        self.load_tables(&SHARED_SAMPLE_VARIANTS, mc3_maf, gdc_root, Some(samples))
    }

    /// Tumor sample barcodes shared by MC3 and the grouped GDC callers
    pub fn shared_samples(&mut self) -> Result<HashSet<String>> {
        let rows = self
            .store
            .query(SHARED_SAMPLES_QUERY)
            .context("Failed to query shared samples (are mc3_shared_samples and gdc_grouped_callers loaded?)")?;

        let samples: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.first().and_then(SqlValue::as_str))
            .map(str::to_string)
            .collect();

        info!("... only consider variants of {} samples", samples.len());
        Ok(samples)
    }

    /// Rebuild the overlap table
    pub fn build_overlap(&mut self, spec: &OverlapSpec) -> Result<OverlapSummary> {
        overlap::build_overlap(&mut *self.store, spec)
            .with_context(|| format!("Failed to build overlap table {}", spec.output_table))
    }

    fn load_tables(
        &mut self,
        plan: &LoadPlan,
        mc3_maf: &Path,
        gdc_root: &Path,
        samples: Option<&HashSet<String>>,
    ) -> Result<Vec<TableLoadSummary>> {
        // 1. Locate and open inputs
        let archive_paths = discover_archive_files(gdc_root, plan.archive_kind)
            .with_context(|| format!("Failed to locate GDC MAFs under {:?}", gdc_root))?;
        let mut archive_paths = archive_paths.iter();
        let first_path = archive_paths
            .next()
            .context("GDC release root has no MAF files")?;

        let mc3_reader =
            MafReader::consortium(mc3_maf).with_context(|| format!("Failed to open MC3 MAF {:?}", mc3_maf))?;
        let first_archive =
            MafReader::archive(first_path).with_context(|| format!("Failed to open GDC MAF {:?}", first_path))?;

        // 2. Define and (re)create both tables from the first readers
        let mc3_schema = define_schema(plan.consortium_table, mc3_reader.dialect(), mc3_reader.columns(), plan.mode)
            .with_context(|| format!("Failed to define table {}", plan.consortium_table))?;
        let gdc_schema = define_schema(
            plan.archive_table,
            first_archive.dialect(),
            first_archive.columns(),
            plan.mode,
        )
        .with_context(|| format!("Failed to define table {}", plan.archive_table))?;

        for schema in [&mc3_schema, &gdc_schema] {
            self.store
                .recreate_table(schema)
                .with_context(|| format!("Failed to create table {}", schema.name))?;
        }

        // 3. MC3
        info!("Loading MC3 variants from {:?}", mc3_maf);
        let mc3_stats = self.load_file(&mc3_schema, mc3_reader, samples)?;
        let mut summaries = vec![TableLoadSummary {
            table: mc3_schema.name.clone(),
            files: 1,
            stats: mc3_stats,
        }];

        // 4. GDC, one file at a time
        info!("Loading GDC variants");
        let mut gdc_stats = self.load_file(&gdc_schema, first_archive, samples)?;
        let mut files = 1;
        for path in archive_paths {
            let reader = MafReader::archive(path).with_context(|| format!("Failed to open GDC MAF {:?}", path))?;
            let stats = self.load_file(&gdc_schema, reader, samples)?;
            gdc_stats.merge(&stats);
            files += 1;
        }
        summaries.push(TableLoadSummary {
            table: gdc_schema.name.clone(),
            files,
            stats: gdc_stats,
        });

        info!("All variants are loaded");
        Ok(summaries)
    }

    fn load_file(
        &mut self,
        schema: &TableSchema,
        reader: MafReader,
        samples: Option<&HashSet<String>>,
    ) -> Result<LoadStats> {
        let path = reader.path().to_path_buf();
        if let Dialect::Archive(source) = reader.dialect() {
            info!("Loading GDC {} {}", source.cancer_type, source.caller);
        }

        let mut loader = BatchLoader::new(schema, self.loader.clone());
        if let Some(samples) = samples {
            loader = loader.with_sample_filter(samples);
        }
        let stats = loader
            .load(&mut *self.store, reader)
            .with_context(|| format!("Failed to load {:?} into {}", path, schema.name))?;

        info!(
            "Loaded {} of {} records from {:?} into {} ({} batches)",
            stats.records_inserted, stats.records_read, path, schema.name, stats.batches_flushed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::SqliteStore;
    use tempfile::tempdir;

    #[test]
    fn test_shared_samples_is_intersection() {
        let mut store = SqliteStore::open_in_memory(&StoreConfig::default()).unwrap();
        store
            .execute_script(
                "CREATE TABLE mc3_shared_samples (tumor_sample_barcode TEXT);
                 CREATE TABLE gdc_grouped_callers (tumor_sample_barcode TEXT);
                 INSERT INTO mc3_shared_samples VALUES ('TCGA-01'), ('TCGA-01'), ('TCGA-02'), ('TCGA-03');
                 INSERT INTO gdc_grouped_callers VALUES ('TCGA-02'), ('TCGA-03'), ('TCGA-04');",
            )
            .unwrap();

        let mut pipeline = VariantPipeline::new(&mut store, LoaderConfig::default());
        let samples = pipeline.shared_samples().unwrap();

        let expected: HashSet<String> = ["TCGA-02", "TCGA-03"].iter().map(|s| s.to_string()).collect();
        assert_eq!(samples, expected);
    }

    #[test]
    fn test_shared_samples_needs_upstream_tables() {
        let mut store = SqliteStore::open_in_memory(&StoreConfig::default()).unwrap();
        let mut pipeline = VariantPipeline::new(&mut store, LoaderConfig::default());
        assert!(pipeline.shared_samples().is_err());
    }

    #[test]
    fn test_run_summary_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");

        let mut summary = RunSummary::new("load");
        summary.tables.push(TableLoadSummary {
            table: "mc3".to_string(),
            files: 1,
            stats: LoadStats {
                records_read: 3,
                records_inserted: 3,
                batches_flushed: 1,
            },
        });
        summary.finish();
        summary.write_json(&path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["command"], "load");
        assert_eq!(json["tables"][0]["table"], "mc3");
        assert_eq!(json["tables"][0]["records_inserted"], 3);
        assert!(json["finished_at"].is_string());
        assert!(json["overlap"].is_null());
    }
}
