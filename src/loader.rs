// ==============================================================================
// loader.rs - Batched MAF Loader
// ==============================================================================
// Description: Drains a MAF reader into a store in fixed-size transactions
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// A failed flush is fatal: its transaction is rolled back and the load stops.
// Retrying a batch could insert rows twice wherever the table has no
// uniqueness constraint.
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::config::LoaderConfig;
use crate::models::{MafRecord, SAMPLE_BARCODE_COLUMN};
use crate::parsers::{MafParseError, MafReader};
use crate::schema::TableSchema;
use crate::store::{Store, StoreError};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] MafParseError),

    #[error("Columns of {path} do not match table {table}")]
    ColumnMismatch { path: PathBuf, table: String },

    #[error("Cannot filter {path} by sample: no '{column}' column")]
    MissingFilterColumn { path: PathBuf, column: String },

    #[error("Batch {batch} into {table} failed near line {line} of {path}: {source}")]
    BatchWrite {
        table: String,
        path: PathBuf,
        batch: usize,
        line: usize,
        source: StoreError,
    },
}

/// Counters for one loaded file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub records_read: usize,
    pub records_inserted: usize,
    pub batches_flushed: usize,
}

impl LoadStats {
    pub fn merge(&mut self, other: &LoadStats) {
        self.records_read += other.records_read;
        self.records_inserted += other.records_inserted;
        self.batches_flushed += other.batches_flushed;
    }
}

/// Writes reader output into one table
pub struct BatchLoader<'a> {
    schema: &'a TableSchema,
    config: LoaderConfig,
    sample_filter: Option<&'a HashSet<String>>,
}

impl<'a> BatchLoader<'a> {
    pub fn new(schema: &'a TableSchema, config: LoaderConfig) -> Self {
        Self {
            schema,
            config,
            sample_filter: None,
        }
    }

    /// Only keep records whose tumor sample barcode is in `samples`
    pub fn with_sample_filter(mut self, samples: &'a HashSet<String>) -> Self {
        self.sample_filter = Some(samples);
        self
    }

    fn keep(&self, record: &MafRecord) -> bool {
        match self.sample_filter {
            None => true,
            Some(samples) => record
                .sample_barcode()
                .is_some_and(|barcode| samples.contains(barcode)),
        }
    }

    /// Load every record of `reader`
    ///
    /// The reader is consumed and its file released whatever the outcome.
    pub fn load<S: Store + ?Sized>(&self, store: &mut S, mut reader: MafReader) -> Result<LoadStats, LoadError> {
        let path = reader.path().to_path_buf();

        if !self.schema.matches(reader.columns()) {
            return Err(LoadError::ColumnMismatch {
                path,
                table: self.schema.name.clone(),
            });
        }
        if self.sample_filter.is_some() && !reader.columns().contains(SAMPLE_BARCODE_COLUMN) {
            return Err(LoadError::MissingFilterColumn {
                path,
                column: SAMPLE_BARCODE_COLUMN.to_string(),
            });
        }

        let batch_size = self.config.batch_size.max(1);
        let progress_interval = self.config.progress_interval.max(1);
        let mut stats = LoadStats::default();
        let mut batch: Vec<MafRecord> = Vec::with_capacity(batch_size);

        while let Some(record) = reader.next_record()? {
            stats.records_read += 1;
            if stats.records_read % progress_interval == 0 {
                info!("... processed {} records", stats.records_read);
            }

            if !self.keep(&record) {
                continue;
            }
            batch.push(record);

            if batch.len() >= batch_size {
                self.flush(store, &mut batch, &mut stats, &path, reader.line_number())?;
            }
        }

        // Remaining partial batch
        if !batch.is_empty() {
            self.flush(store, &mut batch, &mut stats, &path, reader.line_number())?;
        }

        Ok(stats)
    }

    fn flush<S: Store + ?Sized>(
        &self,
        store: &mut S,
        batch: &mut Vec<MafRecord>,
        stats: &mut LoadStats,
        path: &std::path::Path,
        line: usize,
    ) -> Result<(), LoadError> {
        let inserted = store
            .insert_batch(self.schema, batch)
            .map_err(|source| LoadError::BatchWrite {
                table: self.schema.name.clone(),
                path: path.to_path_buf(),
                batch: stats.batches_flushed + 1,
                line,
                source,
            })?;

        stats.records_inserted += inserted;
        stats.batches_flushed += 1;
        batch.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::schema::{define_schema, IngestMode};
    use crate::store::{SqlValue, SqliteStore};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Store that records batch sizes instead of writing
    #[derive(Default)]
    struct CountingStore {
        batches: Vec<usize>,
        barcodes: Vec<String>,
        fail_on_batch: Option<usize>,
    }

    impl Store for CountingStore {
        fn drop_table(&mut self, _table: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn create_table(&mut self, _schema: &TableSchema) -> Result<(), StoreError> {
            Ok(())
        }

        fn insert_batch(&mut self, _schema: &TableSchema, records: &[MafRecord]) -> Result<usize, StoreError> {
            if self.fail_on_batch == Some(self.batches.len() + 1) {
                return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.batches.push(records.len());
            self.barcodes
                .extend(records.iter().filter_map(|r| r.sample_barcode().map(str::to_string)));
            Ok(records.len())
        }

        fn query(&mut self, _sql: &str) -> Result<Vec<Vec<SqlValue>>, StoreError> {
            Ok(Vec::new())
        }

        fn execute_script(&mut self, _sql: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Write a consortium MAF with `n` records cycling through `samples`
    fn create_maf(n: usize, samples: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "#version 2.4").unwrap();
        writeln!(file, "Chromosome\tStart_Position\tEnd_Position\tTumor_Sample_Barcode").unwrap();
        for i in 0..n {
            let sample = samples[i % samples.len()];
            writeln!(file, "1\t{}\t{}\t{}", 1000 + i, 1001 + i, sample).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn schema_for(reader: &MafReader, mode: IngestMode) -> TableSchema {
        define_schema("mc3", reader.dialect(), reader.columns(), mode).unwrap()
    }

    #[test]
    fn test_flush_count_is_ceiling() {
        for (n, expected_batches) in [(0, 0), (1, 1), (999, 1), (1000, 1), (1001, 2), (2500, 3)] {
            let file = create_maf(n, &["TCGA-01"]);
            let reader = MafReader::consortium(file.path()).unwrap();
            let schema = schema_for(&reader, IngestMode::AllVariants);
            let mut store = CountingStore::default();

            let stats = BatchLoader::new(&schema, LoaderConfig::default())
                .load(&mut store, reader)
                .unwrap();

            assert_eq!(stats.batches_flushed, expected_batches, "n = {}", n);
            assert_eq!(store.batches.len(), expected_batches);
            assert_eq!(stats.records_read, n);
            assert_eq!(stats.records_inserted, n);
            assert!(store.batches.iter().all(|&size| size <= 1000));
        }
    }

    #[test]
    fn test_sample_filter() {
        let file = create_maf(30, &["TCGA-01", "TCGA-02", "TCGA-03"]);
        let reader = MafReader::consortium(file.path()).unwrap();
        let schema = schema_for(&reader, IngestMode::SharedSamples);
        let allowed: HashSet<String> = ["TCGA-01", "TCGA-03", "TCGA-99"].iter().map(|s| s.to_string()).collect();
        let mut store = CountingStore::default();

        let config = LoaderConfig {
            batch_size: 4,
            ..LoaderConfig::default()
        };
        let stats = BatchLoader::new(&schema, config)
            .with_sample_filter(&allowed)
            .load(&mut store, reader)
            .unwrap();

        assert_eq!(stats.records_read, 30);
        assert_eq!(stats.records_inserted, 20);
        // Discarded records do not count toward the threshold
        assert_eq!(store.batches, vec![4, 4, 4, 4, 4]);
        assert!(store.barcodes.iter().all(|b| allowed.contains(b)));
        let distinct: HashSet<_> = store.barcodes.iter().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_batch_failure_is_fatal() {
        let file = create_maf(25, &["TCGA-01"]);
        let reader = MafReader::consortium(file.path()).unwrap();
        let schema = schema_for(&reader, IngestMode::AllVariants);
        let mut store = CountingStore {
            fail_on_batch: Some(2),
            ..CountingStore::default()
        };

        let config = LoaderConfig {
            batch_size: 10,
            ..LoaderConfig::default()
        };
        let err = BatchLoader::new(&schema, config)
            .load(&mut store, reader)
            .unwrap_err();

        match err {
            LoadError::BatchWrite { batch, table, .. } => {
                assert_eq!(batch, 2);
                assert_eq!(table, "mc3");
            }
            other => panic!("Expected BatchWrite error, got {:?}", other),
        }
        // Nothing after the failed batch was attempted
        assert_eq!(store.batches, vec![10]);
    }

    #[test]
    fn test_column_mismatch_rejected() {
        let file = create_maf(3, &["TCGA-01"]);
        let reader = MafReader::consortium(file.path()).unwrap();
        let schema = schema_for(&reader, IngestMode::AllVariants);

        // Same file read as plain lacks the line-number column
        let plain = MafReader::plain(file.path()).unwrap();
        let mut store = CountingStore::default();
        let err = BatchLoader::new(&schema, LoaderConfig::default())
            .load(&mut store, plain)
            .unwrap_err();

        assert!(matches!(err, LoadError::ColumnMismatch { .. }));
        assert!(store.batches.is_empty());
    }

    #[test]
    fn test_rows_land_in_sqlite() {
        let file = create_maf(2500, &["TCGA-01", "TCGA-02"]);
        let reader = MafReader::consortium(file.path()).unwrap();
        let schema = schema_for(&reader, IngestMode::AllVariants);
        let mut store = SqliteStore::open_in_memory(&StoreConfig::default()).unwrap();
        store.recreate_table(&schema).unwrap();

        let stats = BatchLoader::new(&schema, LoaderConfig::default())
            .load(&mut store, reader)
            .unwrap();

        assert_eq!(stats.batches_flushed, 3);
        assert_eq!(store.count_rows("mc3").unwrap(), 2500);

        let rows = store
            .query("SELECT DISTINCT chromosome FROM mc3")
            .unwrap();
        assert_eq!(rows, vec![vec![SqlValue::Text("chr1".to_string())]]);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = LoadStats::default();
        total.merge(&LoadStats {
            records_read: 10,
            records_inserted: 7,
            batches_flushed: 1,
        });
        total.merge(&LoadStats {
            records_read: 5,
            records_inserted: 5,
            batches_flushed: 1,
        });
        assert_eq!(
            total,
            LoadStats {
                records_read: 15,
                records_inserted: 12,
                batches_flushed: 2
            }
        );
    }
}
