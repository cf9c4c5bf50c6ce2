// ==============================================================================
// parsers/maf.rs - Streaming MAF Reader
// ==============================================================================
// Description: Forward-only reader for MAF files (plain or gzip-compressed)
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text with header comments
// Example:
//   #version 2.4
//   Hugo_Symbol    Chromosome    Start_Position    Tumor_Sample_Barcode
//   TP53           17            7675088           TCGA-AB-1234-01A
// ==============================================================================

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::dialect::{enrich_values, normalize_columns};
use crate::models::{ArchiveSource, ColumnSet, Dialect, MafRecord, CHROMOSOME_COLUMN};

/// Lines starting with this marker before the header are comments
const COMMENT_MARKER: char = '#';

/// Errors that can occur while reading a MAF file
#[derive(Error, Debug)]
pub enum MafParseError {
    #[error("Failed to open MAF file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path} at line {line}: {source}")]
    Io {
        path: PathBuf,
        line: usize,
        source: std::io::Error,
    },

    #[error("Malformed header in {path}: {details}")]
    MalformedHeader { path: PathBuf, details: String },

    #[error("Invalid GDC file name {path}: expected <project>.<cancer type>.<caller>[...]")]
    InvalidFileName { path: PathBuf },

    #[error("Field count mismatch in {path} at line {line}: expected {expected}, found {found}")]
    FieldCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },
}

/// Streaming reader over one MAF file
///
/// Construction reads the comment preamble and the header; records are then
/// pulled one line at a time. End of file is the normal end of the sequence
/// (`None`), never an error. The file handle is released once the reader is
/// exhausted, closed or dropped.
pub struct MafReader {
    path: PathBuf,
    dialect: Dialect,
    source: Option<Box<dyn BufRead>>,
    line_number: usize,
    buffer: String,
    header_comments: Vec<String>,
    raw_columns: Vec<String>,
    columns: Arc<ColumnSet>,
}

impl std::fmt::Debug for MafReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MafReader")
            .field("path", &self.path)
            .field("dialect", &self.dialect)
            .field("line_number", &self.line_number)
            .field("open", &self.source.is_some())
            .finish()
    }
}

impl MafReader {
    /// Open a generic MAF file (lower-cased header, no synthetic columns)
    pub fn plain(path: impl AsRef<Path>) -> Result<Self, MafParseError> {
        Self::open(path, Dialect::Plain)
    }

    /// Open an MC3 consortium MAF
    pub fn consortium(path: impl AsRef<Path>) -> Result<Self, MafParseError> {
        Self::open(path, Dialect::Consortium)
    }

    /// Open a GDC archive MAF, taking cancer type and caller from the file name
    pub fn archive(path: impl AsRef<Path>) -> Result<Self, MafParseError> {
        let path = path.as_ref();
        let source = ArchiveSource::from_path(path).ok_or_else(|| MafParseError::InvalidFileName {
            path: path.to_path_buf(),
        })?;
        Self::open(path, Dialect::Archive(source))
    }

    /// Open a MAF file with an explicit dialect
    ///
    /// Files ending in `.gz` are decompressed on the fly.
    pub fn open(path: impl AsRef<Path>, dialect: Dialect) -> Result<Self, MafParseError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| MafParseError::Open {
            path: path.clone(),
            source,
        })?;

        let source: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Self::from_reader(path, source, dialect)
    }

    /// Build a reader over an already opened source
    ///
    /// `path` is only used for error messages.
    pub fn from_reader(
        path: impl Into<PathBuf>,
        source: Box<dyn BufRead>,
        dialect: Dialect,
    ) -> Result<Self, MafParseError> {
        let mut reader = Self {
            path: path.into(),
            dialect,
            source: Some(source),
            line_number: 0,
            buffer: String::new(),
            header_comments: Vec::new(),
            raw_columns: Vec::new(),
            columns: Arc::default(),
        };
        reader.read_header()?;

        debug!(
            "Opened {} MAF {:?}: {} comment lines, {} columns",
            reader.dialect.as_str(),
            reader.path,
            reader.header_comments.len(),
            reader.columns.len()
        );

        Ok(reader)
    }

    /// Consume the comment preamble and the column header
    fn read_header(&mut self) -> Result<(), MafParseError> {
        loop {
            if !self.read_line()? {
                return Err(MafParseError::MalformedHeader {
                    path: self.path.clone(),
                    details: "no column header found before end of file".to_string(),
                });
            }
            if self.buffer.starts_with(COMMENT_MARKER) {
                self.header_comments.push(self.buffer.clone());
            } else {
                break;
            }
        }

        self.raw_columns = self.buffer.split('\t').map(str::to_string).collect();

        let names = normalize_columns(&self.dialect, &self.raw_columns);
        let columns = ColumnSet::new(names).map_err(|duplicate| MafParseError::MalformedHeader {
            path: self.path.clone(),
            details: format!("duplicate column '{}' after normalization", duplicate),
        })?;

        if self.dialect == Dialect::Consortium && !columns.contains(CHROMOSOME_COLUMN) {
            return Err(MafParseError::MissingColumn {
                path: self.path.clone(),
                column: CHROMOSOME_COLUMN.to_string(),
            });
        }

        self.columns = Arc::new(columns);
        Ok(())
    }

    /// Read the next line into the buffer without its terminator
    ///
    /// Returns `false` at end of file and releases the source.
    fn read_line(&mut self) -> Result<bool, MafParseError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };

        self.buffer.clear();
        let bytes = source
            .read_line(&mut self.buffer)
            .map_err(|source| MafParseError::Io {
                path: self.path.clone(),
                line: self.line_number + 1,
                source,
            })?;

        if bytes == 0 {
            self.source = None;
            return Ok(false);
        }

        self.line_number += 1;
        if self.buffer.ends_with('\n') {
            self.buffer.pop();
            if self.buffer.ends_with('\r') {
                self.buffer.pop();
            }
        }
        Ok(true)
    }

    /// Pull the next record
    ///
    /// `Ok(None)` marks the end of the stream.
    pub fn next_record(&mut self) -> Result<Option<MafRecord>, MafParseError> {
        if !self.read_line()? {
            return Ok(None);
        }

        let mut values: Vec<String> = self.buffer.split('\t').map(str::to_string).collect();
        if values.len() != self.raw_columns.len() {
            let err = MafParseError::FieldCount {
                path: self.path.clone(),
                line: self.line_number,
                expected: self.raw_columns.len(),
                found: values.len(),
            };
            self.source = None;
            return Err(err);
        }

        enrich_values(&self.dialect, &self.columns, &mut values, self.line_number);

        Ok(Some(MafRecord::new(
            Arc::clone(&self.columns),
            values,
            self.line_number,
        )))
    }

    /// Release the underlying file handle without reading further
    pub fn close(mut self) {
        self.source = None;
    }

    /// Whether the underlying file is still open
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Comment lines preceding the header, verbatim without line terminators
    pub fn header_comments(&self) -> &[String] {
        &self.header_comments
    }

    /// Header tokens as they appear in the file
    pub fn raw_columns(&self) -> &[String] {
        &self.raw_columns
    }

    /// Normalized column list shared by every record of this reader
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// Physical line number of the last line read
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl Iterator for MafReader {
    type Item = Result<MafRecord, MafParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
