// ==============================================================================
// bed.rs - MAF to BED Coordinate Export
// ==============================================================================
// Description: Writes the genomic location of every MAF record as a gzipped BED
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// MAF positions are 1-based inclusive; BED intervals are 0-based half-open:
//   chrom <TAB> start_position - 1 <TAB> end_position
// ==============================================================================

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::models::{MafRecord, CHROMOSOME_COLUMN};
use crate::parsers::{MafParseError, MafReader};

const START_COLUMN: &str = "start_position";
const END_COLUMN: &str = "end_position";

#[derive(Error, Debug)]
pub enum BedError {
    #[error(transparent)]
    Parse(#[from] MafParseError),

    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("Invalid {column} '{value}' at line {line} of {path}")]
    InvalidPosition {
        path: PathBuf,
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One BED line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedInterval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
}

impl BedInterval {
    /// Convert the 1-based inclusive coordinates of a record
    pub fn from_record(record: &MafRecord, path: &Path) -> Result<Self, BedError> {
        let position = |column: &'static str| -> Result<i64, BedError> {
            let value = record.get(column).ok_or_else(|| BedError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })?;
            value.trim().parse::<i64>().map_err(|_| BedError::InvalidPosition {
                path: path.to_path_buf(),
                line: record.line_number(),
                column,
                value: value.to_string(),
            })
        };

        let chrom = record
            .get(CHROMOSOME_COLUMN)
            .ok_or_else(|| BedError::MissingColumn {
                path: path.to_path_buf(),
                column: CHROMOSOME_COLUMN,
            })?
            .to_string();

        Ok(Self {
            chrom,
            start: position(START_COLUMN)? - 1,
            end: position(END_COLUMN)?,
        })
    }
}

/// Export every record of `maf_path` to a gzipped BED at `out_path`
///
/// Returns the number of intervals written.
pub fn export_bed(maf_path: &Path, out_path: &Path) -> Result<usize, BedError> {
    let reader = MafReader::plain(maf_path)?;
    for column in [CHROMOSOME_COLUMN, START_COLUMN, END_COLUMN] {
        if !reader.columns().contains(column) {
            return Err(BedError::MissingColumn {
                path: maf_path.to_path_buf(),
                column,
            });
        }
    }

    let write_err = |source| BedError::Write {
        path: out_path.to_path_buf(),
        source,
    };
    let file = File::create(out_path).map_err(write_err)?;
    let mut writer = GzEncoder::new(BufWriter::new(file), Compression::default());

    let mut written = 0;
    for record in reader {
        let interval = BedInterval::from_record(&record?, maf_path)?;
        writeln!(writer, "{}\t{}\t{}", interval.chrom, interval.start, interval.end).map_err(write_err)?;
        written += 1;
    }

    writer
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(write_err)?;

    info!("Wrote {} intervals to {:?}", written, out_path);
    Ok(written)
}
