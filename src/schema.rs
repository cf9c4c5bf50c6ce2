// ==============================================================================
// schema.rs - Relational Table Definitions
// ==============================================================================
// Description: Derives SQL table schemas from the normalized MAF column list
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    ColumnSet, Dialect, MafRecord, CALLER_COLUMN, CANCER_TYPE_COLUMN, LINE_NUMBER_COLUMN,
    SAMPLE_BARCODE_COLUMN,
};

/// Errors raised while deriving a table schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Table {table}: required column '{column}' not in the MAF header")]
    MissingColumn { table: String, column: String },

    #[error("Table {table}: no columns to define")]
    NoColumns { table: String },
}

/// SQL storage class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

/// How a table is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Every variant of every file; rows are unique per source line
    AllVariants,
    /// Only variants of an allow-listed sample set; no uniqueness constraint
    SharedSamples,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
}

/// Table definition derived from one reader's column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexDef>,
    pub unique: Vec<Vec<String>>,
}

/// Value bound to one INSERT parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundValue<'a> {
    Null,
    Integer(i64),
    Text(&'a str),
}

/// Quote an SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Uniqueness columns enforced in all-variants mode
fn unique_columns(dialect: &Dialect) -> Vec<&'static str> {
    match dialect {
        Dialect::Plain => Vec::new(),
        Dialect::Consortium => vec![LINE_NUMBER_COLUMN],
        // GDC tables aggregate many per-caller files
        Dialect::Archive(_) => vec![CANCER_TYPE_COLUMN, CALLER_COLUMN, LINE_NUMBER_COLUMN],
    }
}

/// Derive a table schema from a representative column list
///
/// Integer typing comes from the dialect's fixed allow-list; everything else
/// is TEXT. The sample barcode column is always indexed.
pub fn define_schema(
    table: &str,
    dialect: &Dialect,
    columns: &ColumnSet,
    mode: IngestMode,
) -> Result<TableSchema, SchemaError> {
    if columns.is_empty() {
        return Err(SchemaError::NoColumns {
            table: table.to_string(),
        });
    }

    let integer_columns = dialect.integer_columns();
    let column_defs = columns
        .names()
        .iter()
        .map(|name| ColumnDef {
            name: name.clone(),
            column_type: if integer_columns.contains(&name.as_str()) {
                ColumnType::Integer
            } else {
                ColumnType::Text
            },
        })
        .collect();

    let require = |column: &str| -> Result<String, SchemaError> {
        if columns.contains(column) {
            Ok(column.to_string())
        } else {
            Err(SchemaError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    };

    let indexes = vec![IndexDef {
        name: format!("ix_{}_tumor_barcode", table),
        columns: vec![require(SAMPLE_BARCODE_COLUMN)?],
    }];

    let unique = match mode {
        IngestMode::AllVariants => {
            let constraint = unique_columns(dialect)
                .into_iter()
                .map(require)
                .collect::<Result<Vec<_>, _>>()?;
            if constraint.is_empty() {
                Vec::new()
            } else {
                vec![constraint]
            }
        }
        IngestMode::SharedSamples => Vec::new(),
    };

    Ok(TableSchema {
        name: table.to_string(),
        columns: column_defs,
        indexes,
        unique,
    })
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Whether a reader's column list lines up with this table
    pub fn matches(&self, columns: &ColumnSet) -> bool {
        self.columns.len() == columns.len()
            && self
                .column_names()
                .zip(columns.names())
                .all(|(a, b)| a == b.as_str())
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.as_sql()))
            .collect();

        for constraint in &self.unique {
            let cols: Vec<String> = constraint.iter().map(|c| quote_ident(c)).collect();
            parts.push(format!("UNIQUE ({})", cols.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_ident(&self.name),
            parts.join(",\n    ")
        )
    }

    pub fn index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|ix| {
                let cols: Vec<String> = ix.columns.iter().map(|c| quote_ident(c)).collect();
                format!(
                    "CREATE INDEX {} ON {} ({})",
                    quote_ident(&ix.name),
                    quote_ident(&self.name),
                    cols.join(", ")
                )
            })
            .collect()
    }

    /// Parameterized single-row INSERT for this table
    pub fn insert_sql(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(|c| quote_ident(&c.name)).collect();
        let params: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.name),
            cols.join(", "),
            params.join(", ")
        )
    }

    /// Type a record's string values for insertion
    ///
    /// Empty integer values bind as NULL; values that do not parse stay text,
    /// which is what SQLite's INTEGER affinity would keep anyway.
    pub fn bind<'r>(&self, record: &'r MafRecord) -> Vec<BoundValue<'r>> {
        self.columns
            .iter()
            .zip(record.values())
            .map(|(column, value)| match column.column_type {
                ColumnType::Text => BoundValue::Text(value),
                ColumnType::Integer if value.is_empty() => BoundValue::Null,
                ColumnType::Integer => value
                    .parse::<i64>()
                    .map(BoundValue::Integer)
                    .unwrap_or(BoundValue::Text(value)),
            })
            .collect()
    }
}
