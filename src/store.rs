// ==============================================================================
// store.rs - Relational Store Connection
// ==============================================================================
// Description: Connection abstraction used by the loader and the overlap
//              reconciler, with the SQLite implementation
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::models::MafRecord;
use crate::schema::{quote_ident, BoundValue, TableSchema};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unsupported database URL '{0}' (expected sqlite:///<path>, :memory: or a file path)")]
    UnsupportedUrl(String),

    #[error("Failed to open database {target}: {source}")]
    Open {
        target: String,
        source: rusqlite::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// One cell of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Integer(v) => SqlValue::Integer(v),
            Value::Real(v) => SqlValue::Real(v),
            Value::Text(s) => SqlValue::Text(s),
            Value::Blob(b) => SqlValue::Blob(b),
        }
    }
}

impl ToSql for BoundValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            BoundValue::Null => ToSqlOutput::Owned(Value::Null),
            BoundValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            BoundValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Operations the ingestion core needs from a relational store
///
/// Access is sequential: every method takes `&mut self`.
pub trait Store {
    /// Drop a table, tolerating its absence
    fn drop_table(&mut self, table: &str) -> Result<(), StoreError>;

    /// Create a table and its indexes from a schema description
    fn create_table(&mut self, schema: &TableSchema) -> Result<(), StoreError>;

    /// Insert records in one transaction; nothing is kept if any row fails
    fn insert_batch(&mut self, schema: &TableSchema, records: &[MafRecord]) -> Result<usize, StoreError>;

    /// Run a raw query and return all rows
    fn query(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, StoreError>;

    /// Run raw statements in one transaction
    fn execute_script(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Drop then create, so every run starts from an empty table
    fn recreate_table(&mut self, schema: &TableSchema) -> Result<(), StoreError> {
        self.drop_table(&schema.name)?;
        self.create_table(schema)
    }

    fn count_rows(&mut self, table: &str) -> Result<i64, StoreError> {
        let rows = self.query(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_i64)
            .unwrap_or(0))
    }
}

/// Where a database URL points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    File(PathBuf),
}

/// Parse a database URL
///
/// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db`, `sqlite://`,
/// `:memory:` and bare file paths.
pub fn parse_database_url(url: &str) -> Result<DatabaseTarget, StoreError> {
    if url == ":memory:" || url == "sqlite://" || url == "sqlite:///:memory:" {
        return Ok(DatabaseTarget::Memory);
    }
    if let Some(path) = url.strip_prefix("sqlite:///") {
        if path.is_empty() {
            return Err(StoreError::UnsupportedUrl(url.to_string()));
        }
        return Ok(DatabaseTarget::File(PathBuf::from(path)));
    }
    if url.contains("://") || url.is_empty() {
        return Err(StoreError::UnsupportedUrl(url.to_string()));
    }
    Ok(DatabaseTarget::File(PathBuf::from(url)))
}

/// SQLite-backed store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store a database URL points to
    pub fn connect(url: &str, config: &StoreConfig) -> Result<Self, StoreError> {
        match parse_database_url(url)? {
            DatabaseTarget::Memory => Self::open_in_memory(config),
            DatabaseTarget::File(path) => Self::open(&path, config),
        }
    }

    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        info!("Opening SQLite database: {:?}", path);
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            target: path.display().to_string(),
            source,
        })?;
        Self::configure(conn, config)
    }

    pub fn open_in_memory(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            target: ":memory:".to_string(),
            source,
        })?;
        Self::configure(conn, config)
    }

    fn configure(conn: Connection, config: &StoreConfig) -> Result<Self, StoreError> {
        // execute_batch handles the rows PRAGMA statements return
        conn.execute_batch(&config.pragma_sql())?;
        debug!("Applied store pragmas: {:?}", config);
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn drop_table(&mut self, table: &str) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        Ok(())
    }

    fn create_table(&mut self, schema: &TableSchema) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&schema.create_sql())?;
        for index in schema.index_sql() {
            tx.execute_batch(&index)?;
        }
        tx.commit()?;

        info!(
            "Created table {} ({} columns, {} unique constraints)",
            schema.name,
            schema.columns.len(),
            schema.unique.len()
        );
        Ok(())
    }

    fn insert_batch(&mut self, schema: &TableSchema, records: &[MafRecord]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&schema.insert_sql())?;
            for record in records {
                let values = schema.bind(record);
                stmt.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Vec<SqlValue>>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();

        let rows = stmt.query_map([], |row| {
            (0..column_count)
                .map(|idx| row.get::<_, Value>(idx).map(SqlValue::from))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn execute_script(&mut self, sql: &str) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.commit()?;
        Ok(())
    }
}
