// ==============================================================================
// config.rs - Run Configuration
// ==============================================================================
// Description: Store pragmas and loader tuning, optionally read from JSON
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Example (all keys optional):
//   {
//     "store":  { "cache_size": -4192000, "temp_store": "memory", "journal_mode": "memory" },
//     "loader": { "batch_size": 1000, "progress_interval": 100000 }
//   }
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid loader setting: {0}")]
    InvalidValue(String),
}

/// SQLite `temp_store` pragma values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempStore {
    Default,
    File,
    Memory,
}

/// SQLite `journal_mode` pragma values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

/// Connection settings applied when a store is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Page cache size (negative = KiB, positive = pages)
    pub cache_size: i64,
    pub temp_store: TempStore,
    pub journal_mode: JournalMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_size: -4_192_000, // ~4 GB
            temp_store: TempStore::Memory,
            journal_mode: JournalMode::Memory,
        }
    }
}

impl StoreConfig {
    /// PRAGMA statements for this configuration
    pub fn pragma_sql(&self) -> String {
        let temp_store = match self.temp_store {
            TempStore::Default => "DEFAULT",
            TempStore::File => "FILE",
            TempStore::Memory => "MEMORY",
        };
        let journal_mode = match self.journal_mode {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        };
        format!(
            "PRAGMA cache_size = {};\nPRAGMA temp_store = {};\nPRAGMA journal_mode = {};",
            self.cache_size, temp_store, journal_mode
        )
    }
}

/// Batched loader tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Records per INSERT transaction
    pub batch_size: usize,
    /// Log progress every this many records read
    pub progress_interval: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            progress_interval: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub store: StoreConfig,
    pub loader: LoaderConfig,
}

impl RunConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.batch_size == 0 {
            return Err(ConfigError::InvalidValue("batch_size must be at least 1".to_string()));
        }
        if self.loader.progress_interval == 0 {
            return Err(ConfigError::InvalidValue(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.loader.batch_size, 1000);
        assert_eq!(config.loader.progress_interval, 100_000);
        assert_eq!(
            config.store.pragma_sql(),
            "PRAGMA cache_size = -4192000;\nPRAGMA temp_store = MEMORY;\nPRAGMA journal_mode = MEMORY;"
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RunConfig::from_json(r#"{"store": {"journal_mode": "off"}, "loader": {"batch_size": 50}}"#).unwrap();
        assert_eq!(config.store.journal_mode, JournalMode::Off);
        assert_eq!(config.store.temp_store, TempStore::Memory);
        assert_eq!(config.loader.batch_size, 50);
        assert_eq!(config.loader.progress_interval, 100_000);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = RunConfig::from_json(r#"{"loader": {"batch_size": 0}}"#);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_unknown_journal_mode_rejected() {
        let result = RunConfig::from_json(r#"{"store": {"journal_mode": "sometimes"}}"#);
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }
}
