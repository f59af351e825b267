//! Configuration for the ingestion pipeline.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! assert_eq!(config.max_batch_size, 5000);
//! assert_eq!(config.events_table, "events");
//! config.validate().expect("defaults are valid");
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MAX_BATCH_SIZE;

/// Runtime knobs for batch ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Largest accepted batch. May be lowered, never raised above 5000.
    ///
    /// Default: `5000`
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Table receiving event rows.
    ///
    /// Default: `"events"`
    #[serde(default = "default_events_table")]
    pub events_table: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            events_table: default_events_table(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize(self.max_batch_size));
        }
        let valid_table = !self.events_table.is_empty()
            && self
                .events_table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid_table {
            return Err(ConfigError::InvalidTableName(self.events_table.clone()));
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_batch_size must be between 1 and 5000, got {0}")]
    InvalidBatchSize(usize),

    #[error("invalid events table name `{0}`")]
    InvalidTableName(String),
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_events_table() -> String {
    "events".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_batch_size_above_ceiling() {
        let cfg = IngestConfig {
            max_batch_size: MAX_BATCH_SIZE + 1,
            ..IngestConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidBatchSize(MAX_BATCH_SIZE + 1))
        );
    }

    #[test]
    fn rejects_unsafe_table_name() {
        let cfg = IngestConfig {
            events_table: "events; DROP TABLE x".into(),
            ..IngestConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTableName(_))
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: IngestConfig = serde_json::from_str(r#"{"max_batch_size": 100}"#).unwrap();
        assert_eq!(cfg.max_batch_size, 100);
        assert_eq!(cfg.events_table, "events");
    }
}
