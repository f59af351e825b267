//! YAML pipeline configuration for Streamly.
//!
//! One file describes the ingest, query and storage settings; the server
//! reads it when `pipeline_config` points at it.
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! ingest:
//!   max_batch_size: 5000
//!   events_table: "events"
//!
//! query:
//!   default_limit: 1000
//!   tenant_scoped: true
//!
//! storage:
//!   backend: "memory"
//! ```

use std::fs;
use std::path::Path;

use ingest::{IngestConfig, MAX_BATCH_SIZE};
use query::QueryConfig;
use serde::{Deserialize, Serialize};
use server::ServerConfig;
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for a Streamly deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamlyConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestYamlConfig,

    #[serde(default)]
    pub query: QueryYamlConfig,

    #[serde(default)]
    pub storage: StorageYamlConfig,
}

impl StreamlyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: StreamlyConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.ingest.validate()?;
        self.query.validate()?;
        self.storage.validate()
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            max_batch_size: self.ingest.max_batch_size,
            events_table: self.ingest.events_table.clone(),
        }
    }

    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            default_limit: self.query.default_limit,
            tenant_scoped: self.query.tenant_scoped,
        }
    }

    /// Overwrite the pipeline sections of a server configuration.
    pub fn apply_to(&self, server: &mut ServerConfig) {
        server.ingest = self.ingest_config();
        server.query = self.query_config();
    }
}

impl Default for StreamlyConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestYamlConfig::default(),
            query: QueryYamlConfig::default(),
            storage: StorageYamlConfig::default(),
        }
    }
}

/// Ingest stage YAML configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestYamlConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_events_table")]
    pub events_table: String,
}

impl IngestYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        IngestConfig {
            max_batch_size: self.max_batch_size,
            events_table: self.events_table.clone(),
        }
        .validate()
        .map_err(|err| ConfigLoadError::Validation(format!("ingest: {err}")))
    }
}

impl Default for IngestYamlConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            events_table: default_events_table(),
        }
    }
}

/// Query YAML configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryYamlConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    #[serde(default = "true_value")]
    pub tenant_scoped: bool,
}

impl QueryYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.default_limit == 0 {
            return Err(ConfigLoadError::Validation(
                "query.default_limit must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for QueryYamlConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            tenant_scoped: true,
        }
    }
}

/// Storage YAML configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl StorageYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "storage.backend must be one of: {valid_backends:?}"
            )));
        }
        Ok(())
    }
}

impl Default for StorageYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}
fn default_events_table() -> String {
    "events".to_string()
}
fn default_limit() -> u64 {
    1000
}
fn true_value() -> bool {
    true
}
fn default_backend() -> String {
    "memory".to_string()
}
