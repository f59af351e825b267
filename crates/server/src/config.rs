use ingest::IngestConfig;
use query::QueryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Tenant bound to the development key inserted when none are configured.
pub const DEMO_TENANT: &str = "demo";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API key -> tenant id. Every request made with a key acts for its tenant.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Pipeline YAML file overriding `ingest` and `query`.
    #[serde(default)]
    pub pipeline_config: Option<PathBuf>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashMap::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            pipeline_config: None,
            ingest: IngestConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.*` file and
    /// `STREAMLY_SERVER__*` environment variables, in increasing priority.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("STREAMLY_SERVER").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        if config.api_keys.is_empty() {
            tracing::warn!(
                tenant_id = DEMO_TENANT,
                "no API keys configured, using demo key 'demo-key-12345'"
            );
            config
                .api_keys
                .insert("demo-key-12345".to_string(), DEMO_TENANT.to_string());
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ingest.validate()?;
        self.query.validate()?;
        if self.rate_limit_per_minute == 0 {
            anyhow::bail!("rate_limit_per_minute must be greater than zero");
        }
        if let Some((key, _)) = self.api_keys.iter().find(|(_, tenant)| tenant.is_empty()) {
            anyhow::bail!("API key `{key}` is not bound to a tenant");
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// Tenant bound to `key`, if the key is known.
    pub fn tenant_for(&self, key: &str) -> Option<&str> {
        self.api_keys.get(key).map(String::as_str)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size(), 10 * 1024 * 1024);
        assert_eq!(cfg.rate_limit_per_minute, 100);
        assert_eq!(cfg.ingest.max_batch_size, 5000);
        assert_eq!(cfg.query.default_limit, 1000);
        assert!(cfg.enable_cors);
        assert!(cfg.metrics_enabled);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn keys_resolve_to_tenants() {
        let mut cfg = ServerConfig::default();
        cfg.api_keys.insert("k1".into(), "tenant-a".into());

        assert_eq!(cfg.tenant_for("k1"), Some("tenant-a"));
        assert_eq!(cfg.tenant_for("k2"), None);
    }

    #[test]
    fn unbound_key_is_rejected() {
        let mut cfg = ServerConfig::default();
        cfg.api_keys.insert("k1".into(), String::new());
        assert!(cfg.validate().is_err());

        let mut cfg = ServerConfig::default();
        cfg.ingest.max_batch_size = 6000;
        assert!(cfg.validate().is_err());
    }
}
