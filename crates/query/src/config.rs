//! Query defaults.
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Row limit applied when a request names none.
    ///
    /// Default: `1000`
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Add `tenant_id = ?` from the authenticated caller to every query.
    ///
    /// Default: `true`
    #[serde(default = "default_tenant_scoped")]
    pub tenant_scoped: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            tenant_scoped: default_tenant_scoped(),
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), QueryConfigError> {
        if self.default_limit == 0 {
            return Err(QueryConfigError::InvalidDefaultLimit);
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryConfigError {
    #[error("default_limit must be greater than zero")]
    InvalidDefaultLimit,
}

fn default_limit() -> u64 {
    1000
}

fn default_tenant_scoped() -> bool {
    true
}
