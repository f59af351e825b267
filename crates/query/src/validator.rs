//! Structural validation of query documents against a JSON Schema.
//!
//! Schemas live in a [`SchemaRegistry`] that is built at startup and handed to
//! every [`AstValidator`]. Registration and lookup are guarded by a read-write
//! lock, so a late registration cannot race a request.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::ast::QueryAstRequest;
use crate::error::{QueryError, SchemaError};

/// Key the query AST schema is registered under.
pub const QUERY_AST_SCHEMA_KEY: &str = "query-ast.schema.json";

/// The bundled query AST schema document.
pub const QUERY_AST_SCHEMA: &str = include_str!("../schema/query-ast.schema.json");

/// Compiled schemas keyed by name.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<jsonschema::Validator>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the bundled query AST schema.
    pub fn with_embedded_schema() -> Result<Self, SchemaError> {
        let registry = Self::new();
        registry.register_document(QUERY_AST_SCHEMA_KEY, QUERY_AST_SCHEMA)?;
        Ok(registry)
    }

    /// Register an already compiled schema. Re-registering a key replaces it.
    pub fn register(&self, key: &str, schema: jsonschema::Validator) -> Result<(), SchemaError> {
        info!(key, "registering_schema");
        self.schemas
            .write()
            .map_err(|_| SchemaError::Poisoned)?
            .insert(key.to_string(), Arc::new(schema));
        Ok(())
    }

    /// Parse, compile and register a schema document.
    pub fn register_document(&self, key: &str, document: &str) -> Result<(), SchemaError> {
        let document: serde_json::Value =
            serde_json::from_str(document).map_err(|err| SchemaError::Parse {
                key: key.to_string(),
                reason: err.to_string(),
            })?;
        let compiled = jsonschema::validator_for(&document).map_err(|err| SchemaError::Compile {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        self.register(key, compiled)
    }

    pub fn get(&self, key: &str) -> Result<Option<Arc<jsonschema::Validator>>, SchemaError> {
        let schemas = self.schemas.read().map_err(|_| SchemaError::Poisoned)?;
        Ok(schemas.get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.schemas
            .read()
            .map(|schemas| schemas.contains_key(key))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<String> = self
            .schemas
            .read()
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("SchemaRegistry").field("keys", &keys).finish()
    }
}

/// Checks the shape of a [`QueryAstRequest`]: required fields, datasource
/// and operator enums, identifier patterns. Semantics are the translator's job.
#[derive(Debug, Clone)]
pub struct AstValidator {
    registry: Arc<SchemaRegistry>,
    key: String,
}

impl AstValidator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_key(registry, QUERY_AST_SCHEMA_KEY)
    }

    pub fn with_key(registry: Arc<SchemaRegistry>, key: impl Into<String>) -> Self {
        Self {
            registry,
            key: key.into(),
        }
    }

    pub fn execute(&self, request: &QueryAstRequest) -> Result<(), QueryError> {
        let document =
            serde_json::to_value(request).map_err(|err| QueryError::Serialize(err.to_string()))?;

        let schema = self
            .registry
            .get(&self.key)?
            .ok_or_else(|| QueryError::SchemaNotRegistered(self.key.clone()))?;

        let errors: Vec<String> = schema
            .iter_errors(&document)
            .map(|err| err.to_string())
            .collect();
        if !errors.is_empty() {
            warn!(
                request_id = %request.request_id,
                violations = errors.len(),
                "query_schema_validation_failed"
            );
            return Err(QueryError::SchemaValidationFailed { errors });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ast::{Datasource, SelectClause, WhereClause};

    fn validator() -> AstValidator {
        AstValidator::new(Arc::new(SchemaRegistry::with_embedded_schema().unwrap()))
    }

    fn valid() -> QueryAstRequest {
        serde_json::from_value(json!({
            "select": ["topic", {"function": "count", "args": ["*"], "alias": "total"}],
            "from": "events",
            "time_range": {"start": "2024-01-01", "end": "2024-01-02"},
            "where": [{"field": "event_type", "op": "IN", "value": ["a", "b"]}],
            "group_by": ["topic", {"time_window": "5 minute"}],
            "order_by": [{"field": "total", "direction": "desc"}],
            "limit": 10,
            "offset": 0
        }))
        .unwrap()
    }

    #[test]
    fn embedded_schema_accepts_full_request() {
        validator().execute(&valid()).unwrap();
    }

    #[test]
    fn missing_from_violates_schema() {
        let mut request = valid();
        request.from = None;
        assert!(matches!(
            validator().execute(&request),
            Err(QueryError::SchemaValidationFailed { .. })
        ));
    }

    #[test]
    fn empty_select_violates_schema() {
        let request = QueryAstRequest {
            from: Some(Datasource::Logs),
            ..Default::default()
        };
        assert!(matches!(
            validator().execute(&request),
            Err(QueryError::SchemaValidationFailed { .. })
        ));
    }

    #[test]
    fn unknown_operator_violates_schema() {
        let mut request = valid();
        request.where_clauses = vec![WhereClause::new("topic", "~", "x")];
        assert!(matches!(
            validator().execute(&request),
            Err(QueryError::SchemaValidationFailed { .. })
        ));
    }

    #[test]
    fn injected_identifier_violates_schema() {
        let mut request = valid();
        request.select = vec![SelectClause::field("topic FROM users --")];
        assert!(validator().execute(&request).is_err());
    }

    #[test]
    fn unregistered_key_is_reported() {
        let validator = AstValidator::with_key(Arc::new(SchemaRegistry::new()), "missing.json");
        assert!(matches!(
            validator.execute(&valid()),
            Err(QueryError::SchemaNotRegistered(key)) if key == "missing.json"
        ));
    }

    #[test]
    fn registration_is_idempotent() {
        let registry = SchemaRegistry::new();
        registry
            .register_document(QUERY_AST_SCHEMA_KEY, QUERY_AST_SCHEMA)
            .unwrap();
        registry
            .register_document(QUERY_AST_SCHEMA_KEY, QUERY_AST_SCHEMA)
            .unwrap();
        assert!(registry.contains(QUERY_AST_SCHEMA_KEY));
        assert!(matches!(
            registry.register_document("bad", "{not json"),
            Err(SchemaError::Parse { .. })
        ));
    }
}
