use std::sync::Arc;

use storage::Value;
use tracing::debug;

use crate::ast::QueryAstRequest;
use crate::error::QueryError;
use crate::translator::Translator;
use crate::validator::{AstValidator, SchemaRegistry};

/// Parameterized SQL ready for a driver. `args` line up with the `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Validate, translate, build.
///
/// Schema validation always runs before translation, so the translator only
/// ever sees structurally valid documents.
#[derive(Debug, Clone)]
pub struct AstBuilder {
    validator: AstValidator,
    translator: Translator,
}

impl AstBuilder {
    pub fn new(validator: AstValidator, translator: Translator) -> Self {
        Self {
            validator,
            translator,
        }
    }

    /// Builder over the embedded query schema.
    pub fn with_registry(registry: Arc<SchemaRegistry>, translator: Translator) -> Self {
        Self::new(AstValidator::new(registry), translator)
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn execute(&self, request: &QueryAstRequest) -> Result<CompiledQuery, QueryError> {
        self.validator.execute(request)?;
        let (sql, args) = self.translator.translate(request)?.build()?;
        debug!(
            request_id = %request.request_id,
            sql = %sql,
            args = args.len(),
            "query_built"
        );
        Ok(CompiledQuery { sql, args })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::translator::TranslateError;

    fn builder(translator: Translator) -> AstBuilder {
        let registry = Arc::new(SchemaRegistry::with_embedded_schema().unwrap());
        AstBuilder::with_registry(registry, translator)
    }

    #[test]
    fn compiles_grouped_aggregation() {
        let mut request: QueryAstRequest = serde_json::from_value(json!({
            "select": ["topic", {"function": "count", "args": ["*"], "alias": "total"}],
            "from": "events",
            "time_range": {"start": "2024-01-01 00:00:00"},
            "where": [{"field": "event_type", "op": "IN", "value": ["click", "view"]}],
            "group_by": ["topic"],
            "order_by": [{"field": "total", "direction": "DESC"}],
            "limit": 50
        }))
        .unwrap();
        request.tenant_id = Some("t1".into());

        let compiled = builder(Translator::tenant_scoped()).execute(&request).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT topic, count(*) AS total FROM events \
             WHERE tenant_id = ? AND timestamp >= ? AND event_type IN (?, ?) \
             GROUP BY topic ORDER BY total DESC LIMIT ?"
        );
        assert_eq!(
            compiled.args,
            vec![
                Value::from("t1"),
                Value::from("2024-01-01 00:00:00"),
                Value::from("click"),
                Value::from("view"),
                Value::UInt(50),
            ]
        );
    }

    #[test]
    fn schema_errors_stop_before_translation() {
        let request = QueryAstRequest::default();
        let err = builder(Translator::new()).execute(&request).unwrap_err();
        assert!(matches!(err, QueryError::SchemaValidationFailed { .. }));
    }

    #[test]
    fn missing_tenant_is_a_where_failure() {
        let request: QueryAstRequest =
            serde_json::from_value(json!({"select": ["a"], "from": "logs"})).unwrap();
        let err = builder(Translator::tenant_scoped())
            .execute(&request)
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Translate(TranslateError::WhereTranslationFailed(_))
        ));
    }
}
