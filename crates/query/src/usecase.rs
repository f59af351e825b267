use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn, Instrument, Level};

use crate::ast::{QueryAstRequest, QueryResponse};
use crate::ast_builder::AstBuilder;
use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::repository::QueryRepository;
use crate::translator::Translator;
use crate::validator::SchemaRegistry;

/// Fill in what the caller left out: `limit` from config, `offset` 0 and
/// `DESC` for every ordering without a direction. Running it twice changes
/// nothing.
pub fn apply_defaults(request: &mut QueryAstRequest, config: &QueryConfig) {
    request.limit.get_or_insert(config.default_limit);
    request.offset.get_or_insert(0);
    for order in &mut request.order_by {
        if order.direction.is_empty() {
            order.direction = "DESC".to_string();
        }
    }
}

/// Defaults → compile → execute.
#[derive(Clone)]
pub struct QueryUseCase {
    builder: AstBuilder,
    repository: Option<Arc<dyn QueryRepository>>,
    config: QueryConfig,
}

impl QueryUseCase {
    pub fn new(builder: AstBuilder, repository: Option<Arc<dyn QueryRepository>>) -> Self {
        Self::with_config(builder, repository, QueryConfig::default())
    }

    pub fn with_config(
        builder: AstBuilder,
        repository: Option<Arc<dyn QueryRepository>>,
        config: QueryConfig,
    ) -> Self {
        Self {
            builder,
            repository,
            config,
        }
    }

    /// Wire a builder over `registry` with tenant scoping taken from `config`.
    pub fn from_config(
        registry: Arc<SchemaRegistry>,
        repository: Option<Arc<dyn QueryRepository>>,
        config: QueryConfig,
    ) -> Self {
        let translator = if config.tenant_scoped {
            Translator::tenant_scoped()
        } else {
            Translator::new()
        };
        Self::with_config(
            AstBuilder::with_registry(registry, translator),
            repository,
            config,
        )
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Compile and run `request`.
    ///
    /// Without a repository the query is still compiled (so every error is
    /// still reported) and an empty response is returned.
    pub async fn sync_query(
        &self,
        mut request: QueryAstRequest,
    ) -> Result<QueryResponse, QueryError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "query.sync_query",
            request_id = %request.request_id,
            tenant_id = request.tenant_id.as_deref().unwrap_or("")
        );

        async {
            apply_defaults(&mut request, &self.config);

            let compiled = self.builder.execute(&request).inspect_err(|err| {
                warn!(error = %err, "query_rejected");
            })?;

            let Some(repository) = &self.repository else {
                return Ok(QueryResponse::empty(request.request_id.as_str()));
            };

            let response = repository
                .execute_query(&request.request_id, &compiled)
                .await?;
            info!(
                rows = response.row_count,
                elapsed_micros = start.elapsed().as_micros(),
                "query_success"
            );
            Ok(response)
        }
        .instrument(span)
        .await
    }
}
