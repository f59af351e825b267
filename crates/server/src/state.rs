use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use dashmap::DashMap;
use ingest::{BatchEventRepository, IngestionUseCase};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use platform::{MemoryDatabase, OrganizationService, UnitOfWorkFactory, UserService};
use query::{QueryUseCase, SchemaRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage::{Driver, MemoryDriver};

/// Process-wide Prometheus recorder. `metrics` allows one global recorder.
static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_try_init(|| PrometheusBuilder::new().install_recorder())
        .inspect_err(|err| tracing::warn!(error = %err, "prometheus_recorder_unavailable"))
        .ok()
        .cloned()
}

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Columnar event store backing ingestion.
    pub events: Arc<dyn Driver>,

    pub ingestion: IngestionUseCase,
    pub queries: QueryUseCase,
    pub organizations: OrganizationService,
    pub users: UserService,

    /// Renders `/metrics`; `None` when metrics are disabled.
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Wire every use case over the in-memory backends.
    ///
    /// The in-memory event store cannot evaluate SQL, so queries run without
    /// a repository: they are validated and compiled, and return no rows.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Self::with_driver(config, Arc::new(MemoryDriver::new()))
    }

    /// Like [`ServerState::new`], with ingestion writing through `events`.
    pub fn with_driver(config: ServerConfig, events: Arc<dyn Driver>) -> ServerResult<Self> {
        let repository = BatchEventRepository::with_table(
            events.clone(),
            config.ingest.events_table.clone(),
        );
        let ingestion = IngestionUseCase::with_config(Arc::new(repository), config.ingest.clone());

        let registry = SchemaRegistry::with_embedded_schema()
            .map_err(|err| ServerError::Config(format!("query schema: {err}")))?;
        let queries = QueryUseCase::from_config(Arc::new(registry), None, config.query.clone());

        let database = MemoryDatabase::new();
        let factory = UnitOfWorkFactory::in_memory(&database);
        let users = UserService::new(factory.users());
        let organizations = OrganizationService::new(factory);

        let metrics = if config.metrics_enabled {
            prometheus_handle()
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            events,
            ingestion,
            queries,
            organizations,
            users,
            metrics,
        })
    }

    /// Tenant bound to `key`, or `None` for unknown keys.
    pub fn tenant_for_key(&self, key: &str) -> Option<String> {
        self.config.tenant_for(key).map(str::to_string)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
