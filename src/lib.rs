//! Workspace umbrella crate for Streamly.
//!
//! Re-exports the member crates so callers can depend on one package, and
//! adds [`StreamlyConfig`], the YAML file that configures the ingest and
//! query pipelines of a deployment.
//!
//! ```
//! use std::sync::Arc;
//! use streamly::{BatchEventRepository, IngestionUseCase, MemoryDriver, StreamlyConfig};
//!
//! let config = StreamlyConfig::from_yaml("version: \"1.0\"\ningest:\n  max_batch_size: 100\n")
//!     .unwrap();
//!
//! let driver = Arc::new(MemoryDriver::new());
//! let repository = BatchEventRepository::with_table(driver, config.ingest.events_table.clone());
//! let usecase = IngestionUseCase::with_config(Arc::new(repository), config.ingest_config());
//! assert_eq!(usecase.config().max_batch_size, 100);
//! ```

pub mod config;

pub use config::{
    ConfigLoadError, IngestYamlConfig, QueryYamlConfig, StorageYamlConfig, StreamlyConfig,
};

pub use ingest::{
    BatchEventRepository, BatchIngestionRequest, BatchIngestionResponse, Event, EventIngestionData,
    EventRepository, IngestConfig, IngestError, IngestionStatus, IngestionUseCase,
};
pub use platform::{
    CreateOrganization, CreateUser, MemoryDatabase, Organization, OrganizationService,
    PlatformError, UnitOfWork, UnitOfWorkFactory, User, UserService,
};
pub use query::{
    AstBuilder, CompiledQuery, QueryAstRequest, QueryConfig, QueryError, QueryResponse,
    QueryUseCase, SchemaRegistry, Translator,
};
pub use server::{ServerConfig, ServerState, build_router, start_server};
pub use storage::{Driver, MemoryDriver, StorageError, Value};

/// Member crates, for everything not re-exported above.
pub mod crates {
    pub use ingest;
    pub use platform;
    pub use query;
    pub use server;
    pub use storage;
}
