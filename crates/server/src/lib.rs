//! Streamly Server - HTTP REST API for event ingestion and analytics
//!
//! Exposes the ingest, query and platform crates over HTTP:
//!
//! - **Ingestion**: batches of events written in one transaction
//! - **Queries**: JSON query ASTs compiled to parameterized SQL, scoped to
//!   the caller's tenant
//! - **Platform**: users, organizations and memberships
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! API keys map to tenants (`api_keys: { key: tenant }`); each key is rate
//! limited per minute.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `POST /v1/events/ingest` - Ingest a batch of events
//! - `POST /v1/queries` - Run a query AST
//! - `POST /v1/users` - Create a user
//! - `POST /v1/organizations` - Create an organization owned by `X-User-Id`
//! - `GET /v1/organizations` - List organizations
//! - `GET|PUT|DELETE /v1/organizations/{id}` - Read, rename, delete
//! - `GET|POST /v1/organizations/{id}/members` - List or add members

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{ServerConfig, DEMO_TENANT};
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use middleware::{RequestId, Tenant};
pub use server::{build_router, start_server};
pub use state::ServerState;
