//! Streamly Query Layer
//!
//! Clients describe analytical queries as a JSON AST instead of raw SQL. This
//! crate checks that document, turns it into parameterized SQL and runs it.
//!
//! ## Pipeline
//!
//! - **Validate** - [`AstValidator`] checks the document against the
//!   embedded JSON Schema held in a [`SchemaRegistry`].
//! - **Translate** - [`Translator`] maps each clause onto [`QueryBuilder`]
//!   calls, optionally scoping everything to the caller's tenant.
//! - **Build** - [`QueryBuilder::build`] renders SQL with `?` placeholders
//!   and the matching argument list.
//! - **Execute** - [`QueryUseCase::sync_query`] applies defaults, compiles
//!   and hands the statement to a [`QueryRepository`].
//!
//! Identifiers are spliced into the SQL text, so both the schema and the
//! translator restrict them to `[A-Za-z_][A-Za-z0-9_.]*`. Values are never
//! spliced.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use query::{AstBuilder, QueryAstRequest, SchemaRegistry, Translator};
//!
//! let registry = Arc::new(SchemaRegistry::with_embedded_schema().unwrap());
//! let builder = AstBuilder::with_registry(registry, Translator::new());
//!
//! let request: QueryAstRequest = serde_json::from_str(
//!     r#"{"select": ["topic"], "from": "events", "where": [{"field": "topic", "op": "=", "value": "orders"}]}"#,
//! ).unwrap();
//!
//! let compiled = builder.execute(&request).unwrap();
//! assert_eq!(compiled.sql, "SELECT topic FROM events WHERE topic = ?");
//! assert_eq!(compiled.args.len(), 1);
//! ```

mod ast;
mod ast_builder;
mod builder;
mod config;
mod error;
mod repository;
mod translator;
mod usecase;
mod validator;

pub use crate::ast::{
    AggregateFunction, Datasource, GroupByClause, OrderByClause, QueryAstRequest, QueryResponse,
    SelectClause, TimeRange, TimeWindow, WhereClause,
};
pub use crate::ast_builder::{AstBuilder, CompiledQuery};
pub use crate::builder::{
    is_allowed_operator, BuildError, OrderByExpr, QueryBuilder, SelectExpr, SqlComponents,
    WhereExpr, ALLOWED_OPERATORS,
};
pub use crate::config::{QueryConfig, QueryConfigError};
pub use crate::error::{QueryError, SchemaError};
pub use crate::repository::{DriverQueryRepository, QueryRepository};
pub use crate::translator::{ClauseError, TranslateError, Translator};
pub use crate::usecase::{apply_defaults, QueryUseCase};
pub use crate::validator::{AstValidator, SchemaRegistry, QUERY_AST_SCHEMA, QUERY_AST_SCHEMA_KEY};
