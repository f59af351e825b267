//! Streamly storage boundary
//!
//! Everything that talks to the columnar store goes through the traits in this
//! crate. The ingest and query layers never see a concrete database client;
//! they hold an `Arc<dyn Driver>` and work with [`Value`]s and [`Rows`].
//!
//! ## What lives here
//!
//! - **Contracts** - [`Driver`] opens transactions and runs read queries,
//!   [`Transaction`] prepares and executes positional insert statements.
//! - **Values** - [`Value`] is the positional argument / cell type shared by
//!   the insert path and the query path.
//! - **In-memory backend** - [`MemoryDriver`] stages rows per transaction and
//!   appends them atomically on commit. Good enough for tests and for running
//!   the server without an external store.
//!
//! ## Example
//!
//! ```
//! use storage::{Driver, InsertStatement, MemoryDriver, Value};
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let driver = MemoryDriver::new();
//! let stmt = InsertStatement::new("events", ["tenant_id", "topic"]);
//!
//! let mut tx = driver.begin().await.unwrap();
//! let prepared = tx.prepare(&stmt).await.unwrap();
//! tx.execute(&prepared, &[Value::from("t1"), Value::from("orders")]).await.unwrap();
//! tx.commit().await.unwrap();
//!
//! assert_eq!(driver.row_count("events"), 1);
//! # });
//! # }
//! ```

mod driver;
mod error;
mod memory;
mod value;

pub use crate::driver::{Dialect, Driver, InsertStatement, PreparedStatement, Rows, Transaction};
pub use crate::error::StorageError;
pub use crate::memory::MemoryDriver;
pub use crate::value::Value;
