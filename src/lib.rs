//! Data-access middleware for a transactional SQL store that uses `@name`
//! placeholders.
//!
//! The crate covers three concerns:
//!
//! - **Binding**: [`bind_positional`] zips positional values onto the placeholders of a
//!   SQL template; [`bind_structured`] turns the entries of a map or the fields of a
//!   record into named parameters.
//! - **Scanning**: [`scan_all`] and [`scan_one`] map result rows into any
//!   `serde::Deserialize` destination: records by column name, maps keyed by column,
//!   tuples by position, scalars from one-column rows.
//! - **Transaction resolution**: an [`ExecutionContext`] carries at most one
//!   transaction handle; [`Db`] runs every statement against it, or opens one for the
//!   call when none is attached.
//!
//! The network client sits behind [`QueryExecutor`].
//!
//! ```rust
//! use serde::Deserialize;
//! use spanner_middleware::prelude::*;
//! use spanner_middleware::test_utils::{MemoryExecutor, create_result_set};
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Singer {
//!     singer_id: i64,
//!     first_name: String,
//! }
//!
//! # tokio::runtime::Runtime::new()?.block_on(async {
//! let executor = MemoryExecutor::new();
//! executor.on_query(
//!     "SELECT SingerId, FirstName FROM Singers WHERE SingerId = @id",
//!     create_result_set(
//!         &["SingerId", "FirstName"],
//!         vec![vec![RowValues::Int(1), RowValues::Text("Marc".into())]],
//!     ),
//! );
//!
//! let db = Db::new(executor);
//! let ctx = db.context();
//! let mut singer = Singer { singer_id: 0, first_name: String::new() };
//! db.get(
//!     &ctx,
//!     &mut singer,
//!     "SELECT SingerId, FirstName FROM Singers WHERE SingerId = @id",
//!     &[RowValues::Int(1)],
//! )
//! .await?;
//! assert_eq!(singer.first_name, "Marc");
//! # Ok::<(), SpannerMiddlewareError>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod results;
pub mod scan;
pub mod statement;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{DatabasePath, DbArgs, DbOptions};
pub use context::{
    ExecutionContext, TxHandle, TxKind, TxTarget, attach_transaction, resolve_transaction,
};
pub use db::{Db, DbContext};
pub use error::SpannerMiddlewareError;
pub use executor::QueryExecutor;
pub use results::{CustomDbRow, ResultSet};
pub use scan::{scan_all, scan_one};
pub use statement::{
    Statement, bind_map, bind_positional, bind_structured, extract_parameter_names,
};
pub use types::RowValues;
