//! Convenient imports for common functionality.
//!
//! ```rust
//! use spanner_middleware::prelude::*;
//!
//! let stmt = bind_positional("SELECT * FROM Singers WHERE SingerId = @id", &[RowValues::Int(1)])?;
//! assert_eq!(stmt.param("id"), Some(&RowValues::Int(1)));
//! # Ok::<(), SpannerMiddlewareError>(())
//! ```

pub use crate::config::DbOptions;
pub use crate::context::{ExecutionContext, TxKind, TxTarget};
pub use crate::db::{Db, DbContext};
pub use crate::error::SpannerMiddlewareError;
pub use crate::executor::QueryExecutor;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::scan::{scan_all, scan_one};
pub use crate::statement::{
    Statement, bind_map, bind_positional, bind_structured, extract_parameter_names,
};
pub use crate::types::RowValues;
