//! Row-to-destination mapping.
//!
//! Destinations are any `serde::Deserialize` type; the shape the type asks for picks
//! the strategy:
//!
//! | destination                  | how the row is read                                  |
//! |------------------------------|------------------------------------------------------|
//! | record (`#[derive(Deserialize)]` struct) | by column name, then ASCII case-insensitive |
//! | map (`HashMap`, `BTreeMap`)  | every column, keyed by column name                   |
//! | tuple / tuple struct         | by position, column count must equal the arity       |
//! | `Vec<_>`                     | by position, every column                            |
//! | scalar, `Option`, enum       | the single column of a one-column row                |
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use spanner_middleware::prelude::*;
//!
//! let row = CustomDbRow::new(
//!     Arc::new(vec!["SingerId".into(), "FirstName".into()]),
//!     vec![RowValues::Int(1), RowValues::Text("Marc".into())],
//! );
//! let mut pairs: Vec<(i64, String)> = Vec::new();
//! scan_all(std::slice::from_ref(&row), &mut pairs)?;
//! assert_eq!(pairs, vec![(1, "Marc".to_string())]);
//! # Ok::<(), SpannerMiddlewareError>(())
//! ```

mod row;
mod value;

use serde::de::DeserializeOwned;

use crate::error::SpannerMiddlewareError;
use crate::results::CustomDbRow;

pub(crate) use row::RowDeserializer;

/// Append one `T` per row to `dest`, in row order.
///
/// Use `Vec<Box<T>>` or `Vec<Arc<T>>` to collect references instead of values.
///
/// # Errors
/// Stops at the first row that cannot be mapped and returns its error; elements
/// appended for earlier rows stay in `dest`.
pub fn scan_all<T: DeserializeOwned>(
    rows: &[CustomDbRow],
    dest: &mut Vec<T>,
) -> Result<(), SpannerMiddlewareError> {
    dest.reserve(rows.len());
    for row in rows {
        dest.push(row.deserialize()?);
    }
    Ok(())
}

/// Overwrite `dest` with the contents of `row`.
///
/// Callers report a missing row as `NoRows` before getting here.
///
/// # Errors
/// Returns the mapping error; `dest` is left untouched in that case.
pub fn scan_one<T: DeserializeOwned>(
    row: &CustomDbRow,
    dest: &mut T,
) -> Result<(), SpannerMiddlewareError> {
    *dest = row.deserialize()?;
    Ok(())
}
