//! Helpers for tests and benchmarks: row builders and an in-memory executor.

mod memory;

use std::sync::Arc;

use crate::results::{CustomDbRow, ResultSet};
use crate::types::RowValues;

pub use memory::{ExecutedStatement, MemoryExecutor, MemoryReadOnlyTx, MemoryReadWriteTx};

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

/// Build a result set from column names and row values.
#[must_use]
pub fn create_result_set(columns: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
    let mut rs = ResultSet::with_columns(columns.iter().copied());
    for values in rows {
        rs.add_row_values(values);
    }
    rs
}
