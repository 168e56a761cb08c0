use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CustomDbRow, column_index};
use crate::types::RowValues;

/// A result set from a database query
///
/// This struct represents the result of a database query,
/// containing the rows returned by the query and metadata.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// The number of rows affected (for DML statements)
    pub rows_affected: usize,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Create a result set whose rows will share `column_names`.
    #[must_use]
    pub fn with_columns<S: Into<String>>(column_names: impl IntoIterator<Item = S>) -> ResultSet {
        let mut rs = ResultSet::default();
        rs.set_column_names(Arc::new(column_names.into_iter().map(Into::into).collect()));
        rs
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(Arc::new(column_index(&column_names)));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row built from the shared column names.
    ///
    /// Ignored when no column names have been set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(column_names), Some(cache)) = (&self.column_names, &self.column_index_cache)
        {
            let row = CustomDbRow::with_cache(column_names.clone(), row_values, cache.clone());
            self.results.push(row);
            self.rows_affected += 1;
        }
    }

    /// Add a row to the result set
    pub fn add_row(&mut self, row: CustomDbRow) {
        if self.column_names.is_none() {
            self.column_names = Some(row.column_names.clone());
            self.column_index_cache = Some(row.column_index_cache.clone());
        }

        self.results.push(row);
        self.rows_affected += 1;
    }

    /// First row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&CustomDbRow> {
        self.results.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut rs = ResultSet::with_columns(["a", "b"]);
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Int(2)]);
        rs.add_row_values(vec![RowValues::Int(3), RowValues::Int(4)]);

        assert_eq!(rs.len(), 2);
        assert_eq!(rs.rows_affected, 2);
        assert!(Arc::ptr_eq(
            &rs.results[0].column_names,
            &rs.results[1].column_names
        ));
        assert_eq!(rs.results[1].get("b"), Some(&RowValues::Int(4)));
    }

    #[test]
    fn add_row_values_without_columns_is_ignored() {
        let mut rs = ResultSet::with_capacity(4);
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty());
        assert!(rs.first().is_none());
    }

    #[test]
    fn add_row_adopts_the_first_rows_columns() {
        let mut rs = ResultSet::default();
        assert!(rs.get_column_names().is_none());

        let columns = Arc::new(vec!["id".to_string(), "name".to_string()]);
        rs.add_row(CustomDbRow::new(
            columns.clone(),
            vec![RowValues::Int(1), RowValues::Text("Marc".into())],
        ));
        assert_eq!(rs.get_column_names(), Some(&columns));

        // later rows reuse the adopted names
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("Lea".into())]);
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.rows_affected, 2);
        assert_eq!(rs.results[1].get("name"), Some(&RowValues::Text("Lea".into())));
    }
}
