//! Bound statements and the binders that build them.
//!
//! A query template names its parameters with `@identifier` placeholders. Arguments
//! are attached either positionally ([`bind_positional`]), from a map or record
//! ([`bind_structured`]), or from ready-made values ([`bind_map`]).

mod bind;
mod names;
mod ser;

use std::fmt;

use indexmap::IndexMap;

use crate::types::RowValues;

pub use bind::{bind_map, bind_positional, bind_structured};
pub use names::extract_parameter_names;

/// A query template paired with its parameter values.
///
/// Parameters keep the order in which they were bound.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    sql: String,
    params: IndexMap<String, RowValues>,
}

impl Statement {
    /// A statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: IndexMap::new(),
        }
    }

    /// A statement with the given parameters.
    pub fn with_params(sql: impl Into<String>, params: IndexMap<String, RowValues>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &IndexMap<String, RowValues> {
        &self.params
    }

    /// Value bound to `name`, if any.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&RowValues> {
        self.params.get(name)
    }

    /// Placeholders in the template with no bound value, in order of first appearance.
    #[must_use]
    pub fn unbound_placeholders(&self) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        // `None` never fails
        let names = extract_parameter_names(&self.sql, None).unwrap_or_default();
        for name in names {
            if !self.params.contains_key(&name) && !missing.contains(&name) {
                missing.push(name);
            }
        }
        missing
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.sql)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_params_in_bind_order() {
        let stmt = bind_positional(
            "UPDATE t SET b=@b WHERE a=@a",
            &[RowValues::Text("x".into()), RowValues::Int(1)],
        )
        .unwrap();
        assert_eq!(
            stmt.to_string(),
            "UPDATE t SET b=@b WHERE a=@a {b: \"x\", a: 1}"
        );
    }

    #[test]
    fn unbound_placeholders_are_reported_once() {
        let stmt = Statement::new("SELECT @a, @b, @a");
        assert_eq!(stmt.unbound_placeholders(), vec!["a", "b"]);
    }
}
