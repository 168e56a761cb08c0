use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use super::Statement;
use super::names::extract_parameter_names;
use super::ser::ParamsSerializer;
use crate::error::SpannerMiddlewareError;
use crate::types::RowValues;

/// Bind `args` to the placeholders of `sql` in order of appearance.
///
/// A placeholder name that repeats keeps its first position and takes the later
/// argument.
///
/// # Errors
/// Returns `ParameterCountMismatch` when the template has fewer placeholders than `args`.
pub fn bind_positional(
    sql: &str,
    args: &[RowValues],
) -> Result<Statement, SpannerMiddlewareError> {
    let names = extract_parameter_names(sql, Some(args.len()))?;

    let mut params = IndexMap::with_capacity(names.len());
    for (name, value) in names.into_iter().zip(args) {
        params.insert(name, value.clone());
    }

    Ok(Statement::with_params(sql, params))
}

/// Bind the entries of a map or the fields of a record as named parameters.
///
/// Keys and field names become parameter names. The parameter set is taken as-is:
/// it is not checked against the placeholders present in `sql`. Each value maps to
/// the closest [`RowValues`] variant; sequences and nested records become `JSON`.
///
/// ```rust
/// use serde::Serialize;
/// use spanner_middleware::prelude::*;
///
/// #[derive(Serialize)]
/// struct Album {
///     #[serde(rename = "AlbumID")]
///     album_id: i64,
///     #[serde(rename = "AlbumTitle")]
///     album_title: String,
/// }
///
/// let album = Album { album_id: 3, album_title: "Green".into() };
/// let stmt = bind_structured(
///     "INSERT INTO Albums (AlbumID, AlbumTitle) VALUES (@AlbumID, @AlbumTitle)",
///     &album,
/// )?;
/// assert_eq!(stmt.param("AlbumID"), Some(&RowValues::Int(3)));
/// # Ok::<(), SpannerMiddlewareError>(())
/// ```
///
/// # Errors
/// Returns `ParameterError` if `arg` is not a map or record, or if a value has no
/// lossless mapping: integers outside `i64` and non-finite floats.
pub fn bind_structured<A: Serialize + ?Sized>(
    sql: &str,
    arg: &A,
) -> Result<Statement, SpannerMiddlewareError> {
    let params = arg.serialize(ParamsSerializer)?;
    Ok(finish_structured(sql, params))
}

/// Bind already-typed values by name, without going through serde.
///
/// Same policy as [`bind_structured`].
pub fn bind_map<K, I>(sql: &str, params: I) -> Statement
where
    K: Into<String>,
    I: IntoIterator<Item = (K, RowValues)>,
{
    let params = params
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect();
    finish_structured(sql, params)
}

fn finish_structured(sql: &str, params: IndexMap<String, RowValues>) -> Statement {
    let stmt = Statement::with_params(sql, params);
    let unbound = stmt.unbound_placeholders();
    if !unbound.is_empty() {
        warn!(
            placeholders = ?unbound,
            "structured argument leaves placeholders without a value"
        );
    }
    stmt
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    #[allow(non_snake_case)]
    struct Pair {
        B: String,
        A: i64,
    }

    #[test]
    fn positional_binds_in_placeholder_order() {
        let stmt = bind_positional(
            "INSERT INTO Singers VALUES(@singer_id, @first_name, @last_name)",
            &[1_i64.into(), "Marc".into(), "Richards".into()],
        )
        .unwrap();

        let names: Vec<&str> = stmt.params().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["singer_id", "first_name", "last_name"]);
        assert_eq!(stmt.param("first_name"), Some(&RowValues::Text("Marc".into())));
    }

    #[test]
    fn positional_under_count_fails() {
        let err = bind_positional("WHERE a=@a", &[1_i64.into(), 2_i64.into()]).unwrap_err();
        assert!(matches!(
            err,
            SpannerMiddlewareError::ParameterCountMismatch {
                found: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn positional_ignores_extra_placeholders() {
        let stmt = bind_positional("@a @b @c", &[1_i64.into()]).unwrap();
        assert_eq!(stmt.params().len(), 1);
        assert_eq!(stmt.param("a"), Some(&RowValues::Int(1)));
    }

    #[test]
    fn positional_repeated_name_takes_last_value() {
        let stmt = bind_positional("@a @a", &[1_i64.into(), 2_i64.into()]).unwrap();
        assert_eq!(stmt.params().len(), 1);
        assert_eq!(stmt.param("a"), Some(&RowValues::Int(2)));
    }

    #[test]
    fn structured_record_fields_become_params() {
        let pair = Pair {
            B: "x".into(),
            A: 1,
        };
        let stmt = bind_structured("SELECT @A, @B", &pair).unwrap();

        assert_eq!(stmt.params().len(), 2);
        assert_eq!(stmt.param("A"), Some(&RowValues::Int(1)));
        assert_eq!(stmt.param("B"), Some(&RowValues::Text("x".into())));
    }

    #[test]
    fn structured_accepts_references_and_maps() {
        let mut map = HashMap::new();
        map.insert("id".to_string(), 7);
        let by_ref = &&map;
        let stmt = bind_structured("WHERE id=@id", by_ref).unwrap();
        assert_eq!(stmt.param("id"), Some(&RowValues::Int(7)));

        let mut values = BTreeMap::new();
        values.insert("flag", RowValues::Bool(true));
        let stmt = bind_structured("WHERE f=@flag", &values).unwrap();
        assert_eq!(stmt.param("flag"), Some(&RowValues::Bool(true)));
    }

    #[test]
    fn structured_does_not_check_placeholders() {
        let pair = Pair {
            B: "x".into(),
            A: 1,
        };
        let stmt = bind_structured("SELECT @C", &pair).unwrap();
        assert_eq!(stmt.params().len(), 2);
        assert_eq!(stmt.unbound_placeholders(), vec!["C"]);
    }

    #[test]
    fn structured_rejects_scalars() {
        let err = bind_structured("SELECT @a", &5).unwrap_err();
        assert!(matches!(err, SpannerMiddlewareError::ParameterError(_)));
    }

    #[test]
    fn bind_map_keeps_exact_variants() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        let stmt = bind_map("WHERE t=@t", [("t", RowValues::Timestamp(ts))]);
        assert_eq!(stmt.param("t"), Some(&RowValues::Timestamp(ts)));
    }

    #[test]
    fn structured_rejects_non_finite_floats() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut map = BTreeMap::new();
            map.insert("x", value);
            let err = bind_structured("SELECT @x", &map).unwrap_err();
            assert!(matches!(err, SpannerMiddlewareError::ParameterError(_)), "{value}");
        }
    }

    #[test]
    fn structured_rejects_integers_outside_i64() {
        let mut map = BTreeMap::new();
        map.insert("x", u64::MAX);
        let err = bind_structured("SELECT @x", &map).unwrap_err();
        assert!(matches!(err, SpannerMiddlewareError::ParameterError(_)));

        let mut map = BTreeMap::new();
        map.insert("x", i64::MAX as u64);
        let stmt = bind_structured("SELECT @x", &map).unwrap();
        assert_eq!(stmt.param("x"), Some(&RowValues::Int(i64::MAX)));
    }

    #[derive(Serialize)]
    struct Upload {
        created: RowValues,
        payload: RowValues,
        ratio: f32,
        tags: Vec<String>,
        note: Option<String>,
    }

    #[test]
    fn structured_keeps_timestamps_and_blobs() {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_milli_opt(3, 4, 5, 250))
            .unwrap();
        let upload = Upload {
            created: RowValues::Timestamp(ts),
            payload: RowValues::Blob(vec![0, 159, 255]),
            ratio: 0.5,
            tags: vec!["a".into(), "b".into()],
            note: None,
        };
        let stmt = bind_structured("INSERT INTO Uploads VALUES (@created, @payload)", &upload)
            .unwrap();

        assert_eq!(stmt.param("created"), Some(&RowValues::Timestamp(ts)));
        assert_eq!(stmt.param("payload"), Some(&RowValues::Blob(vec![0, 159, 255])));
        assert_eq!(stmt.param("ratio"), Some(&RowValues::Float(0.5)));
        assert_eq!(
            stmt.param("tags"),
            Some(&RowValues::JSON(serde_json::json!(["a", "b"])))
        );
        assert_eq!(stmt.param("note"), Some(&RowValues::Null));
    }

    #[test]
    fn structured_rejects_non_finite_floats_in_nested_values() {
        let mut map = BTreeMap::new();
        map.insert("xs", vec![1.0, f64::NAN]);
        let err = bind_structured("SELECT @xs", &map).unwrap_err();
        assert!(matches!(err, SpannerMiddlewareError::ParameterError(_)));
    }
}
