use std::sync::LazyLock;

use regex::Regex;

use crate::error::SpannerMiddlewareError;

// ASCII word characters only.
static NAMED_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([0-9A-Za-z_]+)").expect("named parameter pattern is valid"));

/// Extract the names of `@identifier` placeholders from `sql`, in order of appearance.
///
/// With `expected = Some(n)` at most `n` placeholders are read and fewer than `n` is
/// an error. `None` extracts every placeholder without validation.
///
/// ```rust
/// use spanner_middleware::extract_parameter_names;
///
/// let names = extract_parameter_names("SELECT * FROM T WHERE a=@x AND b=@y", Some(2))?;
/// assert_eq!(names, vec!["x", "y"]);
/// # Ok::<(), spanner_middleware::SpannerMiddlewareError>(())
/// ```
///
/// # Errors
/// Returns `ParameterCountMismatch` when fewer than `expected` placeholders are present.
pub fn extract_parameter_names(
    sql: &str,
    expected: Option<usize>,
) -> Result<Vec<String>, SpannerMiddlewareError> {
    let limit = expected.unwrap_or(usize::MAX);
    let names: Vec<String> = NAMED_PARAM
        .captures_iter(sql)
        .take(limit)
        .map(|caps| caps[1].to_string())
        .collect();

    if let Some(expected) = expected
        && names.len() < expected
    {
        return Err(SpannerMiddlewareError::ParameterCountMismatch {
            found: names.len(),
            expected,
        });
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_order() {
        let names =
            extract_parameter_names("SELECT * FROM T WHERE a=@x AND b=@y", Some(2)).unwrap();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn keeps_duplicates_positionally() {
        let names = extract_parameter_names("@a, @b, @a", None).unwrap();
        assert_eq!(names, vec!["a", "b", "a"]);
    }

    #[test]
    fn stops_after_expected_count() {
        let names = extract_parameter_names("@a @b @c", Some(2)).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn zero_expected_reads_nothing() {
        let names = extract_parameter_names("@a @b", Some(0)).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn under_count_is_mismatch() {
        let err = extract_parameter_names("WHERE a=@a", Some(3)).unwrap_err();
        assert!(matches!(
            err,
            SpannerMiddlewareError::ParameterCountMismatch {
                found: 1,
                expected: 3
            }
        ));
        assert_eq!(
            err.to_string(),
            "query has 1 placeholders but 3 arguments are provided"
        );
    }

    #[test]
    fn identifier_stops_at_non_word_character() {
        let names = extract_parameter_names("x=@first_name1,y=@ä,z=@@w", None).unwrap();
        assert_eq!(names, vec!["first_name1", "w"]);
    }
}
