use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpannerMiddlewareError {
    #[error("query has {found} placeholders but {expected} arguments are provided")]
    ParameterCountMismatch { found: usize, expected: usize },

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("no rows in result set")]
    NoRows,

    #[error("bad connection")]
    BadConnection,

    #[error("row has {found} columns but the destination expects {expected}")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("Row mapping error: {0}")]
    RowMapping(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Transaction aborted: {0}")]
    Aborted(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SpannerMiddlewareError {
    /// Whether a read-write transaction that failed with this error may be re-run.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

// The row mapper is a serde `Deserializer`; custom messages from field and value
// visitors land here.
impl serde::de::Error for SpannerMiddlewareError {
    fn custom<T: Display>(msg: T) -> Self {
        SpannerMiddlewareError::RowMapping(msg.to_string())
    }
}

// Structured arguments are bound through a serde `Serializer`.
impl serde::ser::Error for SpannerMiddlewareError {
    fn custom<T: Display>(msg: T) -> Self {
        SpannerMiddlewareError::ParameterError(msg.to_string())
    }
}
