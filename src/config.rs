use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::Args;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SpannerMiddlewareError;

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "projects/sandbox/instances/sandbox/databases/sandbox";

static DATABASE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^projects/([^/]+)/instances/([^/]+)/databases/([^/]+)$")
        .expect("database path pattern is valid")
});

/// Fully qualified database name: `projects/P/instances/I/databases/D`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabasePath {
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl DatabasePath {
    /// Parse a fully qualified database name.
    ///
    /// # Errors
    /// Returns `ConfigError` if `uri` does not have the expected shape.
    pub fn parse(uri: &str) -> Result<Self, SpannerMiddlewareError> {
        let caps = DATABASE_PATH
            .captures(uri)
            .ok_or_else(|| SpannerMiddlewareError::ConfigError(format!("invalid database {uri}")))?;
        Ok(Self {
            project: caps[1].to_string(),
            instance: caps[2].to_string(),
            database: caps[3].to_string(),
        })
    }

    /// `projects/P/instances/I`
    #[must_use]
    pub fn instance_path(&self) -> String {
        format!("projects/{}/instances/{}", self.project, self.instance)
    }
}

impl FromStr for DatabasePath {
    type Err = SpannerMiddlewareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DatabasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/databases/{}", self.instance_path(), self.database)
    }
}

/// Options for [`crate::Db::open`].
///
/// ```rust
/// use spanner_middleware::config::DbOptions;
///
/// let options = DbOptions::default()
///     .with_database("projects/p/instances/i/databases/music")
///     .with_transaction_attempts(5);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbOptions {
    /// Fully qualified database name.
    pub database: String,
    /// How many times a read-write pipeline runs before an abort is returned.
    pub transaction_attempts: u32,
    /// Log bound statements at `debug` level before execution.
    pub log_statements: bool,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            transaction_attempts: 3,
            log_statements: true,
        }
    }
}

impl DbOptions {
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn with_transaction_attempts(mut self, attempts: u32) -> Self {
        self.transaction_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Check the options before a client is built from them.
    ///
    /// # Errors
    /// Returns `ConfigError` for a malformed database name or zero transaction attempts.
    pub fn validate(&self) -> Result<DatabasePath, SpannerMiddlewareError> {
        if self.transaction_attempts == 0 {
            return Err(SpannerMiddlewareError::ConfigError(
                "transaction_attempts must be at least 1".to_string(),
            ));
        }
        DatabasePath::parse(&self.database)
    }
}

/// Command-line / environment flags for embedding in a `clap` parser.
#[derive(Debug, Clone, Args)]
pub struct DbArgs {
    /// Fully qualified database name
    #[arg(long, env = "SPANNER_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Attempts for aborted read-write transactions
    #[arg(long, env = "SPANNER_TX_ATTEMPTS", default_value_t = 3)]
    pub transaction_attempts: u32,

    /// Do not log bound statements
    #[arg(long)]
    pub quiet_statements: bool,
}

impl From<DbArgs> for DbOptions {
    fn from(args: DbArgs) -> Self {
        DbOptions {
            database: args.database,
            transaction_attempts: args.transaction_attempts,
            log_statements: !args.quiet_statements,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        db: DbArgs,
    }

    #[test]
    fn parses_database_path() {
        let path = DatabasePath::parse("projects/p1/instances/i1/databases/music").unwrap();
        assert_eq!(path.project, "p1");
        assert_eq!(path.instance, "i1");
        assert_eq!(path.database, "music");
        assert_eq!(path.instance_path(), "projects/p1/instances/i1");
        assert_eq!(path.to_string(), "projects/p1/instances/i1/databases/music");
    }

    #[test]
    fn rejects_malformed_path() {
        let err = "projects/p1/databases/music".parse::<DatabasePath>().unwrap_err();
        assert!(matches!(err, SpannerMiddlewareError::ConfigError(_)));
    }

    #[test]
    fn default_options_are_valid() {
        let path = DbOptions::default().validate().unwrap();
        assert_eq!(path.database, "sandbox");
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = DbOptions::default()
            .with_transaction_attempts(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, SpannerMiddlewareError::ConfigError(_)));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: DbOptions =
            serde_json::from_str(r#"{"database": "projects/a/instances/b/databases/c"}"#)
                .unwrap();
        assert_eq!(options.transaction_attempts, 3);
        assert!(options.log_statements);
    }

    #[test]
    fn args_convert_to_options() {
        let cli = Cli::parse_from([
            "app",
            "--database",
            "projects/a/instances/b/databases/c",
            "--transaction-attempts",
            "2",
            "--quiet-statements",
        ]);
        let options = DbOptions::from(cli.db);
        assert_eq!(options.database, "projects/a/instances/b/databases/c");
        assert_eq!(options.transaction_attempts, 2);
        assert!(!options.log_statements);
    }
}
