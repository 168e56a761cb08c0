//! The `Db` facade: bind, resolve the transaction, execute, scan.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::config::DbOptions;
use crate::context::{ExecutionContext, TxKind};
use crate::error::SpannerMiddlewareError;
use crate::executor::QueryExecutor;
use crate::results::ResultSet;
use crate::scan::{scan_all, scan_one};
use crate::statement::{Statement, bind_positional, bind_structured};
use crate::types::RowValues;

/// Execution context whose handles match executor `E`.
pub type DbContext<E> =
    ExecutionContext<<E as QueryExecutor>::ReadOnlyTx, <E as QueryExecutor>::ReadWriteTx>;

/// A query executor plus the options it was opened with.
///
/// Every operation takes the caller's [`ExecutionContext`]: reads run inside the
/// transaction attached to it (read-only first, then read-write) or as a single
/// isolated read, writes run inside the attached read-write transaction or in one
/// opened and committed for that call.
pub struct Db<E: QueryExecutor> {
    executor: E,
    options: DbOptions,
}

impl<E: QueryExecutor> Db<E> {
    /// Wrap an already connected executor with default options.
    pub fn new(executor: E) -> Self {
        Self::with_options(executor, DbOptions::default())
    }

    pub fn with_options(executor: E, options: DbOptions) -> Self {
        Self { executor, options }
    }

    /// Validate `options`, wrap `executor`, and ping the database.
    ///
    /// # Errors
    /// Returns `ConfigError` for invalid options, or the ping failure.
    pub async fn open(
        ctx: &DbContext<E>,
        executor: E,
        options: DbOptions,
    ) -> Result<Self, SpannerMiddlewareError> {
        let path = options.validate()?;
        info!(database = %path, "opening database");

        let db = Self::with_options(executor, options);
        db.ping(ctx).await?;
        Ok(db)
    }

    #[must_use]
    pub fn options(&self) -> &DbOptions {
        &self.options
    }

    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// A fresh context with no transaction attached.
    #[must_use]
    pub fn context(&self) -> DbContext<E> {
        ExecutionContext::background()
    }

    /// Run `SELECT 1` and check the answer.
    ///
    /// # Errors
    /// Returns `BadConnection` if the query succeeds with a zero result, or the query error.
    pub async fn ping(&self, ctx: &DbContext<E>) -> Result<(), SpannerMiddlewareError> {
        let mut n: i64 = 0;
        self.get(ctx, &mut n, "SELECT 1", &[]).await?;
        if n == 0 {
            return Err(SpannerMiddlewareError::BadConnection);
        }
        Ok(())
    }

    /// Query with positional arguments and append every row to `dest`.
    ///
    /// # Errors
    /// Returns binding, execution, or row mapping errors.
    pub async fn select<T: DeserializeOwned>(
        &self,
        ctx: &DbContext<E>,
        dest: &mut Vec<T>,
        sql: &str,
        args: &[RowValues],
    ) -> Result<(), SpannerMiddlewareError> {
        let stmt = bind_positional(sql, args)?;
        self.select_stmt(ctx, dest, &stmt).await
    }

    /// Query with a map or record argument and append every row to `dest`.
    ///
    /// # Errors
    /// Returns binding, execution, or row mapping errors.
    pub async fn named_select<T, A>(
        &self,
        ctx: &DbContext<E>,
        dest: &mut Vec<T>,
        sql: &str,
        arg: &A,
    ) -> Result<(), SpannerMiddlewareError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let stmt = bind_structured(sql, arg)?;
        self.select_stmt(ctx, dest, &stmt).await
    }

    /// Run a bound statement and append every row to `dest`.
    ///
    /// # Errors
    /// Returns execution or row mapping errors.
    pub async fn select_stmt<T: DeserializeOwned>(
        &self,
        ctx: &DbContext<E>,
        dest: &mut Vec<T>,
        stmt: &Statement,
    ) -> Result<(), SpannerMiddlewareError> {
        let rs = self.query_stmt(ctx, stmt).await?;
        scan_all(&rs.results, dest)
    }

    /// Query with positional arguments and scan the first row into `dest`.
    ///
    /// # Errors
    /// Returns `NoRows` if the result is empty, or binding, execution, or mapping errors.
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &DbContext<E>,
        dest: &mut T,
        sql: &str,
        args: &[RowValues],
    ) -> Result<(), SpannerMiddlewareError> {
        let stmt = bind_positional(sql, args)?;
        self.get_stmt(ctx, dest, &stmt).await
    }

    /// Query with a map or record argument and scan the first row into `dest`.
    ///
    /// # Errors
    /// Returns `NoRows` if the result is empty, or binding, execution, or mapping errors.
    pub async fn named_get<T, A>(
        &self,
        ctx: &DbContext<E>,
        dest: &mut T,
        sql: &str,
        arg: &A,
    ) -> Result<(), SpannerMiddlewareError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let stmt = bind_structured(sql, arg)?;
        self.get_stmt(ctx, dest, &stmt).await
    }

    /// Run a bound statement and scan the first row into `dest`.
    ///
    /// # Errors
    /// Returns `NoRows` if the result is empty, or execution or mapping errors.
    pub async fn get_stmt<T: DeserializeOwned>(
        &self,
        ctx: &DbContext<E>,
        dest: &mut T,
        stmt: &Statement,
    ) -> Result<(), SpannerMiddlewareError> {
        let rs = self.query_stmt(ctx, stmt).await?;
        let row = rs.first().ok_or(SpannerMiddlewareError::NoRows)?;
        scan_one(row, dest)
    }

    /// Query with positional arguments and return the raw rows.
    ///
    /// # Errors
    /// Returns binding or execution errors.
    pub async fn query(
        &self,
        ctx: &DbContext<E>,
        sql: &str,
        args: &[RowValues],
    ) -> Result<ResultSet, SpannerMiddlewareError> {
        let stmt = bind_positional(sql, args)?;
        self.query_stmt(ctx, &stmt).await
    }

    /// Run a bound statement against the transaction resolved from `ctx`.
    ///
    /// # Errors
    /// Returns the executor's error unchanged, or `Cancelled`.
    pub async fn query_stmt(
        &self,
        ctx: &DbContext<E>,
        stmt: &Statement,
    ) -> Result<ResultSet, SpannerMiddlewareError> {
        let target = ctx.resolve();
        self.log_statement(stmt, target.kind());
        cancellable(ctx, self.executor.query(target, stmt)).await
    }

    /// Execute a DML statement with positional arguments.
    ///
    /// # Errors
    /// Returns binding or execution errors.
    pub async fn exec(
        &self,
        ctx: &DbContext<E>,
        sql: &str,
        args: &[RowValues],
    ) -> Result<usize, SpannerMiddlewareError> {
        let stmt = bind_positional(sql, args)?;
        self.exec_stmt(ctx, &stmt).await
    }

    /// Execute a DML statement with a map or record argument.
    ///
    /// # Errors
    /// Returns binding or execution errors.
    pub async fn named_exec<A: Serialize + ?Sized>(
        &self,
        ctx: &DbContext<E>,
        sql: &str,
        arg: &A,
    ) -> Result<usize, SpannerMiddlewareError> {
        let stmt = bind_structured(sql, arg)?;
        self.exec_stmt(ctx, &stmt).await
    }

    /// Execute a bound DML statement and return the affected row count.
    ///
    /// Runs inside the read-write transaction attached to `ctx`, which is left open.
    /// Without one, the statement gets its own transaction, committed on success and
    /// rolled back on failure.
    ///
    /// # Errors
    /// Returns the update, commit, or begin error.
    pub async fn exec_stmt(
        &self,
        ctx: &DbContext<E>,
        stmt: &Statement,
    ) -> Result<usize, SpannerMiddlewareError> {
        if let Some(tx) = ctx.read_write() {
            return self.update(ctx, tx, stmt).await;
        }
        if ctx.read_only().is_some() {
            debug!("read-only transaction in context; write gets its own read-write transaction");
        }

        self.tx_pipeline(ctx, move |tx_ctx| async move {
            match tx_ctx.read_write() {
                Some(tx) => self.update(&tx_ctx, tx, stmt).await,
                None => Err(SpannerMiddlewareError::Other(
                    "pipeline context lost its transaction".to_string(),
                )),
            }
        })
        .await
    }

    /// Run `callback` inside a read-write transaction.
    ///
    /// The callback receives a child of `ctx` carrying the transaction; every call
    /// made with it joins the transaction. `Ok` commits, `Err` rolls back. Aborted
    /// transactions are re-run up to `DbOptions::transaction_attempts` times. When
    /// `ctx` already carries a read-write transaction the callback joins it and
    /// nothing is committed here.
    ///
    /// # Errors
    /// Returns the callback's error, or a begin/commit failure.
    #[instrument(skip_all)]
    pub async fn tx_pipeline<F, Fut, T>(
        &self,
        ctx: &DbContext<E>,
        mut callback: F,
    ) -> Result<T, SpannerMiddlewareError>
    where
        F: FnMut(DbContext<E>) -> Fut,
        Fut: Future<Output = Result<T, SpannerMiddlewareError>>,
    {
        if ctx.read_write().is_some() {
            debug!("joining read-write transaction from context");
            return callback(ctx.clone()).await;
        }

        let attempts = self.options.transaction_attempts.max(1);
        let mut attempt = 1;
        loop {
            let tx = Arc::new(cancellable(ctx, self.executor.begin_read_write()).await?);
            debug!(attempt, "read-write transaction started");

            let result = callback(ctx.attach_read_write(Arc::clone(&tx))).await;
            match self.finish_read_write(ctx, &tx, result).await {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(attempt, error = %err, "read-write transaction aborted, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Run `callback` inside a read-only transaction, giving every read in it the
    /// same snapshot. Joins a read-only transaction already attached to `ctx`.
    ///
    /// # Errors
    /// Returns the begin failure or the callback's error.
    #[instrument(skip_all)]
    pub async fn read_only_pipeline<F, Fut, T>(
        &self,
        ctx: &DbContext<E>,
        callback: F,
    ) -> Result<T, SpannerMiddlewareError>
    where
        F: FnOnce(DbContext<E>) -> Fut,
        Fut: Future<Output = Result<T, SpannerMiddlewareError>>,
    {
        if ctx.read_only().is_some() {
            return callback(ctx.clone()).await;
        }

        let tx = Arc::new(cancellable(ctx, self.executor.begin_read_only()).await?);
        debug!("read-only transaction started");
        let result = callback(ctx.attach_read_only(Arc::clone(&tx))).await;
        self.executor.end_read_only(&tx).await;
        result
    }

    /// Release the executor.
    ///
    /// # Errors
    /// Returns the executor's close error.
    pub async fn close(&self) -> Result<(), SpannerMiddlewareError> {
        self.executor.close().await
    }

    async fn update(
        &self,
        ctx: &DbContext<E>,
        tx: &E::ReadWriteTx,
        stmt: &Statement,
    ) -> Result<usize, SpannerMiddlewareError> {
        self.log_statement(stmt, TxKind::ReadWrite);
        let rows = cancellable(ctx, self.executor.update(tx, stmt)).await?;
        debug!(rows, "update applied");
        Ok(rows)
    }

    async fn finish_read_write<T>(
        &self,
        ctx: &DbContext<E>,
        tx: &E::ReadWriteTx,
        result: Result<T, SpannerMiddlewareError>,
    ) -> Result<T, SpannerMiddlewareError> {
        // Commit and rollback are not raced against the token: the pipeline that
        // opened `tx` always finishes it.
        let value = match result {
            Ok(_) if ctx.is_cancelled() => {
                self.rollback(tx).await;
                return Err(SpannerMiddlewareError::Cancelled);
            }
            Ok(value) => value,
            Err(err) => {
                self.rollback(tx).await;
                debug!(error = %err, "read-write transaction rolled back");
                return Err(err);
            }
        };

        match self.executor.commit(tx).await {
            Ok(()) => {
                debug!("read-write transaction committed");
                Ok(value)
            }
            // an aborted transaction is already discarded by the engine
            Err(err) if err.is_retryable() => Err(err),
            Err(err) => {
                self.rollback(tx).await;
                debug!(error = %err, "commit failed, read-write transaction rolled back");
                Err(err)
            }
        }
    }

    async fn rollback(&self, tx: &E::ReadWriteTx) {
        if let Err(rollback_err) = self.executor.rollback(tx).await {
            warn!(error = %rollback_err, "rollback failed");
        }
    }

    fn log_statement(&self, stmt: &Statement, tx: TxKind) {
        if self.options.log_statements {
            debug!(statement = %stmt, ?tx, "executing statement");
        }
    }
}

async fn cancellable<RO, RW, T>(
    ctx: &ExecutionContext<RO, RW>,
    fut: impl Future<Output = Result<T, SpannerMiddlewareError>>,
) -> Result<T, SpannerMiddlewareError> {
    tokio::select! {
        biased;
        () = ctx.cancellation().cancelled() => Err(SpannerMiddlewareError::Cancelled),
        result = fut => result,
    }
}
