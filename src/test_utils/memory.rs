use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::create_result_set;
use crate::context::{TxKind, TxTarget};
use crate::error::SpannerMiddlewareError;
use crate::executor::QueryExecutor;
use crate::results::ResultSet;
use crate::statement::Statement;
use crate::types::RowValues;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReadOnlyTx {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReadWriteTx {
    pub id: u64,
}

/// One call the executor received.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub statement: Statement,
    pub tx: TxKind,
    /// `None` for single-use reads.
    pub tx_id: Option<u64>,
    pub is_update: bool,
}

#[derive(Default)]
struct State {
    next_tx_id: u64,
    results: HashMap<String, ResultSet>,
    update_counts: HashMap<String, usize>,
    failures: HashMap<String, String>,
    aborted_commits: usize,
    failed_commits: usize,
    log: Vec<ExecutedStatement>,
    committed: Vec<u64>,
    rolled_back: Vec<u64>,
    ended_read_only: Vec<u64>,
    closed: bool,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_tx_id += 1;
        self.next_tx_id
    }
}

/// Scripted [`QueryExecutor`] that records every call.
///
/// Queries answer with the result set registered for their SQL text, or an empty
/// one. `SELECT 1` answers `1` until scripted otherwise.
pub struct MemoryExecutor {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl Default for MemoryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryExecutor {
    #[must_use]
    pub fn new() -> Self {
        let executor = Self {
            state: Mutex::new(State::default()),
            latency: None,
        };
        executor.on_query(
            "SELECT 1",
            create_result_set(&[""], vec![vec![RowValues::Int(1)]]),
        );
        executor
    }

    /// Delay every query and update by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer queries with SQL text `sql` with `rows`.
    pub fn on_query(&self, sql: &str, rows: ResultSet) {
        self.state().results.insert(sql.to_string(), rows);
    }

    /// Report `count` affected rows for updates with SQL text `sql`.
    pub fn on_update(&self, sql: &str, count: usize) {
        self.state().update_counts.insert(sql.to_string(), count);
    }

    /// Fail every query or update with SQL text `sql`.
    pub fn fail_on(&self, sql: &str, message: &str) {
        self.state()
            .failures
            .insert(sql.to_string(), message.to_string());
    }

    /// Make the next `count` commits fail with `Aborted`.
    pub fn abort_next_commits(&self, count: usize) {
        self.state().aborted_commits = count;
    }

    /// Make the next `count` commits fail with `ExecutionError`, leaving the
    /// transaction open.
    pub fn fail_next_commits(&self, count: usize) {
        self.state().failed_commits = count;
    }

    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state().log.clone()
    }

    #[must_use]
    pub fn committed(&self) -> Vec<u64> {
        self.state().committed.clone()
    }

    #[must_use]
    pub fn rolled_back(&self) -> Vec<u64> {
        self.state().rolled_back.clone()
    }

    #[must_use]
    pub fn ended_read_only(&self) -> Vec<u64> {
        self.state().ended_read_only.clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(
        &self,
        stmt: &Statement,
        tx: TxKind,
        tx_id: Option<u64>,
        is_update: bool,
    ) -> Result<(), SpannerMiddlewareError> {
        let mut state = self.state();
        if state.closed {
            return Err(SpannerMiddlewareError::ConnectionError(
                "executor is closed".to_string(),
            ));
        }
        state.log.push(ExecutedStatement {
            statement: stmt.clone(),
            tx,
            tx_id,
            is_update,
        });
        match state.failures.get(stmt.sql()) {
            Some(message) => Err(SpannerMiddlewareError::ExecutionError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    type ReadOnlyTx = MemoryReadOnlyTx;
    type ReadWriteTx = MemoryReadWriteTx;

    async fn query(
        &self,
        target: TxTarget<'_, MemoryReadOnlyTx, MemoryReadWriteTx>,
        stmt: &Statement,
    ) -> Result<ResultSet, SpannerMiddlewareError> {
        self.pause().await;
        let tx_id = match target {
            TxTarget::ReadOnly(tx) => Some(tx.id),
            TxTarget::ReadWrite(tx) => Some(tx.id),
            TxTarget::Single => None,
        };
        self.record(stmt, target.kind(), tx_id, false)?;
        Ok(self
            .state()
            .results
            .get(stmt.sql())
            .cloned()
            .unwrap_or_default())
    }

    async fn update(
        &self,
        tx: &MemoryReadWriteTx,
        stmt: &Statement,
    ) -> Result<usize, SpannerMiddlewareError> {
        self.pause().await;
        self.record(stmt, TxKind::ReadWrite, Some(tx.id), true)?;
        Ok(self
            .state()
            .update_counts
            .get(stmt.sql())
            .copied()
            .unwrap_or(0))
    }

    async fn begin_read_write(&self) -> Result<MemoryReadWriteTx, SpannerMiddlewareError> {
        Ok(MemoryReadWriteTx {
            id: self.state().next_id(),
        })
    }

    async fn commit(&self, tx: &MemoryReadWriteTx) -> Result<(), SpannerMiddlewareError> {
        let mut state = self.state();
        if state.aborted_commits > 0 {
            state.aborted_commits -= 1;
            state.rolled_back.push(tx.id);
            return Err(SpannerMiddlewareError::Aborted(format!(
                "transaction {} aborted",
                tx.id
            )));
        }
        if state.failed_commits > 0 {
            state.failed_commits -= 1;
            return Err(SpannerMiddlewareError::ExecutionError(format!(
                "commit of transaction {} failed",
                tx.id
            )));
        }
        state.committed.push(tx.id);
        Ok(())
    }

    async fn rollback(&self, tx: &MemoryReadWriteTx) -> Result<(), SpannerMiddlewareError> {
        self.state().rolled_back.push(tx.id);
        Ok(())
    }

    async fn begin_read_only(&self) -> Result<MemoryReadOnlyTx, SpannerMiddlewareError> {
        Ok(MemoryReadOnlyTx {
            id: self.state().next_id(),
        })
    }

    async fn end_read_only(&self, tx: &MemoryReadOnlyTx) {
        self.state().ended_read_only.push(tx.id);
    }

    async fn close(&self) -> Result<(), SpannerMiddlewareError> {
        self.state().closed = true;
        Ok(())
    }
}
