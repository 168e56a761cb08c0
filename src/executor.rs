use async_trait::async_trait;

use crate::context::TxTarget;
use crate::error::SpannerMiddlewareError;
use crate::results::ResultSet;
use crate::statement::Statement;

/// The client that actually talks to the query engine.
///
/// Implementations own the network round trip and the transaction primitives;
/// [`crate::Db`] decides which transaction a statement runs against.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Handle for a read-only transaction.
    type ReadOnlyTx: Send + Sync;
    /// Handle for a read-write transaction.
    type ReadWriteTx: Send + Sync;

    /// Run a query and collect its rows.
    ///
    /// `TxTarget::Single` asks for a single-use read outside any transaction.
    async fn query(
        &self,
        target: TxTarget<'_, Self::ReadOnlyTx, Self::ReadWriteTx>,
        stmt: &Statement,
    ) -> Result<ResultSet, SpannerMiddlewareError>;

    /// Run a DML statement inside `tx` and return the affected row count.
    async fn update(
        &self,
        tx: &Self::ReadWriteTx,
        stmt: &Statement,
    ) -> Result<usize, SpannerMiddlewareError>;

    async fn begin_read_write(&self) -> Result<Self::ReadWriteTx, SpannerMiddlewareError>;

    async fn commit(&self, tx: &Self::ReadWriteTx) -> Result<(), SpannerMiddlewareError>;

    async fn rollback(&self, tx: &Self::ReadWriteTx) -> Result<(), SpannerMiddlewareError>;

    async fn begin_read_only(&self) -> Result<Self::ReadOnlyTx, SpannerMiddlewareError>;

    /// Release a read-only transaction.
    async fn end_read_only(&self, _tx: &Self::ReadOnlyTx) {}

    /// Release the client.
    async fn close(&self) -> Result<(), SpannerMiddlewareError> {
        Ok(())
    }
}
