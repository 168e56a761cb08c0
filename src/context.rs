//! Execution contexts and transaction resolution.
//!
//! An [`ExecutionContext`] is passed explicitly to every call. It may carry one
//! transaction handle, attached by a transaction pipeline for the duration of its
//! callback, and a cancellation token shared with every context derived from it.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Which kind of transaction a call resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    ReadOnly,
    ReadWrite,
    /// No transaction attached: reads use a single isolated snapshot.
    None,
}

/// A transaction handle to attach to a context.
pub enum TxHandle<RO, RW> {
    ReadOnly(Arc<RO>),
    ReadWrite(Arc<RW>),
}

/// Where a statement should run, as resolved from a context.
#[derive(Debug)]
pub enum TxTarget<'a, RO, RW> {
    ReadOnly(&'a RO),
    ReadWrite(&'a RW),
    /// Single-use read chosen by the executor.
    Single,
}

impl<RO, RW> TxTarget<'_, RO, RW> {
    #[must_use]
    pub fn kind(&self) -> TxKind {
        match self {
            TxTarget::ReadOnly(_) => TxKind::ReadOnly,
            TxTarget::ReadWrite(_) => TxKind::ReadWrite,
            TxTarget::Single => TxKind::None,
        }
    }
}

impl<RO, RW> Clone for TxTarget<'_, RO, RW> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<RO, RW> Copy for TxTarget<'_, RO, RW> {}

/// Request-scoped carrier of an optional transaction handle.
pub struct ExecutionContext<RO, RW> {
    read_only: Option<Arc<RO>>,
    read_write: Option<Arc<RW>>,
    cancellation: CancellationToken,
}

impl<RO, RW> ExecutionContext<RO, RW> {
    /// A context with no transaction and a fresh cancellation token.
    #[must_use]
    pub fn background() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// A context with no transaction, cancelled through `token`.
    #[must_use]
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            read_only: None,
            read_write: None,
            cancellation: token,
        }
    }

    /// Derive a child context carrying only `handle`.
    #[must_use]
    pub fn attach(&self, handle: TxHandle<RO, RW>) -> Self {
        let (read_only, read_write) = match handle {
            TxHandle::ReadOnly(tx) => (Some(tx), None),
            TxHandle::ReadWrite(tx) => (None, Some(tx)),
        };
        Self {
            read_only,
            read_write,
            cancellation: self.cancellation.clone(),
        }
    }

    #[must_use]
    pub fn attach_read_only(&self, tx: Arc<RO>) -> Self {
        self.attach(TxHandle::ReadOnly(tx))
    }

    #[must_use]
    pub fn attach_read_write(&self, tx: Arc<RW>) -> Self {
        self.attach(TxHandle::ReadWrite(tx))
    }

    /// Derive a child context with no transaction attached.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self::with_cancellation(self.cancellation.clone())
    }

    #[must_use]
    pub fn read_only(&self) -> Option<&RO> {
        self.read_only.as_deref()
    }

    #[must_use]
    pub fn read_write(&self) -> Option<&RW> {
        self.read_write.as_deref()
    }

    /// Resolve the transaction to run against: read-only first, then read-write.
    #[must_use]
    pub fn resolve(&self) -> TxTarget<'_, RO, RW> {
        if let Some(tx) = self.read_only() {
            return TxTarget::ReadOnly(tx);
        }
        if let Some(tx) = self.read_write() {
            return TxTarget::ReadWrite(tx);
        }
        TxTarget::Single
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl<RO, RW> Clone for ExecutionContext<RO, RW> {
    fn clone(&self) -> Self {
        Self {
            read_only: self.read_only.clone(),
            read_write: self.read_write.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<RO, RW> Default for ExecutionContext<RO, RW> {
    fn default() -> Self {
        Self::background()
    }
}

impl<RO, RW> fmt::Debug for ExecutionContext<RO, RW> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("tx", &self.resolve().kind())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Resolve which transaction `ctx` carries. See [`ExecutionContext::resolve`].
#[must_use]
pub fn resolve_transaction<RO, RW>(ctx: &ExecutionContext<RO, RW>) -> TxTarget<'_, RO, RW> {
    ctx.resolve()
}

/// Derive a child of `ctx` carrying `handle`. See [`ExecutionContext::attach`].
#[must_use]
pub fn attach_transaction<RO, RW>(
    ctx: &ExecutionContext<RO, RW>,
    handle: TxHandle<RO, RW>,
) -> ExecutionContext<RO, RW> {
    ctx.attach(handle)
}
