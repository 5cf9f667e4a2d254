//! Interfaces exchanged with the transaction runtime.
//!
//! The surrounding runtime owns the unit-of-work lifecycle: it resolves
//! metadata for each transactional invocation, drives the matching
//! handler's hooks in a fixed order and consults an exception handler when
//! the body fails. This module declares exactly those seams; everything
//! else in the crate implements them.

use crate::redis::context::ExecutionContext;
use crate::redis::error::{Error, Result};
use crate::redis::pipeline::RedisPipeline;
use crate::redis::transaction::RedisTransaction;

/// The two transaction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// MULTI/EXEC issued directly on the acquired connection.
    Direct,
    /// Commands buffered locally, one MULTI/EXEC round trip at commit.
    Pipelined,
}

/// Declares the Redis flavor of a transactional unit of work: which named
/// client it runs on and whether it uses the pipelined strategy.
///
/// Attached explicitly to an invocation by the caller; an explicit
/// declaration always overrides the runtime's ambient defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redis {
    backend: String,
    pipelined: bool,
}

impl Redis {
    /// Run on the named client with the direct strategy.
    pub fn client(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            pipelined: false,
        }
    }

    /// Run on the named client with the pipelined strategy.
    pub fn pipelined(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            pipelined: true,
        }
    }

    /// The declared client name.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Whether the pipelined strategy was requested.
    pub fn is_pipelined(&self) -> bool {
        self.pipelined
    }
}

/// One transactional invocation as seen by the runtime's resolvers.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    /// Label identifying the unit of work, used in error reports.
    pub unit: &'a str,
    /// The explicit declaration attached to the call, if any.
    pub redis: Option<&'a Redis>,
}

/// The exception-handling capability a unit of work requires. The registry
/// binds it to the concrete per-backend handler, when one is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionHandlerKind {
    /// The per-client [`RedisExceptionHandler`] binding.
    Redis,
}

/// Resolved description of one unit of work: which backend it runs on,
/// which handler variant drives it and how exceptions are handled.
///
/// Built once by a resolver, consumed by the runtime, never mutated
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionMetadata {
    /// The resolved backend name.
    pub resource: Option<String>,
    /// The resolved handler variant.
    pub handler: Option<HandlerKind>,
    /// The exception-handling capability to bind.
    pub exception_handler: Option<ExceptionHandlerKind>,
}

impl TransactionMetadata {
    /// Metadata with nothing resolved yet.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lifecycle hooks driven by the transaction runtime.
///
/// The runtime guarantees the invocation order
/// `initialize → create_transaction → begin → (body) → commit | rollback →
/// release → cleanup` within one unit of work, never reordering or
/// parallelizing the hooks, and invokes `cleanup` unconditionally so the
/// acquired connection is returned even when an earlier stage failed.
pub trait TransactionHandler {
    /// The transaction object handed to application code.
    type Transaction: Clone;

    /// Acquire a connection for the unit of work starting in `context`.
    fn initialize(
        &self,
        context: &ExecutionContext,
        metadata: &TransactionMetadata,
    ) -> Result<()>;

    /// Create the transaction object on the acquired connection.
    fn create_transaction(&self, context: &ExecutionContext) -> Result<Self::Transaction>;

    /// Begin the transaction, when creating it did not already do so.
    fn begin(&self, transaction: &Self::Transaction) -> Result<()>;

    /// Join an ongoing global (distributed) transaction.
    fn join_global_transaction(&self, context: &ExecutionContext) -> Result<()>;

    /// Make the queued work visible atomically.
    fn commit(&self, transaction: &Self::Transaction) -> Result<()>;

    /// Mark the transaction so it may only roll back.
    fn mark_rollback_only(&self, transaction: &Self::Transaction) -> Result<()>;

    /// Throw away the queued work.
    fn rollback(&self, transaction: &Self::Transaction) -> Result<()>;

    /// Release the transaction object.
    fn release(&self, transaction: &Self::Transaction) -> Result<()>;

    /// Return the unit of work's connection and drop its holder.
    fn cleanup(&self, context: &ExecutionContext) -> Result<()>;

    /// The transaction of the innermost active unit of work, if any; lets
    /// the runtime detect re-entrant invocations that should share it.
    fn current_transaction(&self, context: &ExecutionContext) -> Option<Self::Transaction>;
}

/// Resolves the metadata governing a unit of work from the call site's
/// declaration and the runtime's ambient defaults.
pub trait TransactionMetadataResolver {
    /// Produce metadata for `call_site`, or `None` when this resolver does
    /// not apply and another resolver may serve the call.
    fn resolve(
        &self,
        call_site: &CallSite<'_>,
        defaults: &TransactionMetadata,
    ) -> Result<Option<TransactionMetadata>>;
}

/// The transaction object handed to an exception handler.
#[derive(Debug, Clone, Copy)]
pub enum ActiveTransaction<'a> {
    /// A direct MULTI/EXEC transaction.
    Direct(&'a RedisTransaction),
    /// A buffered pipeline transaction.
    Pipelined(&'a RedisPipeline),
    /// The failure happened before any transaction object existed.
    None,
}

/// Decides whether an error raised inside a unit of work counts as handled.
///
/// Bound per client name (none by default) and invoked by the surrounding
/// runtime after the error has propagated — never by this crate.
pub trait RedisExceptionHandler: Send + Sync {
    /// Returns `true` when the error was handled and must not propagate
    /// further.
    fn handle(
        &self,
        error: &Error,
        metadata: &TransactionMetadata,
        transaction: ActiveTransaction<'_>,
    ) -> bool;
}
