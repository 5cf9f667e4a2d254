//! The direct MULTI/EXEC transaction handler.

use crate::redis::connection::{ConnectionSource, RedisConnection};
use crate::redis::context::ExecutionContext;
use crate::redis::error::{Error, Result};
use crate::redis::link::RedisLink;
use crate::redis::spi::{TransactionHandler, TransactionMetadata};
use crate::redis::transaction::RedisTransaction;
use std::fmt;
use std::sync::Arc;

/// Drives units of work that issue MULTI directly on the acquired
/// connection, for one named client.
///
/// All direct handlers share one [`RedisLink`], so units of work nest
/// correctly within an execution context whichever client each of them
/// runs on.
pub struct RedisTransactionHandler {
    backend: String,
    link: Arc<RedisLink<RedisTransaction>>,
    source: Arc<dyn ConnectionSource>,
}

impl RedisTransactionHandler {
    /// Create the handler for `backend`, acquiring connections from `source`.
    pub fn new(
        backend: impl Into<String>,
        link: Arc<RedisLink<RedisTransaction>>,
        source: Arc<dyn ConnectionSource>,
    ) -> Self {
        Self {
            backend: backend.into(),
            link,
            source,
        }
    }

    /// The client this handler serves.
    pub fn backend(&self) -> &str {
        &self.backend
    }
}

impl TransactionHandler for RedisTransactionHandler {
    type Transaction = RedisTransaction;

    fn initialize(
        &self,
        context: &ExecutionContext,
        _metadata: &TransactionMetadata,
    ) -> Result<()> {
        let connection = self.source.acquire()?;
        self.link.push(context, RedisConnection::new(connection));
        log::trace!("acquired a connection for Redis client `{}`", self.backend);
        Ok(())
    }

    fn create_transaction(&self, context: &ExecutionContext) -> Result<RedisTransaction> {
        let connection = self
            .link
            .top_connection(context)
            .ok_or(Error::OutsideTransaction)?;
        let transaction = RedisTransaction::begin(&self.backend, connection)?;
        self.link.set_transaction(context, transaction.clone())?;
        Ok(transaction)
    }

    fn begin(&self, _transaction: &RedisTransaction) -> Result<()> {
        // MULTI already opened the transaction.
        Ok(())
    }

    fn join_global_transaction(&self, _context: &ExecutionContext) -> Result<()> {
        Err(Error::Unsupported("global transactions"))
    }

    fn commit(&self, transaction: &RedisTransaction) -> Result<()> {
        transaction.exec()
    }

    fn mark_rollback_only(&self, _transaction: &RedisTransaction) -> Result<()> {
        // The backend has no mark-without-discard concept.
        Ok(())
    }

    fn rollback(&self, transaction: &RedisTransaction) -> Result<()> {
        transaction.discard()
    }

    fn release(&self, transaction: &RedisTransaction) -> Result<()> {
        transaction.close()
    }

    fn cleanup(&self, context: &ExecutionContext) -> Result<()> {
        if self.link.depth(context) == 0 {
            // Initialization never completed for this context.
            log::debug!(
                "cleanup without an acquired connection for Redis client `{}`",
                self.backend
            );
            return Ok(());
        }
        self.link.pop(context).release();
        log::trace!(
            "returned a connection to the pool of Redis client `{}`",
            self.backend
        );
        Ok(())
    }

    fn current_transaction(&self, context: &ExecutionContext) -> Option<RedisTransaction> {
        self.link.top_transaction(context)
    }
}

impl fmt::Debug for RedisTransactionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTransactionHandler")
            .field("backend", &self.backend)
            .finish()
    }
}
