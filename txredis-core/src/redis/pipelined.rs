//! The pipelined transaction handler.

use crate::redis::connection::{ConnectionSource, RedisConnection};
use crate::redis::context::ExecutionContext;
use crate::redis::error::{Error, Result};
use crate::redis::link::RedisLink;
use crate::redis::pipeline::RedisPipeline;
use crate::redis::spi::{TransactionHandler, TransactionMetadata};
use std::fmt;
use std::sync::Arc;

/// Drives units of work that buffer commands locally and flush them as one
/// MULTI/EXEC round trip at commit, for one named client.
///
/// The pipelined stacks are independent from the direct ones: a unit of
/// work of each strategy may be active in the same execution context at the
/// same time.
pub struct RedisPipelinedTransactionHandler {
    backend: String,
    link: Arc<RedisLink<RedisPipeline>>,
    source: Arc<dyn ConnectionSource>,
}

impl RedisPipelinedTransactionHandler {
    /// Create the handler for `backend`, acquiring connections from `source`.
    pub fn new(
        backend: impl Into<String>,
        link: Arc<RedisLink<RedisPipeline>>,
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

impl TransactionHandler for RedisPipelinedTransactionHandler {
    type Transaction = RedisPipeline;

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

    fn create_transaction(&self, context: &ExecutionContext) -> Result<RedisPipeline> {
        let connection = self
            .link
            .top_connection(context)
            .ok_or(Error::OutsideTransaction)?;
        let transaction = RedisPipeline::open(&self.backend, connection);
        self.link.set_transaction(context, transaction.clone())?;
        Ok(transaction)
    }

    fn begin(&self, _transaction: &RedisPipeline) -> Result<()> {
        // The buffered MULTI opens the transaction at commit time.
        Ok(())
    }

    fn join_global_transaction(&self, _context: &ExecutionContext) -> Result<()> {
        Err(Error::Unsupported("global transactions"))
    }

    fn commit(&self, transaction: &RedisPipeline) -> Result<()> {
        transaction.exec()
    }

    fn mark_rollback_only(&self, _transaction: &RedisPipeline) -> Result<()> {
        // The backend has no mark-without-discard concept.
        Ok(())
    }

    fn rollback(&self, transaction: &RedisPipeline) -> Result<()> {
        transaction.discard()
    }

    fn release(&self, transaction: &RedisPipeline) -> Result<()> {
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

    fn current_transaction(&self, context: &ExecutionContext) -> Option<RedisPipeline> {
        self.link.top_transaction(context)
    }
}

impl fmt::Debug for RedisPipelinedTransactionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisPipelinedTransactionHandler")
            .field("backend", &self.backend)
            .finish()
    }
}
