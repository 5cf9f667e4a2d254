//! Forwarding facades over the current transaction.

use crate::redis::commands::{Response, TransactionCommands};
use crate::redis::context::ExecutionContext;
use crate::redis::error::Result;
use crate::redis::link::RedisLink;
use redis::{Cmd, FromRedisValue};
use std::fmt;
use std::sync::Arc;

/// Issues commands on whatever transaction is currently active for one
/// execution context.
///
/// The facade holds no connection of its own: every call resolves the
/// innermost unit of work through the link at that moment, so application
/// code can keep a single facade for the lifetime of the context and use it
/// inside any unit of work, nested ones included. Outside a unit of work
/// every operation fails with
/// [`Error::OutsideTransaction`](crate::redis::Error::OutsideTransaction).
#[derive(Clone)]
pub struct TransactionFacade<T> {
    link: Arc<RedisLink<T>>,
    context: ExecutionContext,
}

impl<T: Clone> TransactionFacade<T> {
    /// Bind a facade to `context`.
    pub fn new(link: Arc<RedisLink<T>>, context: ExecutionContext) -> Self {
        Self { link, context }
    }

    /// The transaction object of the innermost active unit of work.
    pub fn current(&self) -> Result<T> {
        self.link.current(&self.context)
    }

    /// The context this facade is bound to.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

impl<T> TransactionCommands for TransactionFacade<T>
where
    T: TransactionCommands + Clone,
{
    fn queue<R: FromRedisValue>(&self, cmd: Cmd) -> Result<Response<R>> {
        self.current()?.queue(cmd)
    }
}

impl<T> fmt::Debug for TransactionFacade<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionFacade")
            .field("context", &self.context)
            .finish()
    }
}
