//! Per-context stacks of acquired connections.

use crate::redis::connection::RedisConnection;
use crate::redis::context::ExecutionContext;
use crate::redis::error::{Error, Result};
use dashmap::DashMap;
use std::fmt;

/// One acquired connection paired with its transaction object.
///
/// The transaction is set at most once, between acquisition and release of
/// the holder.
struct Holder<T> {
    connection: RedisConnection,
    transaction: Option<T>,
}

/// The per-execution-context stacks of connections acquired for one
/// transaction strategy.
///
/// A single link is shared by every handler of one strategy across all
/// backends. Entries are partitioned by execution context, so concurrent
/// contexts never see each other's stacks, and within a context units of
/// work may nest: the innermost one is visible to [`RedisLink::current`].
/// The storage for a context is allocated on its first push and discarded
/// as soon as its stack empties.
pub struct RedisLink<T> {
    stacks: DashMap<u64, Vec<Holder<T>>>,
}

impl<T> RedisLink<T> {
    /// Create an empty link.
    pub fn new() -> Self {
        Self {
            stacks: DashMap::new(),
        }
    }

    /// The transaction object of the innermost unit of work in `context`.
    ///
    /// Fails with [`Error::OutsideTransaction`] when no unit of work is
    /// active for the context, or when its transaction has not been created
    /// yet (or is already cleaned up).
    pub fn current(&self, context: &ExecutionContext) -> Result<T>
    where
        T: Clone,
    {
        self.stacks
            .get(&context.id())
            .and_then(|stack| stack.last().and_then(|holder| holder.transaction.clone()))
            .ok_or(Error::OutsideTransaction)
    }

    /// Nesting depth of active units of work in `context`.
    pub fn depth(&self, context: &ExecutionContext) -> usize {
        self.stacks
            .get(&context.id())
            .map(|stack| stack.len())
            .unwrap_or(0)
    }

    /// The transaction of the innermost holder, if any exists and has one.
    pub(crate) fn top_transaction(&self, context: &ExecutionContext) -> Option<T>
    where
        T: Clone,
    {
        self.stacks
            .get(&context.id())
            .and_then(|stack| stack.last().and_then(|holder| holder.transaction.clone()))
    }

    /// The connection of the innermost holder, if any.
    pub(crate) fn top_connection(&self, context: &ExecutionContext) -> Option<RedisConnection> {
        self.stacks
            .get(&context.id())
            .and_then(|stack| stack.last().map(|holder| holder.connection.clone()))
    }

    /// Record `transaction` on the innermost holder.
    pub(crate) fn set_transaction(&self, context: &ExecutionContext, transaction: T) -> Result<()> {
        let mut stack = self
            .stacks
            .get_mut(&context.id())
            .ok_or(Error::OutsideTransaction)?;
        let holder = stack.last_mut().ok_or(Error::OutsideTransaction)?;
        holder.transaction = Some(transaction);
        Ok(())
    }

    /// Push a freshly acquired connection for a new unit of work.
    pub(crate) fn push(&self, context: &ExecutionContext, connection: RedisConnection) {
        self.stacks
            .entry(context.id())
            .or_default()
            .push(Holder {
                connection,
                transaction: None,
            });
    }

    /// Remove the innermost holder and hand its connection back.
    ///
    /// The per-context storage is discarded once the stack empties. Popping
    /// with no active unit of work is a programming error and panics.
    pub(crate) fn pop(&self, context: &ExecutionContext) -> RedisConnection {
        let (connection, now_empty) = {
            let mut stack = self
                .stacks
                .get_mut(&context.id())
                .expect("popped a Redis link with no active unit of work");
            let holder = stack
                .pop()
                .expect("popped a Redis link with no active unit of work");
            (holder.connection, stack.is_empty())
        };
        if now_empty {
            self.stacks.remove(&context.id());
        }
        connection
    }
}

impl<T> Default for RedisLink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RedisLink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLink")
            .field("contexts", &self.stacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::{ConnectionLike, RedisResult, Value};

    struct NoopConnection;

    impl ConnectionLike for NoopConnection {
        fn req_packed_command(&mut self, _cmd: &[u8]) -> RedisResult<Value> {
            Ok(Value::Okay)
        }

        fn req_packed_commands(
            &mut self,
            _cmd: &[u8],
            _offset: usize,
            _count: usize,
        ) -> RedisResult<Vec<Value>> {
            Ok(Vec::new())
        }

        fn get_db(&self) -> i64 {
            0
        }

        fn check_connection(&mut self) -> bool {
            true
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    fn connection() -> RedisConnection {
        RedisConnection::new(Box::new(NoopConnection))
    }

    #[test]
    fn current_fails_on_an_empty_stack() {
        let link: RedisLink<u32> = RedisLink::new();
        let context = ExecutionContext::new();
        assert!(matches!(
            link.current(&context),
            Err(Error::OutsideTransaction)
        ));
    }

    #[test]
    fn current_fails_before_the_transaction_is_created() {
        let link: RedisLink<u32> = RedisLink::new();
        let context = ExecutionContext::new();
        link.push(&context, connection());
        assert!(matches!(
            link.current(&context),
            Err(Error::OutsideTransaction)
        ));
        link.pop(&context);
    }

    #[test]
    fn current_returns_the_innermost_transaction() {
        let link: RedisLink<u32> = RedisLink::new();
        let context = ExecutionContext::new();

        link.push(&context, connection());
        link.set_transaction(&context, 1).unwrap();
        link.push(&context, connection());
        link.set_transaction(&context, 2).unwrap();

        assert_eq!(link.current(&context).unwrap(), 2);
        link.pop(&context);
        assert_eq!(link.current(&context).unwrap(), 1);
        link.pop(&context);
    }

    #[test]
    fn contexts_are_isolated() {
        let link: RedisLink<u32> = RedisLink::new();
        let first = ExecutionContext::new();
        let second = ExecutionContext::new();

        link.push(&first, connection());
        link.set_transaction(&first, 7).unwrap();

        assert!(matches!(
            link.current(&second),
            Err(Error::OutsideTransaction)
        ));
        assert_eq!(link.current(&first).unwrap(), 7);
        link.pop(&first);
    }

    #[test]
    fn storage_is_discarded_when_the_stack_empties() {
        let link: RedisLink<u32> = RedisLink::new();
        let context = ExecutionContext::new();

        link.push(&context, connection());
        link.push(&context, connection());
        assert!(link.stacks.contains_key(&context.id()));

        link.pop(&context);
        assert!(link.stacks.contains_key(&context.id()));
        link.pop(&context);
        assert!(!link.stacks.contains_key(&context.id()));
        assert_eq!(link.depth(&context), 0);
    }

    #[test]
    #[should_panic(expected = "no active unit of work")]
    fn pop_on_an_empty_stack_is_fatal() {
        let link: RedisLink<u32> = RedisLink::new();
        link.pop(&ExecutionContext::new());
    }

    #[test]
    fn set_transaction_without_a_holder_fails() {
        let link: RedisLink<u32> = RedisLink::new();
        let context = ExecutionContext::new();
        assert!(matches!(
            link.set_transaction(&context, 1),
            Err(Error::OutsideTransaction)
        ));
    }
}
