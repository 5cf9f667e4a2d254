//! The direct MULTI/EXEC transaction object.

use crate::redis::commands::{Response, TransactionCommands};
use crate::redis::connection::RedisConnection;
use crate::redis::error::{Error, Result};
use parking_lot::Mutex;
use redis::{Cmd, FromRedisValue, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Lifecycle of a transaction object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxState {
    Open,
    Committed,
    RolledBack,
    Released,
}

impl TxState {
    pub(crate) fn ensure_open(self) -> Result<()> {
        if self == TxState::Open {
            Ok(())
        } else {
            Err(Error::TransactionClosed)
        }
    }
}

/// A server-side MULTI/EXEC transaction on one acquired connection.
///
/// Commands are transmitted as they are queued and acknowledged `QUEUED`;
/// the server evaluates the whole batch atomically at [`exec`](Self::exec)
/// time. The handle is cloneable and every clone refers to the same
/// transaction.
#[derive(Clone)]
pub struct RedisTransaction {
    backend: Arc<str>,
    inner: Arc<Mutex<TransactionInner>>,
}

struct TransactionInner {
    connection: RedisConnection,
    state: TxState,
    slots: Vec<Arc<OnceLock<Value>>>,
}

impl RedisTransaction {
    /// Open a MULTI block on `connection`.
    pub(crate) fn begin(backend: &str, connection: RedisConnection) -> Result<Self> {
        connection
            .with(|conn| redis::cmd("MULTI").query::<()>(conn))?
            .map_err(|source| Error::backend(backend, source))?;
        Ok(Self {
            backend: Arc::from(backend),
            inner: Arc::new(Mutex::new(TransactionInner {
                connection,
                state: TxState::Open,
                slots: Vec::new(),
            })),
        })
    }

    /// Execute the queued commands atomically and resolve their responses.
    pub fn exec(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_open()?;
        let results = inner
            .connection
            .with(|conn| redis::cmd("EXEC").query::<Vec<Value>>(conn))?
            .map_err(|source| Error::backend(&self.backend, source))?;
        for (slot, value) in inner.slots.iter().zip(results) {
            let _ = slot.set(value);
        }
        inner.state = TxState::Committed;
        Ok(())
    }

    /// Abort the transaction, discarding every queued command server-side.
    pub fn discard(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_open()?;
        inner
            .connection
            .with(|conn| redis::cmd("DISCARD").query::<()>(conn))?
            .map_err(|source| Error::backend(&self.backend, source))?;
        inner.state = TxState::RolledBack;
        Ok(())
    }

    /// Close the transaction, discarding it first if still open. Idempotent.
    pub fn close(&self) -> Result<()> {
        let state = self.inner.lock().state;
        if state == TxState::Open {
            self.discard()?;
        }
        self.inner.lock().state = TxState::Released;
        Ok(())
    }

    /// Whether commands can still be queued.
    pub fn is_open(&self) -> bool {
        self.inner.lock().state == TxState::Open
    }

    /// Name of the client this transaction runs on.
    pub fn backend(&self) -> &str {
        &self.backend
    }
}

impl TransactionCommands for RedisTransaction {
    fn queue<T: FromRedisValue>(&self, cmd: Cmd) -> Result<Response<T>> {
        let mut inner = self.inner.lock();
        inner.state.ensure_open()?;
        // The server replies QUEUED here; the result arrives at EXEC.
        inner
            .connection
            .with(|conn| cmd.query::<Value>(conn))?
            .map_err(|source| Error::backend(&self.backend, source))?;
        let slot = Arc::new(OnceLock::new());
        inner.slots.push(slot.clone());
        Ok(Response::new(slot))
    }
}

impl fmt::Debug for RedisTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RedisTransaction")
            .field("backend", &self.backend)
            .field("state", &inner.state)
            .field("queued", &inner.slots.len())
            .finish()
    }
}
