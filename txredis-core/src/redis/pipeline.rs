//! The buffered (pipelined) transaction object.

use crate::redis::commands::{Response, TransactionCommands};
use crate::redis::connection::RedisConnection;
use crate::redis::error::{Error, Result};
use crate::redis::transaction::TxState;
use parking_lot::Mutex;
use redis::{Cmd, FromRedisValue, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A client-side buffered transaction.
///
/// Commands accumulate in a local pipeline and nothing reaches the server
/// before [`exec`](Self::exec), which flushes the buffer as a single
/// MULTI … EXEC round trip. Rolling back therefore never contacts the
/// server: clearing the local buffer discards everything not yet committed.
#[derive(Clone)]
pub struct RedisPipeline {
    backend: Arc<str>,
    inner: Arc<Mutex<PipelineInner>>,
}

struct PipelineInner {
    connection: RedisConnection,
    buffer: redis::Pipeline,
    state: TxState,
    slots: Vec<Arc<OnceLock<Value>>>,
}

impl RedisPipeline {
    /// Open a buffered transaction over `connection`. No I/O happens here.
    pub(crate) fn open(backend: &str, connection: RedisConnection) -> Self {
        let mut buffer = redis::pipe();
        buffer.atomic();
        Self {
            backend: Arc::from(backend),
            inner: Arc::new(Mutex::new(PipelineInner {
                connection,
                buffer,
                state: TxState::Open,
                slots: Vec::new(),
            })),
        }
    }

    /// Flush the buffer as one MULTI … EXEC round trip and resolve the
    /// queued responses.
    pub fn exec(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_open()?;
        if inner.slots.is_empty() {
            // Nothing was buffered; committing is a local no-op.
            inner.state = TxState::Committed;
            return Ok(());
        }
        let PipelineInner {
            connection,
            buffer,
            slots,
            ..
        } = &mut *inner;
        let results = connection
            .with(|conn| buffer.query::<Vec<Value>>(conn))?
            .map_err(|source| Error::backend(&self.backend, source))?;
        for (slot, value) in slots.iter().zip(results) {
            let _ = slot.set(value);
        }
        inner.state = TxState::Committed;
        Ok(())
    }

    /// Abort the unit of work by clearing the local buffer.
    ///
    /// The server is never contacted: no buffered command has been
    /// transmitted yet, so there is nothing to discard remotely.
    pub fn discard(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.state.ensure_open()?;
        inner.buffer.clear();
        inner.slots.clear();
        inner.state = TxState::RolledBack;
        Ok(())
    }

    /// Close the pipeline, clearing it first if still open. Idempotent.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state == TxState::Open {
            inner.buffer.clear();
            inner.slots.clear();
        }
        inner.state = TxState::Released;
        Ok(())
    }

    /// Whether commands can still be buffered.
    pub fn is_open(&self) -> bool {
        self.inner.lock().state == TxState::Open
    }

    /// Name of the client this pipeline runs on.
    pub fn backend(&self) -> &str {
        &self.backend
    }
}

impl TransactionCommands for RedisPipeline {
    fn queue<T: FromRedisValue>(&self, cmd: Cmd) -> Result<Response<T>> {
        let mut inner = self.inner.lock();
        inner.state.ensure_open()?;
        inner.buffer.add_command(cmd);
        let slot = Arc::new(OnceLock::new());
        inner.slots.push(slot.clone());
        Ok(Response::new(slot))
    }
}

impl fmt::Debug for RedisPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RedisPipeline")
            .field("backend", &self.backend)
            .field("state", &inner.state)
            .field("buffered", &inner.slots.len())
            .finish()
    }
}
