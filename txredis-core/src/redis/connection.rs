//! Connection acquisition and ownership.

use crate::redis::error::{Error, Result};
use parking_lot::Mutex;
use redis::{ConnectionLike, RedisResult, Value};
use std::fmt;
use std::sync::Arc;

/// A source of ready-to-use connections for one named backend.
///
/// The pool itself (sizing, health checking, reconnection) is the source's
/// concern; handlers only acquire at the start of a unit of work and drop
/// the boxed connection at cleanup, which returns it to wherever it came
/// from.
pub trait ConnectionSource: Send + Sync {
    /// Acquire a connection, blocking until one is available or the source's
    /// checkout timeout elapses.
    fn acquire(&self) -> Result<Box<dyn ConnectionLike + Send>>;
}

/// [`ConnectionSource`] over an r2d2 pool of single-node clients.
pub struct PooledConnectionSource {
    backend: String,
    pool: r2d2::Pool<redis::Client>,
}

impl PooledConnectionSource {
    /// Wrap `pool` as the connection source of the named backend.
    pub fn new(backend: impl Into<String>, pool: r2d2::Pool<redis::Client>) -> Self {
        Self {
            backend: backend.into(),
            pool,
        }
    }
}

impl ConnectionSource for PooledConnectionSource {
    fn acquire(&self) -> Result<Box<dyn ConnectionLike + Send>> {
        let inner = self.pool.get().map_err(|source| Error::Acquire {
            backend: self.backend.clone(),
            source,
        })?;
        Ok(Box::new(PooledConnection { inner }))
    }
}

impl fmt::Debug for PooledConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnectionSource")
            .field("backend", &self.backend)
            .finish()
    }
}

/// Checked-out pool connection; dropping it returns the connection.
struct PooledConnection {
    inner: r2d2::PooledConnection<redis::Client>,
}

impl ConnectionLike for PooledConnection {
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value> {
        self.inner.req_packed_command(cmd)
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>> {
        self.inner.req_packed_commands(cmd, offset, count)
    }

    fn get_db(&self) -> i64 {
        self.inner.get_db()
    }

    fn check_connection(&mut self) -> bool {
        self.inner.check_connection()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

/// A connection owned by one holder from acquisition until release.
///
/// The handle is cheaply cloneable so the transaction object can issue
/// commands on the same connection, but ownership stays with the holder:
/// [`release`](Self::release) hands the connection back immediately, and
/// any later use through a surviving clone fails with
/// [`Error::ConnectionReleased`].
#[derive(Clone)]
pub struct RedisConnection {
    inner: Arc<Mutex<Option<Box<dyn ConnectionLike + Send>>>>,
}

impl RedisConnection {
    /// Take ownership of a freshly acquired connection.
    pub(crate) fn new(connection: Box<dyn ConnectionLike + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(connection))),
        }
    }

    /// Run `f` against the live connection.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut dyn ConnectionLike) -> R) -> Result<R> {
        let mut guard = self.inner.lock();
        match guard.as_mut() {
            Some(connection) => Ok(f(connection.as_mut())),
            None => Err(Error::ConnectionReleased),
        }
    }

    /// Return the connection to its source, invalidating every clone.
    pub(crate) fn release(&self) {
        self.inner.lock().take();
    }
}

impl fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnection")
            .field("released", &self.inner.lock().is_none())
            .finish()
    }
}
