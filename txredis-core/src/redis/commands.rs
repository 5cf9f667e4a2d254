//! The command surface shared by transactions, pipelines and facades.

use crate::redis::error::{Error, Result};
use redis::{Cmd, FromRedisValue, ToRedisArgs, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Deferred result of a command queued inside a unit of work.
///
/// Redis evaluates queued commands only at EXEC time, so anything issued
/// inside a transaction resolves after the unit of work commits; until then
/// [`Response::get`] fails with [`Error::UnresolvedResponse`]. Responses of
/// a rolled-back unit of work never resolve.
pub struct Response<T> {
    slot: Arc<OnceLock<Value>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRedisValue> Response<T> {
    pub(crate) fn new(slot: Arc<OnceLock<Value>>) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    /// The committed result, converted to `T`.
    pub fn get(&self) -> Result<T> {
        let value = self.slot.get().ok_or(Error::UnresolvedResponse)?;
        T::from_redis_value(value).map_err(Error::Decode)
    }
}

impl<T> fmt::Debug for Response<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("resolved", &self.slot.get().is_some())
            .finish()
    }
}

/// Commands that can be queued on the current transaction.
///
/// One required method issues an arbitrary [`Cmd`]; the provided methods
/// cover the common string operations. Every call returns a [`Response`]
/// that resolves when the unit of work commits. Implemented by both
/// transaction strategies and by the forwarding facade, so application code
/// is written once against this trait.
pub trait TransactionCommands {
    /// Queue an arbitrary command.
    fn queue<T: FromRedisValue>(&self, cmd: Cmd) -> Result<Response<T>>;

    /// Set `key` to `value`.
    fn set<K: ToRedisArgs, V: ToRedisArgs>(&self, key: K, value: V) -> Result<Response<()>> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.queue(cmd)
    }

    /// Read the value stored at `key`.
    fn get<K: ToRedisArgs, T: FromRedisValue>(&self, key: K) -> Result<Response<T>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.queue(cmd)
    }

    /// Append `value` to the string at `key`, yielding the new length.
    fn append<K: ToRedisArgs, V: ToRedisArgs>(&self, key: K, value: V) -> Result<Response<i64>> {
        let mut cmd = redis::cmd("APPEND");
        cmd.arg(key).arg(value);
        self.queue(cmd)
    }

    /// Delete the given keys, yielding how many existed.
    fn del<K: ToRedisArgs>(&self, key: K) -> Result<Response<i64>> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.queue(cmd)
    }

    /// Increment the integer stored at `key` by one.
    fn incr<K: ToRedisArgs>(&self, key: K) -> Result<Response<i64>> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.queue(cmd)
    }

    /// Set a time to live on `key`, in seconds.
    fn expire<K: ToRedisArgs>(&self, key: K, seconds: i64) -> Result<Response<i64>> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(seconds);
        self.queue(cmd)
    }
}
