//! In-process Redis stand-in for lifecycle tests.
//!
//! Implements `ConnectionLike` over parsed RESP so the whole transaction
//! lifecycle runs without a server. Supports the string commands used by
//! the tests plus MULTI/EXEC/DISCARD with real queueing semantics, and
//! counts acquired and outstanding connections so leak properties are
//! checkable.

use parking_lot::Mutex;
use redis::{ConnectionLike, RedisResult, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use txredis_core::redis::{ConnectionSource, Error, Result};

/// Store state shared by every connection of one [`FakeSource`].
#[derive(Default)]
pub struct FakeServer {
    data: Mutex<HashMap<String, String>>,
    commands_seen: AtomicUsize,
}

impl FakeServer {
    /// The stored value of `key`, if any.
    pub fn value(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    /// How many commands reached the server, MULTI bookkeeping included.
    pub fn commands_seen(&self) -> usize {
        self.commands_seen.load(Ordering::SeqCst)
    }

    fn apply(&self, args: &[Vec<u8>]) -> Value {
        let name = String::from_utf8_lossy(&args[0]).to_uppercase();
        let mut data = self.data.lock();
        match name.as_str() {
            "PING" => Value::SimpleString("PONG".into()),
            "SET" => {
                data.insert(text(&args[1]), text(&args[2]));
                Value::Okay
            }
            "GET" => match data.get(&text(&args[1])) {
                Some(value) => Value::BulkString(value.clone().into_bytes()),
                None => Value::Nil,
            },
            "APPEND" => {
                let entry = data.entry(text(&args[1])).or_default();
                entry.push_str(&text(&args[2]));
                Value::Int(entry.len() as i64)
            }
            "DEL" => {
                let removed = args[1..]
                    .iter()
                    .filter(|key| data.remove(&text(key)).is_some())
                    .count();
                Value::Int(removed as i64)
            }
            "INCR" => {
                let entry = data.entry(text(&args[1])).or_insert_with(|| "0".to_string());
                let incremented = entry.parse::<i64>().unwrap_or(0) + 1;
                *entry = incremented.to_string();
                Value::Int(incremented)
            }
            other => panic!("the fake server does not implement {other}"),
        }
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

struct FakeConnection {
    server: Arc<FakeServer>,
    queued: Option<Vec<Vec<Vec<u8>>>>,
    outstanding: Arc<AtomicUsize>,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeConnection {
    fn dispatch(&mut self, args: Vec<Vec<u8>>) -> RedisResult<Value> {
        self.server.commands_seen.fetch_add(1, Ordering::SeqCst);
        let name = String::from_utf8_lossy(&args[0]).to_uppercase();
        match name.as_str() {
            "MULTI" => {
                self.queued = Some(Vec::new());
                Ok(Value::Okay)
            }
            "EXEC" => match self.queued.take() {
                Some(commands) => Ok(Value::Array(
                    commands
                        .iter()
                        .map(|command| self.server.apply(command))
                        .collect(),
                )),
                None => Err((redis::ErrorKind::ResponseError, "EXEC without MULTI").into()),
            },
            "DISCARD" => match self.queued.take() {
                Some(_) => Ok(Value::Okay),
                None => Err((redis::ErrorKind::ResponseError, "DISCARD without MULTI").into()),
            },
            _ => match &mut self.queued {
                Some(commands) => {
                    commands.push(args);
                    Ok(Value::SimpleString("QUEUED".into()))
                }
                None => Ok(self.server.apply(&args)),
            },
        }
    }
}

impl ConnectionLike for FakeConnection {
    fn req_packed_command(&mut self, cmd: &[u8]) -> RedisResult<Value> {
        let mut commands = parse_resp(cmd);
        assert_eq!(commands.len(), 1, "expected exactly one packed command");
        self.dispatch(commands.remove(0))
    }

    fn req_packed_commands(
        &mut self,
        cmd: &[u8],
        offset: usize,
        count: usize,
    ) -> RedisResult<Vec<Value>> {
        let commands = parse_resp(cmd);
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            replies.push(self.dispatch(command)?);
        }
        Ok(replies.into_iter().skip(offset).take(count).collect())
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

/// Connection source handing out connections to one shared fake server.
pub struct FakeSource {
    backend: String,
    server: Arc<FakeServer>,
    acquired: AtomicUsize,
    outstanding: Arc<AtomicUsize>,
    fail_acquire: AtomicBool,
}

impl FakeSource {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            server: Arc::new(FakeServer::default()),
            acquired: AtomicUsize::new(0),
            outstanding: Arc::new(AtomicUsize::new(0)),
            fail_acquire: AtomicBool::new(false),
        }
    }

    /// The store shared by all connections of this source.
    pub fn server(&self) -> Arc<FakeServer> {
        self.server.clone()
    }

    /// Total number of acquisitions so far.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Connections handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Make every following acquisition fail.
    pub fn fail_acquisitions(&self, fail: bool) {
        self.fail_acquire.store(fail, Ordering::SeqCst);
    }
}

impl ConnectionSource for FakeSource {
    fn acquire(&self) -> Result<Box<dyn ConnectionLike + Send>> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(Error::Backend {
                backend: self.backend.clone(),
                source: (redis::ErrorKind::IoError, "connection refused").into(),
            });
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            server: self.server.clone(),
            queued: None,
            outstanding: self.outstanding.clone(),
        }))
    }
}

/// Parse one or more RESP-encoded commands into their argument lists.
fn parse_resp(mut input: &[u8]) -> Vec<Vec<Vec<u8>>> {
    let mut commands = Vec::new();
    while !input.is_empty() {
        assert_eq!(input[0], b'*', "malformed RESP: expected an array");
        let (argc, rest) = read_length(&input[1..]);
        let mut args = Vec::with_capacity(argc);
        let mut remaining = rest;
        for _ in 0..argc {
            assert_eq!(remaining[0], b'$', "malformed RESP: expected a bulk string");
            let (len, payload) = read_length(&remaining[1..]);
            args.push(payload[..len].to_vec());
            remaining = &payload[len + 2..];
        }
        commands.push(args);
        input = remaining;
    }
    commands
}

fn read_length(input: &[u8]) -> (usize, &[u8]) {
    let end = input
        .iter()
        .position(|&byte| byte == b'\r')
        .expect("malformed RESP: missing CRLF");
    let length = std::str::from_utf8(&input[..end])
        .expect("malformed RESP: non-UTF-8 length")
        .parse()
        .expect("malformed RESP: invalid length");
    (length, &input[end + 2..])
}
