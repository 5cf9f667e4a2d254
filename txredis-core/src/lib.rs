//! txredis core.
//!
//! This crate implements transactional access to named Redis backends:
//! pooled connection acquisition, the direct (MULTI/EXEC) and pipelined
//! transaction strategies, per-execution-context transaction stacks and
//! the metadata resolution that picks a backend and strategy for each
//! unit of work.
//!
//! ## Example
//!
//! ```rust,no_run
//! use txredis_core::redis::{ClientConfig, RedisConfig, RedisRegistry};
//!
//! # fn example() -> txredis_core::redis::Result<()> {
//! let registry = RedisRegistry::open(
//!     RedisConfig::new().client("cache", ClientConfig::new("redis://127.0.0.1:6379")),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod redis;

// Re-export main types at crate root for convenience
pub use self::redis::{
    ActiveTransaction, CallSite, ClientConfig, ClusterConfig, ConnectionSource, Error,
    ExceptionHandlerKind, ExecutionContext, HandlerKind, PoolSettings, PooledConnectionSource,
    Redis, RedisConfig, RedisConnection, RedisExceptionHandler, RedisLink, RedisPipeline,
    RedisPipelinedTransactionHandler, RedisRegistry, RedisTransaction, RedisTransactionHandler,
    RedisTransactionMetadataResolver, Response, TransactionCommands, TransactionFacade,
    TransactionHandler, TransactionMetadata, TransactionMetadataResolver,
};
