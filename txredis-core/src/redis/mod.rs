//! Transactional access to named Redis backends.
//!
//! Application code runs units of work against named single-node clients,
//! either direct (MULTI/EXEC issued on the acquired connection as commands
//! are queued) or pipelined (commands buffered locally and flushed as one
//! MULTI/EXEC round trip at commit). A transaction runtime drives the
//! handler lifecycle; inside a unit of work, commands are issued through a
//! facade that resolves the innermost active transaction of the calling
//! execution context, so the code never touches connections directly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use txredis_core::redis::{
//!     ClientConfig, ExecutionContext, RedisConfig, RedisRegistry, TransactionCommands,
//!     TransactionHandler, TransactionMetadata,
//! };
//!
//! # fn example() -> txredis_core::redis::Result<()> {
//! let registry = RedisRegistry::open(
//!     RedisConfig::new()
//!         .client("cache", ClientConfig::new("redis://127.0.0.1:6379"))
//!         .default_client("cache"),
//! )?;
//!
//! // Normally the transaction runtime drives these hooks.
//! let context = ExecutionContext::new();
//! let handler = registry.direct_handler("cache")?;
//! handler.initialize(&context, &TransactionMetadata::new())?;
//! let transaction = handler.create_transaction(&context)?;
//!
//! transaction.set("key1", "value1")?;
//! let length = transaction.append("key1", "value2")?;
//!
//! handler.commit(&transaction)?;
//! handler.release(&transaction)?;
//! handler.cleanup(&context)?;
//!
//! assert_eq!(length.get()?, 12);
//! # Ok(())
//! # }
//! ```

mod commands;
mod config;
mod connection;
mod context;
mod error;
mod facade;
mod handler;
mod link;
mod pipeline;
mod pipelined;
mod registry;
mod resolver;
mod spi;
mod transaction;

pub use self::commands::{Response, TransactionCommands};
pub use self::config::{ClientConfig, ClusterConfig, PoolSettings, RedisConfig};
pub use self::connection::{ConnectionSource, PooledConnectionSource, RedisConnection};
pub use self::context::ExecutionContext;
pub use self::error::{Error, Result};
pub use self::facade::TransactionFacade;
pub use self::handler::RedisTransactionHandler;
pub use self::link::RedisLink;
pub use self::pipeline::RedisPipeline;
pub use self::pipelined::RedisPipelinedTransactionHandler;
pub use self::registry::RedisRegistry;
pub use self::resolver::RedisTransactionMetadataResolver;
pub use self::spi::{
    ActiveTransaction, CallSite, ExceptionHandlerKind, HandlerKind, Redis, RedisExceptionHandler,
    TransactionHandler, TransactionMetadata, TransactionMetadataResolver,
};
pub use self::transaction::RedisTransaction;
