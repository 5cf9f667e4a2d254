//! txredis
//!
//! Transactional access to named Redis backends: pooled connections, a
//! direct MULTI/EXEC strategy and a pipelined strategy that buffers
//! commands until commit, composed under a surrounding transaction
//! runtime.
//!
//! ## Overview
//!
//! - **Named backends** - any number of single-node clients (pooled) and
//!   cluster clients, configured once at startup
//! - **Two strategies** - MULTI/EXEC issued directly on the connection, or
//!   buffered locally and flushed as a single round trip at commit
//! - **Context-scoped transactions** - each execution context owns its own
//!   stack of units of work; application code reaches the innermost one
//!   through a forwarding facade
//! - **Explicit declarations** - a call site names its client and strategy
//!   with a [`Redis`] declaration, or falls back on the configured default
//!
//! ## Example
//!
//! ```rust,no_run
//! use txredis::redis::{ClientConfig, ExecutionContext, RedisConfig, RedisRegistry};
//!
//! # fn example() -> txredis::redis::Result<()> {
//! let registry = RedisRegistry::open(
//!     RedisConfig::new()
//!         .client("cache", ClientConfig::new("redis://127.0.0.1:6379"))
//!         .default_client("cache"),
//! )?;
//!
//! // Application code holds a facade; commands reach whatever unit of
//! // work is active when they are issued.
//! let context = ExecutionContext::new();
//! let transaction = registry.transaction(&context);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `tls` - Enable `rediss://` URLs (rustls)
//! - `serde` - Enable serde derives on the configuration surface

// Re-export everything from txredis-core
pub use txredis_core::*;
