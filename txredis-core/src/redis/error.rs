//! Error types for transactional Redis access.

use thiserror::Error;

/// Errors raised while resolving, driving or using Redis units of work.
#[derive(Debug, Error)]
pub enum Error {
    /// A transactional object was used while no unit of work is active for
    /// the calling execution context.
    #[error("cannot access Redis outside of an active transaction")]
    OutsideTransaction,

    /// A unit of work declared no client and no default client is configured.
    #[error("no Redis client specified for unit of work `{unit}` and no default client is configured")]
    NoBackendSpecified {
        /// Label of the unit of work that failed to resolve.
        unit: String,
    },

    /// The invoked capability is intentionally not implemented.
    #[error("{0} are not supported by Redis transaction handlers")]
    Unsupported(&'static str),

    /// A command against the underlying store failed.
    #[error("redis operation on client `{backend}` failed")]
    Backend {
        /// Name of the client the unit of work runs on.
        backend: String,
        #[source]
        source: redis::RedisError,
    },

    /// A connection could not be acquired from the backend's pool.
    #[error("unable to acquire a connection from the pool of client `{backend}`")]
    Acquire {
        /// Name of the client whose pool failed.
        backend: String,
        #[source]
        source: r2d2::Error,
    },

    /// A client or cluster could not be constructed at startup.
    #[error("unable to create Redis client `{backend}`")]
    Startup {
        /// Name of the offending configuration entry.
        backend: String,
        #[source]
        source: redis::RedisError,
    },

    /// A name with no matching configuration entry was used.
    #[error("no Redis client or cluster named `{backend}` is configured")]
    UnknownBackend {
        /// The unconfigured name.
        backend: String,
    },

    /// The transaction handle was already committed, rolled back or released.
    #[error("the transaction is no longer open")]
    TransactionClosed,

    /// The connection backing the handle was already returned to its pool.
    #[error("the connection backing this transaction has been released")]
    ConnectionReleased,

    /// A deferred response was read before its unit of work committed.
    #[error("the response resolves only once the transaction is committed")]
    UnresolvedResponse,

    /// A committed result could not be converted to the requested type.
    #[error("unable to decode a transaction result")]
    Decode(#[source] redis::RedisError),
}

impl Error {
    /// Wrap a store error with the name of the client it occurred on.
    pub(crate) fn backend(backend: &str, source: redis::RedisError) -> Self {
        Error::Backend {
            backend: backend.to_string(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
