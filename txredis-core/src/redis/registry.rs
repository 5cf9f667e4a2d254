//! Startup construction and lookup of named Redis backends.

use crate::redis::config::{ClientConfig, ClusterConfig, RedisConfig};
use crate::redis::connection::{ConnectionSource, PooledConnectionSource};
use crate::redis::context::ExecutionContext;
use crate::redis::error::{Error, Result};
use crate::redis::facade::TransactionFacade;
use crate::redis::handler::RedisTransactionHandler;
use crate::redis::link::RedisLink;
use crate::redis::pipeline::RedisPipeline;
use crate::redis::pipelined::RedisPipelinedTransactionHandler;
use crate::redis::resolver::RedisTransactionMetadataResolver;
use crate::redis::spi::RedisExceptionHandler;
use crate::redis::transaction::RedisTransaction;
use redis::cluster::{ClusterClient, ClusterClientBuilder, ClusterConnection};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Applies the configured command timeout to every acquired connection.
#[derive(Debug)]
struct CommandTimeout {
    timeout: Duration,
}

impl r2d2::CustomizeConnection<redis::Connection, redis::RedisError> for CommandTimeout {
    fn on_acquire(
        &self,
        connection: &mut redis::Connection,
    ) -> std::result::Result<(), redis::RedisError> {
        connection.set_read_timeout(Some(self.timeout))?;
        connection.set_write_timeout(Some(self.timeout))
    }
}

/// All configured backends, their pools and their transaction handlers.
///
/// Built once at startup from a [`RedisConfig`] and immutable afterwards.
/// Every single-node client gets one direct and one pipelined handler,
/// all sharing the two process-wide links. Clusters are constructed and
/// exposed for direct use but do not take part in transactional units of
/// work (MULTI/EXEC cannot span cluster slots).
pub struct RedisRegistry {
    pools: HashMap<String, r2d2::Pool<redis::Client>>,
    clusters: HashMap<String, ClusterClient>,
    cluster_names: HashMap<String, Option<String>>,
    exception_handlers: HashMap<String, Arc<dyn RedisExceptionHandler>>,
    direct_handlers: HashMap<String, Arc<RedisTransactionHandler>>,
    pipelined_handlers: HashMap<String, Arc<RedisPipelinedTransactionHandler>>,
    direct_link: Arc<RedisLink<RedisTransaction>>,
    pipelined_link: Arc<RedisLink<RedisPipeline>>,
    default_client: Option<String>,
}

impl RedisRegistry {
    /// Construct every configured backend.
    ///
    /// Pools connect lazily, so a malformed URL fails here with an error
    /// naming the offending client while an unreachable server surfaces on
    /// first acquisition. Cluster connectivity is probed once so an
    /// unreachable cluster is reported at startup rather than at first use.
    pub fn open(config: RedisConfig) -> Result<Self> {
        let direct_link = Arc::new(RedisLink::new());
        let pipelined_link = Arc::new(RedisLink::new());
        let mut pools = HashMap::new();
        let mut exception_handlers: HashMap<String, Arc<dyn RedisExceptionHandler>> =
            HashMap::new();
        let mut direct_handlers = HashMap::new();
        let mut pipelined_handlers = HashMap::new();

        for (name, client_config) in config.clients() {
            log::info!("creating connection pool for Redis client `{name}`");
            let pool = build_pool(name, client_config)?;
            if let Some(handler) = client_config.exception_handler_ref() {
                exception_handlers.insert(name.clone(), handler);
            }
            let source: Arc<dyn ConnectionSource> =
                Arc::new(PooledConnectionSource::new(name.clone(), pool.clone()));
            direct_handlers.insert(
                name.clone(),
                Arc::new(RedisTransactionHandler::new(
                    name.clone(),
                    direct_link.clone(),
                    source.clone(),
                )),
            );
            pipelined_handlers.insert(
                name.clone(),
                Arc::new(RedisPipelinedTransactionHandler::new(
                    name.clone(),
                    pipelined_link.clone(),
                    source,
                )),
            );
            pools.insert(name.clone(), pool);
        }

        let mut clusters = HashMap::new();
        let mut cluster_names = HashMap::new();
        for (name, cluster_config) in config.clusters() {
            log::info!("creating Redis cluster client `{name}`");
            let cluster = build_cluster(name, cluster_config)?;
            if let Err(error) = cluster.get_connection() {
                log::warn!("unable to reach any node of Redis cluster `{name}` at startup: {error}");
            }
            cluster_names.insert(
                name.clone(),
                cluster_config.get_client_name().map(str::to_string),
            );
            clusters.insert(name.clone(), cluster);
        }

        Ok(Self {
            pools,
            clusters,
            cluster_names,
            exception_handlers,
            direct_handlers,
            pipelined_handlers,
            direct_link,
            pipelined_link,
            default_client: config.get_default_client().map(str::to_string),
        })
    }

    /// The direct transaction handler of the named client.
    pub fn direct_handler(&self, name: &str) -> Result<Arc<RedisTransactionHandler>> {
        self.direct_handlers
            .get(name)
            .cloned()
            .ok_or_else(|| unknown(name))
    }

    /// The pipelined transaction handler of the named client.
    pub fn pipelined_handler(&self, name: &str) -> Result<Arc<RedisPipelinedTransactionHandler>> {
        self.pipelined_handlers
            .get(name)
            .cloned()
            .ok_or_else(|| unknown(name))
    }

    /// The connection pool of the named client, for plain
    /// non-transactional use.
    pub fn pool(&self, name: &str) -> Result<&r2d2::Pool<redis::Client>> {
        self.pools.get(name).ok_or_else(|| unknown(name))
    }

    /// The named cluster client.
    pub fn cluster(&self, name: &str) -> Result<&ClusterClient> {
        self.clusters.get(name).ok_or_else(|| unknown(name))
    }

    /// Open a connection to the named cluster, applying its configured
    /// connection name.
    pub fn cluster_connection(&self, name: &str) -> Result<ClusterConnection> {
        let cluster = self.cluster(name)?;
        let mut connection = cluster
            .get_connection()
            .map_err(|source| Error::backend(name, source))?;
        if let Some(client_name) = self.cluster_names.get(name).and_then(|n| n.as_deref()) {
            redis::cmd("CLIENT")
                .arg("SETNAME")
                .arg(client_name)
                .query::<()>(&mut connection)
                .map_err(|source| Error::backend(name, source))?;
        }
        Ok(connection)
    }

    /// The exception handler bound to the named client, if any.
    pub fn exception_handler(&self, name: &str) -> Option<Arc<dyn RedisExceptionHandler>> {
        self.exception_handlers.get(name).cloned()
    }

    /// A resolver backed by this registry's default client.
    pub fn metadata_resolver(&self) -> RedisTransactionMetadataResolver {
        RedisTransactionMetadataResolver::new(self.default_client.clone())
    }

    /// The facade issuing commands on the current direct transaction of
    /// `context`.
    pub fn transaction(&self, context: &ExecutionContext) -> TransactionFacade<RedisTransaction> {
        TransactionFacade::new(self.direct_link.clone(), context.clone())
    }

    /// The facade issuing commands on the current pipelined transaction of
    /// `context`.
    pub fn pipeline(&self, context: &ExecutionContext) -> TransactionFacade<RedisPipeline> {
        TransactionFacade::new(self.pipelined_link.clone(), context.clone())
    }

    /// The link shared by all direct handlers.
    pub fn direct_link(&self) -> &Arc<RedisLink<RedisTransaction>> {
        &self.direct_link
    }

    /// The link shared by all pipelined handlers.
    pub fn pipelined_link(&self) -> &Arc<RedisLink<RedisPipeline>> {
        &self.pipelined_link
    }

    /// Close every pool and cluster client.
    pub fn shutdown(self) {
        for (name, pool) in self.pools {
            log::info!("shutting down the connection pool of Redis client `{name}`");
            drop(pool);
        }
        for (name, cluster) in self.clusters {
            log::info!("shutting down Redis cluster client `{name}`");
            drop(cluster);
        }
    }
}

impl fmt::Debug for RedisRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRegistry")
            .field("clients", &self.pools.keys().collect::<Vec<_>>())
            .field("clusters", &self.clusters.keys().collect::<Vec<_>>())
            .field("default_client", &self.default_client)
            .finish()
    }
}

fn unknown(name: &str) -> Error {
    Error::UnknownBackend {
        backend: name.to_string(),
    }
}

fn build_pool(name: &str, config: &ClientConfig) -> Result<r2d2::Pool<redis::Client>> {
    let client = redis::Client::open(config.url()).map_err(|source| Error::Startup {
        backend: name.to_string(),
        source,
    })?;
    let settings = config.pool_settings();
    let mut builder = r2d2::Pool::builder()
        .max_size(settings.max_size)
        .min_idle(settings.min_idle)
        .idle_timeout(settings.idle_timeout)
        .max_lifetime(settings.max_lifetime)
        .connection_timeout(settings.connection_timeout);
    if let Some(timeout) = config.get_timeout() {
        builder = builder.connection_customizer(Box::new(CommandTimeout { timeout }));
    }
    // Connections are established lazily, on first checkout.
    Ok(builder.build_unchecked(client))
}

fn build_cluster(name: &str, config: &ClusterConfig) -> Result<ClusterClient> {
    ClusterClientBuilder::new(config.node_urls())
        .retries(config.get_max_attempts())
        .build()
        .map_err(|source| Error::Startup {
            backend: name.to_string(),
            source,
        })
}
