//! Metadata resolution for Redis units of work.

use crate::redis::error::{Error, Result};
use crate::redis::spi::{
    CallSite, ExceptionHandlerKind, HandlerKind, TransactionMetadata, TransactionMetadataResolver,
};

/// Resolves which client and which strategy govern a unit of work.
///
/// An explicit [`Redis`](crate::redis::Redis) declaration always wins and
/// is never merged with the ambient defaults. Without one, when the ambient
/// defaults already name one of the Redis strategies (an outer unit of work
/// fixed the kind), the configured default client applies. Calls that
/// declare nothing and whose defaults point elsewhere are declined so
/// another resolver may serve them.
#[derive(Debug, Clone)]
pub struct RedisTransactionMetadataResolver {
    default_client: Option<String>,
}

impl RedisTransactionMetadataResolver {
    /// Create a resolver falling back on `default_client` for call sites
    /// that declare no client of their own.
    pub fn new(default_client: Option<String>) -> Self {
        Self { default_client }
    }
}

impl TransactionMetadataResolver for RedisTransactionMetadataResolver {
    fn resolve(
        &self,
        call_site: &CallSite<'_>,
        defaults: &TransactionMetadata,
    ) -> Result<Option<TransactionMetadata>> {
        let declared = call_site.redis;
        let ambient_kind = defaults.handler;

        if declared.is_none() && ambient_kind.is_none() {
            return Ok(None);
        }

        let mut resolved = TransactionMetadata::new();
        resolved.exception_handler = Some(ExceptionHandlerKind::Redis);

        match declared {
            Some(redis) => {
                resolved.resource = Some(redis.backend().to_string());
                resolved.handler = Some(if redis.is_pipelined() {
                    HandlerKind::Pipelined
                } else {
                    HandlerKind::Direct
                });
            }
            None => {
                match self
                    .default_client
                    .as_deref()
                    .filter(|name| !name.is_empty())
                {
                    Some(name) => resolved.resource = Some(name.to_string()),
                    None => {
                        return Err(Error::NoBackendSpecified {
                            unit: call_site.unit.to_string(),
                        });
                    }
                }
                resolved.handler = ambient_kind;
            }
        }

        Ok(Some(resolved))
    }
}
